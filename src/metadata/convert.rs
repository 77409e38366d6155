//! Numeric coercions between OME attribute representations.
//!
//! OME 2003 stores booleans as the integers 1 (false) and 2 (true). Every
//! function passes absence through unchanged.

pub fn boolean_to_integer(value: Option<bool>) -> Option<i32> {
    value.map(|b| if b { 2 } else { 1 })
}

/// Only 2 means true.
pub fn integer_to_boolean(value: Option<i32>) -> Option<bool> {
    value.map(|i| i == 2)
}

pub fn integer_to_double(value: Option<i32>) -> Option<f64> {
    value.map(f64::from)
}

/// Truncates toward zero, saturating at the `i32` bounds.
pub fn double_to_integer(value: Option<f64>) -> Option<i32> {
    value.map(|d| d as i32)
}

/// Used for pinhole sizes. Large integers lose precision.
pub fn integer_to_float(value: Option<i32>) -> Option<f32> {
    value.map(|i| i as f32)
}

pub fn float_to_integer(value: Option<f32>) -> Option<i32> {
    value.map(|f| f as i32)
}
