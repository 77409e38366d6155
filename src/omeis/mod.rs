//! OMEIS (OME Image Server) access.
//!
//! [`OmeisTransport`] is the raw line protocol, [`OmeisClient`] the typed
//! method calls the importer uses.

mod client;
mod transport;

pub use client::{OmeisClient, PixelsLayout};
pub use transport::{HttpTransport, OmeisTransport};
