//! Command-line configuration for the OMEIS importer.
//!
//! Settings come from command-line arguments, with environment variable
//! fallbacks for the OMEIS connection:
//!
//! - `OMEIS_URL` - OMEIS CGI endpoint (default: http://localhost/cgi-bin/omeis)
//! - `OMEIS_TIMEOUT` - Per-request timeout in seconds (default: 300)
//!
//! # Example
//!
//! ```text
//! omeis-import 5 6 7                    # import files 5, 6 and 7 as one dataset
//! omeis-import --test 5 6 7 8           # print how the files would be grouped
//! omeis-import --http-response 5 6 7    # CGI mode: prefix output with a status header
//! ```

use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::output::ResponseMode;

// =============================================================================
// Default Values
// =============================================================================

/// Default OMEIS CGI endpoint.
pub const DEFAULT_OMEIS_URL: &str = "http://localhost/cgi-bin/omeis";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// CLI Arguments
// =============================================================================

/// OMEIS importer - imports image files stored in an OME Image Server.
///
/// Reads the files with the given OMEIS file IDs as one dataset, writes
/// their pixels into new OMEIS pixels buffers and prints the OME-XML
/// metadata describing them.
#[derive(Parser, Debug, Clone)]
#[command(name = "omeis-import")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// OMEIS file IDs. Values that are not valid IDs are ignored with a warning.
    #[arg(value_name = "FILE_ID")]
    pub ids: Vec<String>,

    /// Only report how the files would be grouped, one group per line.
    #[arg(long, default_value_t = false)]
    pub test: bool,

    /// Prefix output with a CGI status header.
    #[arg(long, default_value_t = false)]
    pub http_response: bool,

    /// OMEIS CGI endpoint.
    #[arg(long, default_value = DEFAULT_OMEIS_URL, env = "OMEIS_URL")]
    pub omeis_url: String,

    /// Timeout for each OMEIS request, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "OMEIS_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.omeis_url.trim().is_empty() {
            return Err("OMEIS URL is required. Set --omeis-url or OMEIS_URL".to_string());
        }
        if !self.omeis_url.starts_with("http://") && !self.omeis_url.starts_with("https://") {
            return Err(format!(
                "OMEIS URL must start with http:// or https://, got '{}'",
                self.omeis_url
            ));
        }
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// The numeric file IDs, skipping (and warning about) anything else.
    pub fn file_ids(&self) -> Vec<u64> {
        self.ids
            .iter()
            .filter_map(|arg| match arg.parse::<u64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("Ignoring parameter: {}", arg);
                    None
                }
            })
            .collect()
    }

    pub fn response_mode(&self) -> ResponseMode {
        if self.http_response {
            ResponseMode::Cgi
        } else {
            ResponseMode::Plain
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// =============================================================================
// Tests
// =============================================================================
