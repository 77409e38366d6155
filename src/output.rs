//! Framing of what the importer prints on stdout.
//!
//! In CGI mode every response starts with a status header so the importer
//! can be run directly by the web server in front of OMEIS.

use std::error::Error;
use std::io::{self, Write};

/// Header printed before a successful response in CGI mode.
pub const SUCCESS_HEADER: &str = "Status: 200 OK\r\nContent-Type: text/plain\r\n\r\n";

/// Header printed before a failure report in CGI mode.
pub const FAILURE_HEADER: &str = "Status: 500 Server Error\r\nContent-Type: text/plain\r\n\r\n";

/// How stdout output is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Bare output
    #[default]
    Plain,
    /// Output preceded by a CGI status header
    Cgi,
}

/// Write a successful response body, one line per entry.
pub fn write_success<W: Write>(out: &mut W, mode: ResponseMode, lines: &[String]) -> io::Result<()> {
    if mode == ResponseMode::Cgi {
        out.write_all(SUCCESS_HEADER.as_bytes())?;
    }
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

/// Write a failure report. Nothing is written in plain mode, where errors
/// only go to the log.
pub fn write_failure<W: Write>(
    out: &mut W,
    mode: ResponseMode,
    error: &(dyn Error + 'static),
) -> io::Result<()> {
    if mode == ResponseMode::Plain {
        return Ok(());
    }
    out.write_all(FAILURE_HEADER.as_bytes())?;
    writeln!(out, "An exception occurred while processing FileIDs:")?;
    writeln!(out, "{}", error_chain(error))?;
    out.flush()
}

/// An error and all its sources, one per line.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
