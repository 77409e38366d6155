//! OMEIS importer command-line entry point.
//!
//! stdout carries only the response (OME-XML or group lines); all logging
//! goes to stderr.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omeis_import::{
    config::Config,
    error::ImportError,
    format::TiffImageReader,
    import::{DiscoveredGroup, Importer},
    omeis::{HttpTransport, OmeisClient},
    output::{error_chain, write_failure, write_success},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mode = config.response_mode();
    let file_ids = config.file_ids();

    match run(&config, &file_ids).await {
        Ok(lines) => {
            if let Err(e) = write_success(&mut io::stdout().lock(), mode, &lines) {
                error!("Failed to write response: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = %e.kind(), "An exception occurred: {}", error_chain(&e));
            if let Err(write_error) = write_failure(&mut io::stdout().lock(), mode, &e) {
                error!("Failed to write error response: {}", write_error);
            }
            ExitCode::FAILURE
        }
    }
}

/// Run the requested operation and return the response lines.
async fn run(config: &Config, file_ids: &[u64]) -> Result<Vec<String>, ImportError> {
    let transport = HttpTransport::new(&config.omeis_url, config.request_timeout())?;
    let mut importer = Importer::new(TiffImageReader::new(), OmeisClient::new(transport));

    if config.test {
        let groups = importer.test_ids(file_ids).await?;
        info!(groups = groups.len(), "Group test complete");
        Ok(groups.iter().map(DiscoveredGroup::to_line).collect())
    } else {
        let xml = importer.import_ids(file_ids).await?.into_xml()?;
        Ok(vec![xml])
    }
}

/// Initialize tracing on stderr.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "omeis_import=debug"
    } else {
        "omeis_import=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
