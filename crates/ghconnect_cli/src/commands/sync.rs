use std::fs::File;
use std::io::{self, BufWriter, Write};

use ghconnect::retry::RetryConfig;
use ghconnect::{Catalog, SyncOptions, SyncRunner};
use tokio_util::sync::CancellationToken;

use crate::commands::connect;
use crate::config::Config;

/// Validate, run a full sync, and write the catalog as JSON.
pub(crate) async fn handle_sync(
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = connect(config, cancel.clone())?;
    connector.validate().await?;

    let options = SyncOptions {
        page_size: config.sync.page_size,
        requests_per_second: config.sync.requests_per_second,
        retry: RetryConfig::default(),
    };
    let catalog = SyncRunner::new(connector, options, cancel).run().await?;

    match &config.sync.output {
        Some(path) => {
            write_catalog(&catalog, BufWriter::new(File::create(path)?))?;
            summarize(&catalog, &path.display().to_string());
        }
        None => {
            write_catalog(&catalog, io::stdout().lock())?;
            summarize(&catalog, "stdout");
        }
    }
    Ok(())
}

fn write_catalog(catalog: &Catalog, mut out: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, catalog)?;
    writeln!(out)?;
    out.flush()
}

fn summarize(catalog: &Catalog, target: &str) {
    tracing::info!(
        "Wrote {} resources, {} entitlements and {} grants to {}",
        catalog.resources.len(),
        catalog.entitlements.len(),
        catalog.grants.len(),
        target
    );
}
