use tokio_util::sync::CancellationToken;

use crate::commands::connect;
use crate::config::Config;

/// Check the credential and report the organizations in scope.
pub(crate) async fn handle_validate(
    config: &Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = connect(config, cancel)?;
    connector.validate().await?;

    let metadata = connector.metadata();
    if connector.config().orgs.is_empty() {
        println!(
            "{}: credentials valid for at least one administered organization.",
            metadata.display_name
        );
    } else {
        println!(
            "{}: credentials valid for {}.",
            metadata.display_name,
            connector.config().orgs.join(", ")
        );
    }
    Ok(())
}
