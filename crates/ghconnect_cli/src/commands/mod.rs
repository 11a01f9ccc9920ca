pub(crate) mod sync;
pub(crate) mod validate;

use std::error::Error;
use std::sync::Arc;

use ghconnect::{Connector, ConnectorConfig, GitHubClient};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Build a connector from the loaded configuration.
pub(crate) fn connect(
    config: &Config,
    cancel: CancellationToken,
) -> Result<Arc<Connector>, Box<dyn Error>> {
    let token = config.github_token()?;
    let instance_url = config.github.instance_url.as_deref().filter(|u| !u.is_empty());
    let client = GitHubClient::new(token, instance_url, cancel)?;

    Ok(Arc::new(Connector::new(
        Arc::new(client),
        ConnectorConfig {
            orgs: config.github.orgs.clone(),
            instance_url: instance_url.map(str::to_string),
        },
    )))
}
