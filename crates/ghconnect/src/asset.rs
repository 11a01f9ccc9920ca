//! Validation of asset references before they are fetched.

use url::Url;

use crate::error::{ConnectorError, Result};

const AVATAR_HOST: &str = "avatars.githubusercontent.com";

fn invalid(url: &str, reason: impl Into<String>) -> ConnectorError {
    ConnectorError::InvalidAssetUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Host of an instance URL, which may be given without a scheme.
fn instance_host(instance_url: &str) -> Option<String> {
    let with_scheme = if instance_url.contains("://") {
        instance_url.to_string()
    } else {
        format!("https://{instance_url}")
    };
    Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Check that `raw` is an https URL on a host the connector trusts: the
/// avatar CDN for github.com, or the enterprise instance's host or one of
/// its subdomains.
pub fn validate_asset_url(raw: &str, instance_url: Option<&str>) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| invalid(raw, e.to_string()))?;
    if url.scheme() != "https" {
        return Err(invalid(raw, format!("scheme {} is not https", url.scheme())));
    }
    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| invalid(raw, "missing host"))?;

    match instance_url.filter(|i| !i.is_empty()) {
        None => {
            if host != AVATAR_HOST {
                return Err(invalid(raw, format!("host {host} is not {AVATAR_HOST}")));
            }
        }
        Some(instance) => {
            let expected = instance_host(instance)
                .ok_or_else(|| invalid(raw, format!("instance url {instance:?} has no host")))?;
            if host != expected && !host.ends_with(&format!(".{expected}")) {
                return Err(invalid(raw, format!("host {host} is not on {expected}")));
            }
        }
    }

    Ok(url)
}
