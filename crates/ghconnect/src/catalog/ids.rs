//! Resource identifiers and the deterministic entitlement/grant id scheme.
//!
//! Organizations, repositories and users are keyed by their bare upstream
//! numeric id. Teams and API tokens use the scoped form
//! `"<orgLogin>:<upstreamId>"`, so a single id carries enough context to
//! address the owning organization's endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

/// The kind of node a [`ResourceId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceTypeTag {
    Org,
    Team,
    Repository,
    User,
    ApiToken,
}

impl ResourceTypeTag {
    /// Every resource type, in root-to-leaf order.
    pub const ALL: [ResourceTypeTag; 5] = [
        ResourceTypeTag::Org,
        ResourceTypeTag::Team,
        ResourceTypeTag::Repository,
        ResourceTypeTag::User,
        ResourceTypeTag::ApiToken,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceTypeTag::Org => "org",
            ResourceTypeTag::Team => "team",
            ResourceTypeTag::Repository => "repository",
            ResourceTypeTag::User => "user",
            ResourceTypeTag::ApiToken => "api-token",
        }
    }

    /// Whether ids of this type use the `<orgLogin>:<id>` form.
    #[must_use]
    pub fn is_scoped(self) -> bool {
        matches!(self, ResourceTypeTag::Team | ResourceTypeTag::ApiToken)
    }
}

impl fmt::Display for ResourceTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceTypeTag {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceTypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ConnectorError::malformed_id(s, "unknown resource type"))
    }
}

/// Composite key of a resource: its type plus an opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: ResourceTypeTag,
    pub resource: String,
}

impl ResourceId {
    #[must_use]
    pub fn new(resource_type: ResourceTypeTag, resource: impl Into<String>) -> Self {
        Self {
            resource_type,
            resource: resource.into(),
        }
    }

    /// Id of a resource keyed by its bare upstream id.
    #[must_use]
    pub fn bare(resource_type: ResourceTypeTag, upstream_id: i64) -> Self {
        Self::new(resource_type, upstream_id.to_string())
    }

    /// Id of a resource keyed by `<orgLogin>:<upstreamId>`.
    #[must_use]
    pub fn scoped(resource_type: ResourceTypeTag, org_login: &str, upstream_id: i64) -> Self {
        Self::new(resource_type, format_scoped_id(org_login, upstream_id))
    }

    /// The upstream numeric id encoded in this resource id.
    pub fn upstream_id(&self) -> Result<i64> {
        parse_upstream_id(&self.resource)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

/// Format a scoped id as `<orgLogin>:<upstreamId>`.
#[must_use]
pub fn format_scoped_id(org_login: &str, upstream_id: i64) -> String {
    format!("{org_login}:{upstream_id}")
}

/// Extract the upstream numeric id from a bare or scoped id.
///
/// The id is the last `:`-separated segment.
pub fn parse_upstream_id(resource: &str) -> Result<i64> {
    let last = resource.rsplit(':').next().unwrap_or(resource);
    last.parse::<i64>()
        .map_err(|e| ConnectorError::malformed_id(resource, e.to_string()))
}

/// Split a scoped id into its organization login and upstream numeric id.
pub fn parse_scoped_id(resource: &str) -> Result<(String, i64)> {
    let (org, id) = resource
        .rsplit_once(':')
        .ok_or_else(|| ConnectorError::malformed_id(resource, "expected <org>:<id>"))?;
    if org.is_empty() {
        return Err(ConnectorError::malformed_id(resource, "empty organization"));
    }
    let id = id
        .parse::<i64>()
        .map_err(|e| ConnectorError::malformed_id(resource, e.to_string()))?;
    Ok((org.to_string(), id))
}

/// Deterministic entitlement id: `<type>:<resource>:<slug>`.
#[must_use]
pub fn entitlement_id(resource_id: &ResourceId, slug: &str) -> String {
    format!("{}:{}:{}", resource_id.resource_type, resource_id.resource, slug)
}

/// Deterministic grant id: `<entitlementId>:<principalType>:<principalResource>`.
#[must_use]
pub fn grant_id(entitlement_id: &str, principal: &ResourceId) -> String {
    format!(
        "{}:{}:{}",
        entitlement_id, principal.resource_type, principal.resource
    )
}
