//! Resource drivers and the connector that owns them.
//!
//! Each resource type has a [`ResourceSyncer`] that lists child resources,
//! describes the entitlements defined on a resource, lists the grants on
//! it, and (where the upstream supports it) grants or revokes an
//! entitlement. Listings are paged through the opaque token in
//! [`PageToken`]; an empty [`Page::next_token`] means the listing is done.
//!
//! # Example
//!
//! ```ignore
//! use ghconnect::connector::{Connector, ConnectorConfig, PageToken};
//! use ghconnect::catalog::ResourceTypeTag;
//!
//! let connector = Connector::new(Arc::new(client), ConnectorConfig::default());
//! connector.validate().await?;
//!
//! let orgs = connector.syncer(ResourceTypeTag::Org).expect("org syncer");
//! let mut token = PageToken::default();
//! loop {
//!     let page = orgs.list(None, &token).await?;
//!     // ...
//!     if page.next_token.is_empty() { break; }
//!     token.token = page.next_token;
//! }
//! ```

mod api_token;
mod org;
mod repository;
mod resource_types;
mod team;
mod user;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::asset::validate_asset_url;
use crate::cache::OrgNameCache;
use crate::catalog::{
    Annotation, AssetRef, Entitlement, Grant, RateLimitDescription, Resource, ResourceId,
    ResourceTypeTag,
};
use crate::error::{ConnectorError, Result};
use crate::github::{Asset, GitHubApi, ListOptions};

pub use api_token::ApiTokenSyncer;
pub use org::OrgSyncer;
pub use repository::{REPOSITORY_PERMISSIONS, RepositorySyncer};
pub use resource_types::{ResourceType, TraitKind, resource_type};
pub use team::TeamSyncer;
pub use user::UserSyncer;

/// Caller-supplied paging state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageToken {
    /// Opaque token from the previous page; empty to start.
    pub token: String,
    /// Requested page size; zero lets the connector choose.
    pub size: u32,
}

impl PageToken {
    #[must_use]
    pub fn new(token: impl Into<String>, size: u32) -> Self {
        Self {
            token: token.into(),
            size,
        }
    }

    pub(crate) fn list_options(&self, page: u32) -> ListOptions {
        ListOptions::new(page, self.size)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next call; empty when the listing is complete.
    pub next_token: String,
    pub annotations: Vec<Annotation>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_token: String::new(),
            annotations: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    /// A final page holding `items`.
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }
}

/// Rate-limit annotations for a page, from the upstream response.
pub(crate) fn rate_limit_annotations(rate_limit: Option<RateLimitDescription>) -> Vec<Annotation> {
    rate_limit.into_iter().map(Annotation::RateLimit).collect()
}

/// Reject principals of any type other than `expected`.
pub(crate) fn require_principal(
    principal: &ResourceId,
    expected: ResourceTypeTag,
    action: &str,
) -> Result<()> {
    if principal.resource_type == expected {
        return Ok(());
    }
    tracing::warn!(
        principal_type = %principal.resource_type,
        principal_id = %principal.resource,
        "Rejected {action}: principal must be a {expected}"
    );
    Err(ConnectorError::invariant(format!(
        "only {expected} principals can be {action}, got {}",
        principal.resource_type
    )))
}

/// Listing, entitlement and grant operations for one resource type.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    fn resource_type(&self) -> ResourceTypeTag;

    /// List resources of this type under `parent`.
    async fn list(&self, parent: Option<&ResourceId>, token: &PageToken)
    -> Result<Page<Resource>>;

    /// Entitlements defined on `resource`.
    async fn entitlements(&self, resource: &Resource, token: &PageToken)
    -> Result<Page<Entitlement>>;

    /// Grants currently held on `resource`.
    async fn grants(&self, resource: &Resource, token: &PageToken) -> Result<Page<Grant>>;

    /// Give `principal` the `entitlement` upstream.
    async fn grant(
        &self,
        _principal: &Resource,
        _entitlement: &Entitlement,
    ) -> Result<Vec<Annotation>> {
        Err(ConnectorError::Unsupported {
            operation: "grant",
            resource_type: self.resource_type(),
        })
    }

    /// Remove `grant` upstream. Revoking an absent grant succeeds.
    async fn revoke(&self, _grant: &Grant) -> Result<Vec<Annotation>> {
        Err(ConnectorError::Unsupported {
            operation: "revoke",
            resource_type: self.resource_type(),
        })
    }
}

/// Connector configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Organizations to sync; empty means every organization the caller
    /// administers.
    pub orgs: Vec<String>,
    /// GitHub Enterprise base URL; `None` for github.com.
    pub instance_url: Option<String>,
}

/// Static description of the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorMetadata {
    pub display_name: String,
    pub description: String,
    pub resource_types: Vec<ResourceType>,
}

/// The GitHub connector: one syncer per resource type over a shared client
/// and organization name cache.
pub struct Connector {
    client: Arc<dyn GitHubApi>,
    config: ConnectorConfig,
    syncers: Vec<Arc<dyn ResourceSyncer>>,
}

impl Connector {
    pub fn new(client: Arc<dyn GitHubApi>, config: ConnectorConfig) -> Self {
        let cache = Arc::new(OrgNameCache::new(Arc::clone(&client)));
        let orgs: BTreeSet<String> = config.orgs.iter().cloned().collect();

        let syncers: Vec<Arc<dyn ResourceSyncer>> = vec![
            Arc::new(OrgSyncer::new(Arc::clone(&client), Arc::clone(&cache), orgs)),
            Arc::new(TeamSyncer::new(Arc::clone(&client), Arc::clone(&cache))),
            Arc::new(RepositorySyncer::new(Arc::clone(&client), Arc::clone(&cache))),
            Arc::new(UserSyncer::new(Arc::clone(&client), Arc::clone(&cache))),
            Arc::new(ApiTokenSyncer::new(Arc::clone(&client), cache)),
        ];

        Self {
            client,
            config,
            syncers,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn resource_syncers(&self) -> &[Arc<dyn ResourceSyncer>] {
        &self.syncers
    }

    pub fn syncer(&self, resource_type: ResourceTypeTag) -> Option<Arc<dyn ResourceSyncer>> {
        self.syncers
            .iter()
            .find(|s| s.resource_type() == resource_type)
            .cloned()
    }

    pub fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: "GitHub".to_string(),
            description: "Syncs organizations, teams, repositories, members and fine-grained \
                          tokens from GitHub"
                .to_string(),
            resource_types: ResourceTypeTag::ALL.into_iter().map(resource_type).collect(),
        }
    }

    /// Confirm the credential works and administers at least one
    /// organization.
    ///
    /// With configured organizations, every one of them must be
    /// administered. Without, the caller's organizations are enumerated and
    /// any one administered organization suffices.
    pub async fn validate(&self) -> Result<()> {
        let (orgs, explicit) = if self.config.orgs.is_empty() {
            (self.all_org_logins().await?, false)
        } else {
            (self.config.orgs.clone(), true)
        };

        let mut administered = 0usize;
        for org in &orgs {
            let membership = match self.client.get_own_org_membership(org).await {
                Ok(resp) => resp.data,
                Err(e) if e.is_unauthorized() => return Err(e.into()),
                Err(e) => {
                    if explicit {
                        tracing::warn!(org = %org, error = %e, "Failed to read own membership");
                        return Err(ConnectorError::NotOrgAdmin { org: org.clone() });
                    }
                    tracing::debug!(org = %org, error = %e, "Skipping organization during validation");
                    continue;
                }
            };

            if !membership.role.eq_ignore_ascii_case(org::ORG_ROLE_ADMIN) {
                if explicit {
                    return Err(ConnectorError::NotOrgAdmin { org: org.clone() });
                }
                continue;
            }
            administered += 1;
        }

        if administered == 0 {
            return Err(ConnectorError::NoAdministeredOrganization);
        }

        tracing::info!(organizations = administered, "Validated GitHub credentials");
        Ok(())
    }

    async fn all_org_logins(&self) -> Result<Vec<String>> {
        let mut logins = Vec::new();
        let mut page = 1;
        loop {
            let resp = self
                .client
                .list_orgs(ListOptions::new(page, crate::github::MAX_PAGE_SIZE))
                .await?;
            logins.extend(resp.data.into_iter().map(|org| org.login));
            match resp.next_page {
                Some(next) => page = next,
                None => return Ok(logins),
            }
        }
    }

    /// Fetch an asset such as an avatar after validating its URL.
    pub async fn asset(&self, asset: &AssetRef) -> Result<Asset> {
        let url = validate_asset_url(&asset.id, self.config.instance_url.as_deref())?;
        Ok(self.client.fetch_asset(url.as_str()).await?)
    }
}
