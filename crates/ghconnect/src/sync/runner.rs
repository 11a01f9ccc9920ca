use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::throttle::{DEFAULT_REQUESTS_PER_SECOND, Throttle};
use crate::catalog::{Entitlement, Grant, Resource, ResourceId, ResourceTypeTag, child_resource_types};
use crate::connector::{Connector, Page, PageToken, ResourceSyncer};
use crate::error::{ConnectorError, Result};
use crate::retry::{RetryConfig, with_retry};

/// Options for a full sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Page size requested from every listing; zero lets the connector choose.
    pub page_size: u32,
    /// Client-side request pacing.
    pub requests_per_second: u32,
    pub retry: RetryConfig,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 0,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            retry: RetryConfig::default(),
        }
    }
}

/// Everything discovered by one sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub resources: Vec<Resource>,
    pub entitlements: Vec<Entitlement>,
    pub grants: Vec<Grant>,
}

impl Catalog {
    /// Resources of one type, in discovery order.
    pub fn resources_of(&self, resource_type: ResourceTypeTag) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(move |r| r.id.resource_type == resource_type)
    }
}

/// Drives every resource syncer of a [`Connector`] to completion.
///
/// Starting from organizations, each listed resource's child resource types
/// are listed in turn, breadth first. Every token is drained; each call is
/// paced, retried on transient failures, and parked while the upstream
/// budget is exhausted.
pub struct SyncRunner {
    connector: Arc<Connector>,
    throttle: Throttle,
    retry: RetryConfig,
    cancel: CancellationToken,
    page_size: u32,
}

impl SyncRunner {
    pub fn new(connector: Arc<Connector>, options: SyncOptions, cancel: CancellationToken) -> Self {
        Self {
            connector,
            throttle: Throttle::new(options.requests_per_second, cancel.clone()),
            retry: options.retry,
            cancel,
            page_size: options.page_size,
        }
    }

    pub async fn run(&self) -> Result<Catalog> {
        let mut catalog = Catalog::default();
        let mut seen: HashSet<ResourceId> = HashSet::new();
        let mut queue: VecDeque<(ResourceTypeTag, Option<ResourceId>)> = VecDeque::new();
        queue.push_back((ResourceTypeTag::Org, None));

        while let Some((resource_type, parent)) = queue.pop_front() {
            let Some(syncer) = self.connector.syncer(resource_type) else {
                tracing::warn!(resource_type = %resource_type, "No syncer registered, skipping");
                continue;
            };

            let listed = self
                .drain("list", |token| {
                    let syncer = Arc::clone(&syncer);
                    let parent = parent.clone();
                    async move { syncer.list(parent.as_ref(), &token).await }
                })
                .await?;

            let mut added = 0usize;
            for resource in listed {
                if !seen.insert(resource.id.clone()) {
                    continue;
                }
                for child in child_resource_types(&resource.annotations) {
                    queue.push_back((child, Some(resource.id.clone())));
                }
                catalog.resources.push(resource);
                added += 1;
            }
            tracing::debug!(
                resource_type = %resource_type,
                parent = ?parent.as_ref().map(ToString::to_string),
                count = added,
                "Listed resources"
            );
        }

        for resource in &catalog.resources {
            let Some(syncer) = self.connector.syncer(resource.id.resource_type) else {
                continue;
            };
            let entitlements = self.entitlements(&syncer, resource).await?;
            let grants = self.grants(&syncer, resource).await?;
            catalog.entitlements.extend(entitlements);
            catalog.grants.extend(grants);
        }

        tracing::info!(
            resources = catalog.resources.len(),
            entitlements = catalog.entitlements.len(),
            grants = catalog.grants.len(),
            "Sync complete"
        );
        Ok(catalog)
    }

    async fn entitlements(&self, syncer: &Arc<dyn ResourceSyncer>, resource: &Resource) -> Result<Vec<Entitlement>> {
        self.drain("entitlements", |token| {
            let syncer = Arc::clone(syncer);
            let resource = resource.clone();
            async move { syncer.entitlements(&resource, &token).await }
        })
        .await
    }

    async fn grants(&self, syncer: &Arc<dyn ResourceSyncer>, resource: &Resource) -> Result<Vec<Grant>> {
        self.drain("grants", |token| {
            let syncer = Arc::clone(syncer);
            let resource = resource.clone();
            async move { syncer.grants(&resource, &token).await }
        })
        .await
    }

    /// Call `fetch` with successive tokens until the listing is complete.
    async fn drain<T, F, Fut>(&self, label: &str, mut fetch: F) -> Result<Vec<T>>
    where
        F: FnMut(PageToken) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let mut token = PageToken::new("", self.page_size);
        let mut items = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                return Err(ConnectorError::Cancelled);
            }
            self.throttle.wait().await;

            let page = with_retry(
                self.retry.clone(),
                || fetch(token.clone()),
                ConnectorError::is_retryable,
                label,
            )
            .await?;
            self.throttle.observe(&page.annotations).await?;

            items.extend(page.items);
            if page.next_token.is_empty() {
                return Ok(items);
            }
            token.token = page.next_token;
        }
    }
}
