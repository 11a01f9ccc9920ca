//! ghconnect - an identity-governance connector for GitHub.
//!
//! This library discovers a GitHub organization's access-control graph
//! (organizations, teams, repositories, members and fine-grained tokens) and
//! exposes it as a catalog of resources, entitlements and grants. Grants on
//! organizations, teams and repositories can be written back.
//!
//! # Example
//!
//! ```ignore
//! use ghconnect::{Connector, ConnectorConfig, GitHubClient, SyncOptions, SyncRunner};
//!
//! let client = GitHubClient::new(token, None, cancel.clone())?;
//! let connector = Arc::new(Connector::new(Arc::new(client), ConnectorConfig::default()));
//! connector.validate().await?;
//!
//! let catalog = SyncRunner::new(connector, SyncOptions::default(), cancel).run().await?;
//! ```

pub mod asset;
pub mod cache;
pub mod catalog;
pub mod connector;
pub mod error;
pub mod github;
pub mod http;
pub mod pagination;
pub mod retry;
pub mod sync;

#[cfg(test)]
mod testing;

pub use catalog::{
    Annotation, Entitlement, Grant, RateLimitDescription, Resource, ResourceId, ResourceTypeTag,
};
pub use connector::{Connector, ConnectorConfig, Page, PageToken, ResourceSyncer};
pub use error::{ConnectorError, Result};
pub use github::{GitHubApi, GitHubClient, GitHubError};
pub use http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use sync::{Catalog, SyncOptions, SyncRunner};
