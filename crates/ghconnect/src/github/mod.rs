//! GitHub REST and GraphQL access.
//!
//! Drivers depend on the [`GitHubApi`] trait only. [`GitHubClient`]
//! implements it over the [`crate::http::HttpTransport`] boundary.

mod api;
mod client;
mod error;
mod graphql;
pub mod types;

pub use api::{ApiResponse, GitHubApi};
pub use client::{GitHubClient, LinkPagination, endpoints, parse_link_header};
pub use error::GitHubError;
pub use types::{
    Asset, Collaborator, ListOptions, MAX_PAGE_SIZE, Membership, Organization,
    PersonalAccessToken, Repository, SamlIdentity, SimpleUser, Team, TeamMembership, TeamParent,
    User,
};
