//! The upstream API boundary the resource drivers are written against.

use async_trait::async_trait;

use crate::catalog::RateLimitDescription;

use super::error::GitHubError;
use super::types::{
    Asset, Collaborator, ListOptions, Membership, Organization, PersonalAccessToken, Repository,
    SamlIdentity, SimpleUser, Team, TeamMembership, User,
};

/// Result type for GitHub API operations.
pub type Result<T> = std::result::Result<T, GitHubError>;

/// A decoded response: the payload, the next page (if upstream reports one)
/// and the request budget at the time of the call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub next_page: Option<u32>,
    pub rate_limit: Option<RateLimitDescription>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            data,
            next_page: None,
            rate_limit: None,
        }
    }

    #[must_use]
    pub fn with_next_page(mut self, next_page: Option<u32>) -> Self {
        self.next_page = next_page;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitDescription>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replace the payload, keeping page and rate-limit information.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            next_page: self.next_page,
            rate_limit: self.rate_limit,
        }
    }
}

/// Every upstream call the drivers make.
///
/// Implemented by [`super::GitHubClient`] for the real API and by an
/// in-memory fake in tests.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    // Organizations

    /// Organizations the authenticated user belongs to.
    async fn list_orgs(&self, opts: ListOptions) -> Result<ApiResponse<Vec<Organization>>>;

    async fn get_org(&self, login: &str) -> Result<ApiResponse<Organization>>;

    async fn get_org_by_id(&self, id: i64) -> Result<ApiResponse<Organization>>;

    /// The authenticated user's membership in `org`.
    async fn get_own_org_membership(&self, org: &str) -> Result<ApiResponse<Membership>>;

    async fn get_org_membership(&self, org: &str, user: &str) -> Result<ApiResponse<Membership>>;

    async fn is_org_member(&self, org: &str, user: &str) -> Result<ApiResponse<bool>>;

    async fn edit_org_membership(
        &self,
        org: &str,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<Membership>>;

    async fn create_org_invitation(
        &self,
        org: &str,
        invitee_id: i64,
        role: &str,
    ) -> Result<ApiResponse<()>>;

    async fn list_org_members(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>>;

    // Teams

    async fn list_teams(&self, org: &str, opts: ListOptions) -> Result<ApiResponse<Vec<Team>>>;

    async fn get_team_by_id(&self, org_id: i64, team_id: i64) -> Result<ApiResponse<Team>>;

    async fn list_child_teams(
        &self,
        org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>>;

    async fn list_team_members(
        &self,
        org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>>;

    async fn get_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<TeamMembership>>;

    async fn add_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<TeamMembership>>;

    async fn remove_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<()>>;

    // Repositories

    async fn list_org_repos(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Repository>>>;

    async fn get_repo_by_id(&self, id: i64) -> Result<ApiResponse<Repository>>;

    /// Collaborators with affiliation `all`.
    async fn list_collaborators(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Collaborator>>>;

    async fn is_collaborator(&self, owner: &str, repo: &str, user: &str)
    -> Result<ApiResponse<bool>>;

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>>;

    async fn remove_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<ApiResponse<()>>;

    async fn list_repo_teams(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>>;

    async fn is_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<bool>>;

    async fn add_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>>;

    async fn remove_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<()>>;

    // Users and tokens

    async fn get_user_by_id(&self, id: i64) -> Result<ApiResponse<User>>;

    async fn list_fine_grained_pats(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<PersonalAccessToken>>>;

    // SAML (GraphQL). Rate limits here come from the GraphQL budget.

    async fn has_saml_provider(&self, org: &str) -> Result<ApiResponse<bool>>;

    async fn get_saml_identity(
        &self,
        org: &str,
        login: &str,
    ) -> Result<ApiResponse<Option<SamlIdentity>>>;

    // Assets

    async fn fetch_asset(&self, url: &str) -> Result<Asset>;
}
