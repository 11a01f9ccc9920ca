//! GitHub REST/GraphQL client over the [`HttpTransport`] boundary.

use std::sync::Arc;
#[cfg(feature = "reqwest-transport")]
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::catalog::RateLimitDescription;
#[cfg(feature = "reqwest-transport")]
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_get};

use super::api::{ApiResponse, GitHubApi, Result};
use super::error::{GitHubError, error_message};
use super::graphql::{GraphQlResponse, SAML_IDENTITY_QUERY, SAML_PROVIDER_QUERY, SamlOrgData};
use super::types::{
    Asset, Collaborator, ListOptions, Membership, Organization, PersonalAccessToken, Repository,
    SamlIdentity, SimpleUser, Team, TeamMembership, User,
};

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const USER_AGENT: &str = "ghconnect";

/// Pagination information extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/organizations/123/members?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "next" => info.next_page = Some(page_num),
                "last" => info.last_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Resolve the REST and GraphQL base URLs.
///
/// An enterprise instance URL maps to `<instance>/api/v3` and
/// `<instance>/api/graphql`; no instance means github.com.
#[must_use]
pub fn endpoints(instance_url: Option<&str>) -> (String, String) {
    match instance_url
        .map(|u| u.trim_end_matches('/'))
        .filter(|u| !u.is_empty())
    {
        Some(base) => (format!("{base}/api/v3"), format!("{base}/api/graphql")),
        None => (DEFAULT_API_URL.to_string(), DEFAULT_GRAPHQL_URL.to_string()),
    }
}

fn page_query(opts: ListOptions) -> String {
    format!("per_page={}&page={}", opts.per_page, opts.page)
}

/// GitHub API client.
///
/// Every request races the client's cancellation token; once it fires,
/// in-flight and subsequent calls fail with [`GitHubError::Cancelled`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    graphql_url: String,
    token: String,
    cancel: CancellationToken,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use tokio_util::sync::CancellationToken;
    ///
    /// // github.com
    /// let client = GitHubClient::new("ghp_...", None, CancellationToken::new())?;
    ///
    /// // GitHub Enterprise Server
    /// let client = GitHubClient::new("ghp_...", Some("https://ghe.example.com"), CancellationToken::new())?;
    /// ```
    #[cfg(feature = "reqwest-transport")]
    pub fn new(
        token: &str,
        instance_url: Option<&str>,
        cancel: CancellationToken,
    ) -> std::result::Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(StdDuration::from_secs(30))?;
        Ok(Self::new_with_transport(
            token,
            instance_url,
            cancel,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        token: &str,
        instance_url: Option<&str>,
        cancel: CancellationToken,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let (api_url, graphql_url) = endpoints(instance_url);
        Self {
            transport,
            api_url,
            graphql_url,
            token: token.to_string(),
            cancel,
        }
    }

    /// REST base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GraphQL endpoint URL.
    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    fn default_headers(&self) -> HttpHeaders {
        vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ("X-GitHub-Api-Version".to_string(), "2022-11-28".to_string()),
        ]
    }

    fn build(&self, method: HttpMethod, url: String) -> HttpRequest {
        let mut request = HttpRequest::new(method, url);
        request.headers = self.default_headers();
        request
    }

    /// Send a request unless cancelled first.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if self.cancel.is_cancelled() {
            return Err(GitHubError::Cancelled);
        }

        tracing::debug!(method = request.method.as_str(), url = %request.url, "GitHub request");

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(GitHubError::Cancelled),
            response = self.transport.send(request) => Ok(response?),
        }
    }

    /// Send and require a success status, returning the raw response and
    /// its rate-limit descriptor.
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> Result<(HttpResponse, Option<RateLimitDescription>)> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(GitHubError::api(
                response.status,
                error_message(&response.body),
            ));
        }

        let rate_limit = RateLimitDescription::from_headers(&response.headers)?;
        Ok((response, rate_limit))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let request = self.build(HttpMethod::Get, format!("{}{}", self.api_url, path));
        let (response, rate_limit) = self.execute(request).await?;

        let next_page = header_get(&response.headers, "link")
            .map(parse_link_header)
            .and_then(|links| links.next_page);
        let data: T = serde_json::from_slice(&response.body)?;

        Ok(ApiResponse::new(data)
            .with_next_page(next_page)
            .with_rate_limit(rate_limit))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>> {
        let request = self
            .build(method, format!("{}{}", self.api_url, path))
            .with_json_body(body)?;
        let (response, rate_limit) = self.execute(request).await?;
        let data: T = serde_json::from_slice(&response.body)?;
        Ok(ApiResponse::new(data).with_rate_limit(rate_limit))
    }

    /// A mutation whose response body is ignored.
    async fn send_empty(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse<()>> {
        let mut request = self.build(method, format!("{}{}", self.api_url, path));
        if let Some(body) = body {
            request = request.with_json_body(body)?;
        }
        let (_, rate_limit) = self.execute(request).await?;
        Ok(ApiResponse::new(()).with_rate_limit(rate_limit))
    }

    /// A presence check: 2xx is `true`, 404 is `false`.
    async fn check(&self, path: &str) -> Result<ApiResponse<bool>> {
        let request = self.build(HttpMethod::Get, format!("{}{}", self.api_url, path));
        let response = self.send(request).await?;
        let present = match response.status {
            s if (200..300).contains(&s) => true,
            404 => false,
            s => return Err(GitHubError::api(s, error_message(&response.body))),
        };

        let rate_limit = RateLimitDescription::from_headers(&response.headers)?;
        Ok(ApiResponse::new(present).with_rate_limit(rate_limit))
    }

    async fn graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<ApiResponse<SamlOrgData>> {
        let request = self
            .build(HttpMethod::Post, self.graphql_url.clone())
            .with_json_body(&json!({ "query": query, "variables": variables }))?;
        let (response, _) = self.execute(request).await?;

        let parsed: GraphQlResponse<SamlOrgData> = serde_json::from_slice(&response.body)?;
        let mut data = parsed.into_data()?;
        let rate_limit = data.rate_limit.take().map(RateLimitDescription::from);
        Ok(ApiResponse::new(data).with_rate_limit(rate_limit))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_orgs(&self, opts: ListOptions) -> Result<ApiResponse<Vec<Organization>>> {
        self.get(&format!("/user/orgs?{}", page_query(opts))).await
    }

    async fn get_org(&self, login: &str) -> Result<ApiResponse<Organization>> {
        self.get(&format!("/orgs/{login}")).await
    }

    async fn get_org_by_id(&self, id: i64) -> Result<ApiResponse<Organization>> {
        self.get(&format!("/organizations/{id}")).await
    }

    async fn get_own_org_membership(&self, org: &str) -> Result<ApiResponse<Membership>> {
        self.get(&format!("/user/memberships/orgs/{org}")).await
    }

    async fn get_org_membership(&self, org: &str, user: &str) -> Result<ApiResponse<Membership>> {
        self.get(&format!("/orgs/{org}/memberships/{user}")).await
    }

    async fn is_org_member(&self, org: &str, user: &str) -> Result<ApiResponse<bool>> {
        self.check(&format!("/orgs/{org}/members/{user}")).await
    }

    async fn edit_org_membership(
        &self,
        org: &str,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<Membership>> {
        self.send_json(
            HttpMethod::Put,
            &format!("/orgs/{org}/memberships/{user}"),
            &json!({ "role": role }),
        )
        .await
    }

    async fn create_org_invitation(
        &self,
        org: &str,
        invitee_id: i64,
        role: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Post,
            &format!("/orgs/{org}/invitations"),
            Some(&json!({ "invitee_id": invitee_id, "role": role })),
        )
        .await
    }

    async fn list_org_members(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>> {
        self.get(&format!("/orgs/{org}/members?{}", page_query(opts)))
            .await
    }

    async fn list_teams(&self, org: &str, opts: ListOptions) -> Result<ApiResponse<Vec<Team>>> {
        self.get(&format!("/orgs/{org}/teams?{}", page_query(opts)))
            .await
    }

    async fn get_team_by_id(&self, org_id: i64, team_id: i64) -> Result<ApiResponse<Team>> {
        self.get(&format!("/organizations/{org_id}/team/{team_id}"))
            .await
    }

    async fn list_child_teams(
        &self,
        org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>> {
        self.get(&format!(
            "/organizations/{org_id}/team/{team_id}/teams?{}",
            page_query(opts)
        ))
        .await
    }

    async fn list_team_members(
        &self,
        org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>> {
        self.get(&format!(
            "/organizations/{org_id}/team/{team_id}/members?{}",
            page_query(opts)
        ))
        .await
    }

    async fn get_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<TeamMembership>> {
        self.get(&format!(
            "/organizations/{org_id}/team/{team_id}/memberships/{user}"
        ))
        .await
    }

    async fn add_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<TeamMembership>> {
        self.send_json(
            HttpMethod::Put,
            &format!("/organizations/{org_id}/team/{team_id}/memberships/{user}"),
            &json!({ "role": role }),
        )
        .await
    }

    async fn remove_team_membership(
        &self,
        org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Delete,
            &format!("/organizations/{org_id}/team/{team_id}/memberships/{user}"),
            None,
        )
        .await
    }

    async fn list_org_repos(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Repository>>> {
        self.get(&format!("/orgs/{org}/repos?{}", page_query(opts)))
            .await
    }

    async fn get_repo_by_id(&self, id: i64) -> Result<ApiResponse<Repository>> {
        self.get(&format!("/repositories/{id}")).await
    }

    async fn list_collaborators(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Collaborator>>> {
        self.get(&format!(
            "/repos/{owner}/{repo}/collaborators?affiliation=all&{}",
            page_query(opts)
        ))
        .await
    }

    async fn is_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<ApiResponse<bool>> {
        self.check(&format!("/repos/{owner}/{repo}/collaborators/{user}"))
            .await
    }

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Put,
            &format!("/repos/{owner}/{repo}/collaborators/{user}"),
            Some(&json!({ "permission": permission })),
        )
        .await
    }

    async fn remove_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Delete,
            &format!("/repos/{owner}/{repo}/collaborators/{user}"),
            None,
        )
        .await
    }

    async fn list_repo_teams(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>> {
        self.get(&format!("/repos/{owner}/{repo}/teams?{}", page_query(opts)))
            .await
    }

    async fn is_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<bool>> {
        self.check(&format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"))
            .await
    }

    async fn add_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Put,
            &format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"),
            Some(&json!({ "permission": permission })),
        )
        .await
    }

    async fn remove_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<()>> {
        self.send_empty(
            HttpMethod::Delete,
            &format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"),
            None,
        )
        .await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<ApiResponse<User>> {
        self.get(&format!("/user/{id}")).await
    }

    async fn list_fine_grained_pats(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<PersonalAccessToken>>> {
        self.get(&format!(
            "/orgs/{org}/personal-access-tokens?{}",
            page_query(opts)
        ))
        .await
    }

    async fn has_saml_provider(&self, org: &str) -> Result<ApiResponse<bool>> {
        let resp = self
            .graphql(SAML_PROVIDER_QUERY, json!({ "login": org }))
            .await?;
        Ok(resp.map(|data| data.has_provider()))
    }

    async fn get_saml_identity(
        &self,
        org: &str,
        login: &str,
    ) -> Result<ApiResponse<Option<SamlIdentity>>> {
        let resp = self
            .graphql(
                SAML_IDENTITY_QUERY,
                json!({ "login": org, "userName": login }),
            )
            .await?;
        Ok(resp.map(SamlOrgData::identity))
    }

    async fn fetch_asset(&self, url: &str) -> Result<Asset> {
        let mut request = self.build(HttpMethod::Get, url.to_string());
        request.headers.retain(|(k, _)| k != "Accept");
        request.headers.push(("Accept".to_string(), "*/*".to_string()));

        let (response, _) = self.execute(request).await?;
        let content_type = response
            .header("content-type")
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Asset {
            content_type,
            data: response.body,
        })
    }
}
