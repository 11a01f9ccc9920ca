//! GraphQL queries for SAML identity lookups and their response shapes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::catalog::RateLimitDescription;

use super::error::GitHubError;
use super::types::SamlIdentity;

pub(crate) const SAML_PROVIDER_QUERY: &str = "query($login: String!) { \
organization(login: $login) { samlIdentityProvider { id } } \
rateLimit { limit cost remaining resetAt } }";

pub(crate) const SAML_IDENTITY_QUERY: &str = "query($login: String!, $userName: String!) { \
organization(login: $login) { samlIdentityProvider { \
externalIdentities(first: 1, login: $userName) { edges { node { \
samlIdentity { nameId emails { value } } } } } } } \
rateLimit { limit cost remaining resetAt } }";

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlErrorMessage {
    pub message: String,
}

impl<T> GraphQlResponse<T> {
    pub(crate) fn into_data(self) -> Result<T, GitHubError> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(GitHubError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| GitHubError::GraphQl("response carried no data".to_string()))
    }
}

/// The GraphQL endpoint's own request budget.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateLimitBlock {
    pub limit: u64,
    #[allow(dead_code)]
    pub cost: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl From<RateLimitBlock> for RateLimitDescription {
    fn from(block: RateLimitBlock) -> Self {
        RateLimitDescription::new(block.limit, block.remaining, Some(block.reset_at))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SamlOrgData {
    pub organization: Option<SamlOrganization>,
    pub rate_limit: Option<RateLimitBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SamlOrganization {
    pub saml_identity_provider: Option<SamlProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SamlProvider {
    #[serde(default)]
    pub external_identities: Option<IdentityConnection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentityConnection {
    #[serde(default)]
    pub edges: Vec<IdentityEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentityEdge {
    pub node: Option<IdentityNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdentityNode {
    pub saml_identity: Option<SamlIdentityNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SamlIdentityNode {
    pub name_id: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailValue {
    pub value: Option<String>,
}

impl SamlOrgData {
    pub(crate) fn has_provider(&self) -> bool {
        self.organization
            .as_ref()
            .is_some_and(|org| org.saml_identity_provider.is_some())
    }

    /// The first external identity, if the organization has one for the user.
    pub(crate) fn identity(self) -> Option<SamlIdentity> {
        let node = self
            .organization?
            .saml_identity_provider?
            .external_identities?
            .edges
            .into_iter()
            .next()?
            .node?
            .saml_identity?;

        Some(SamlIdentity {
            name_id: node.name_id,
            emails: node.emails.into_iter().filter_map(|e| e.value).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identity_and_rate_limit() {
        let resp: GraphQlResponse<SamlOrgData> = serde_json::from_value(serde_json::json!({
            "data": {
                "organization": {"samlIdentityProvider": {"externalIdentities": {"edges": [
                    {"node": {"samlIdentity": {
                        "nameId": "ada@example.com",
                        "emails": [{"value": "ada@corp.example.com"}, {"value": null}]
                    }}}
                ]}}},
                "rateLimit": {"limit": 5000, "cost": 1, "remaining": 4990, "resetAt": "2024-01-01T00:00:00Z"}
            }
        }))
        .unwrap();

        let mut data = resp.into_data().unwrap();
        let rate: RateLimitDescription = data.rate_limit.take().unwrap().into();
        assert_eq!(rate.remaining, 4990);
        assert!(data.has_provider());

        let identity = data.identity().unwrap();
        assert_eq!(identity.name_id.as_deref(), Some("ada@example.com"));
        assert_eq!(identity.emails, vec!["ada@corp.example.com".to_string()]);
    }

    #[test]
    fn organization_without_provider_has_no_identity() {
        let resp: GraphQlResponse<SamlOrgData> = serde_json::from_value(serde_json::json!({
            "data": {"organization": {"samlIdentityProvider": null}}
        }))
        .unwrap();
        let data = resp.into_data().unwrap();
        assert!(!data.has_provider());
        assert!(data.identity().is_none());
    }

    #[test]
    fn errors_are_reported() {
        let resp: GraphQlResponse<SamlOrgData> = serde_json::from_value(serde_json::json!({
            "data": null,
            "errors": [{"message": "Resource not accessible"}, {"message": "second"}]
        }))
        .unwrap();
        let err = resp.into_data().unwrap_err();
        assert!(err.to_string().contains("Resource not accessible; second"));
    }
}
