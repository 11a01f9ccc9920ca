use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tokio::sync::Mutex;

use super::{Page, PageToken, ResourceSyncer, rate_limit_annotations};
use crate::cache::OrgNameCache;
use crate::catalog::{
    Annotation, AssetRef, Email, Entitlement, Grant, Profile, RateLimitDescription, Resource,
    ResourceId, ResourceTrait, ResourceTypeTag, UserStatus, UserTrait, split_name,
};
use crate::error::{ConnectorError, Result};
use crate::github::{GitHubApi, SamlIdentity, SimpleUser, User};
use crate::pagination::{page_cursor, parse_page_token};

#[allow(clippy::expect_used)] // literal pattern
static EMAIL_REGEX: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex should not panic")
});

/// Organization members.
///
/// Entitlements and grants are empty: organization membership is modelled by
/// the org driver.
pub struct UserSyncer {
    client: Arc<dyn GitHubApi>,
    cache: Arc<OrgNameCache>,
    saml_enabled: Mutex<HashMap<String, bool>>,
}

impl UserSyncer {
    pub fn new(client: Arc<dyn GitHubApi>, cache: Arc<OrgNameCache>) -> Self {
        Self {
            client,
            cache,
            saml_enabled: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `org` has a SAML provider, asked upstream at most once.
    async fn has_saml(&self, org: &str, graphql_limit: &mut Option<RateLimitDescription>) -> Result<bool> {
        let mut known = self.saml_enabled.lock().await;
        if let Some(enabled) = known.get(org) {
            return Ok(*enabled);
        }
        let resp = self.client.has_saml_provider(org).await?;
        if resp.rate_limit.is_some() {
            *graphql_limit = resp.rate_limit;
        }
        known.insert(org.to_string(), resp.data);
        Ok(resp.data)
    }

    async fn full_profile(&self, org: &str, summary: SimpleUser) -> Result<User> {
        match self.client.get_user_by_id(summary.id).await {
            Ok(resp) => Ok(resp.data),
            Err(e) if e.is_not_found() => {
                tracing::warn!(org = %org, user = %summary.login, "User profile not found, using membership summary");
                Ok(User::from(summary))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Email addresses for a user: the SAML NameID first, then valid SAML
/// emails, falling back to the public profile email.
fn user_emails(user: &User, saml: Option<&SamlIdentity>) -> Vec<Email> {
    let mut emails: Vec<Email> = Vec::new();
    let mut add = |address: &str, primary: bool| {
        if !emails.iter().any(|e| e.address == address) {
            emails.push(Email {
                address: address.to_string(),
                primary,
            });
        }
    };

    if let Some(identity) = saml {
        if let Some(name_id) = identity.name_id.as_deref().filter(|n| !n.is_empty()) {
            add(name_id, true);
        }
        for address in &identity.emails {
            if EMAIL_REGEX.is_match(address) {
                add(address, false);
            } else {
                tracing::debug!(user = %user.login, address = %address, "Ignoring invalid SAML email");
            }
        }
    }

    if !emails.iter().any(|e| e.primary) {
        if let Some(first) = emails.first_mut() {
            first.primary = true;
        } else if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
            emails.push(Email {
                address: email.to_string(),
                primary: true,
            });
        }
    }
    emails
}

fn user_resource(org_id: &ResourceId, user: &User, emails: Vec<Email>) -> Resource {
    let display_name = user
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user.login.clone());
    let (first_name, last_name) = split_name(&display_name);

    let mut profile = Profile::new();
    profile.insert("login".to_string(), json!(user.login));
    profile.insert("user_id".to_string(), json!(user.id.to_string()));
    if let Some(user_type) = &user.user_type {
        profile.insert("type".to_string(), json!(user_type));
    }

    let mut resource = Resource::new(
        ResourceId::bare(ResourceTypeTag::User, user.id),
        display_name,
        Some(org_id.clone()),
        ResourceTrait::User(UserTrait {
            login: user.login.clone(),
            first_name,
            last_name,
            emails,
            status: UserStatus::Enabled,
            mfa_enabled: user.two_factor_authentication,
            icon: user.avatar_url.clone().map(|id| AssetRef { id }),
            profile,
        }),
    );
    if let Some(url) = &user.html_url {
        resource = resource.with_annotation(Annotation::ExternalLink { url: url.clone() });
    }
    resource
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> ResourceTypeTag {
        ResourceTypeTag::User
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &PageToken) -> Result<Page<Resource>> {
        let parent = match parent {
            Some(parent) if parent.resource_type == ResourceTypeTag::Org => parent,
            Some(other) => {
                return Err(ConnectorError::invariant(format!(
                    "users cannot be listed under a {} resource",
                    other.resource_type
                )));
            }
            None => return Ok(Page::default()),
        };

        let org_name = self.cache.get_org_name(parent).await?;
        let (mut bag, page) = parse_page_token(&token.token, parent)?;

        let resp = self
            .client
            .list_org_members(&org_name, token.list_options(page))
            .await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let mut graphql_limit = None;
        let saml = self.has_saml(&org_name, &mut graphql_limit).await?;

        let mut items = Vec::with_capacity(resp.data.len());
        for summary in resp.data {
            let user = self.full_profile(&org_name, summary).await?;

            let identity = if saml {
                let resp = self.client.get_saml_identity(&org_name, &user.login).await?;
                if resp.rate_limit.is_some() {
                    graphql_limit = resp.rate_limit;
                }
                resp.data
            } else {
                None
            };

            let emails = user_emails(&user, identity.as_ref());
            items.push(user_resource(parent, &user, emails));
        }

        let rest_remaining = resp.rate_limit.as_ref().map(|r| r.remaining);
        let mut annotations = rate_limit_annotations(resp.rate_limit);
        if let Some(graphql) = graphql_limit
            && rest_remaining.is_none_or(|rest| graphql.remaining < rest)
        {
            annotations.push(Annotation::RateLimit(graphql));
        }

        Ok(Page {
            items,
            next_token,
            annotations,
        })
    }

    async fn entitlements(&self, _resource: &Resource, _token: &PageToken) -> Result<Page<Entitlement>> {
        Ok(Page::default())
    }

    async fn grants(&self, _resource: &Resource, _token: &PageToken) -> Result<Page<Grant>> {
        Ok(Page::default())
    }
}
