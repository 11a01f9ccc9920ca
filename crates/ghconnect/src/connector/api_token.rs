use std::sync::Arc;

use async_trait::async_trait;

use super::{Page, PageToken, ResourceSyncer, rate_limit_annotations};
use crate::cache::OrgNameCache;
use crate::catalog::{
    Entitlement, Grant, Resource, ResourceId, ResourceTrait, ResourceTypeTag, SecretTrait,
};
use crate::error::{ConnectorError, Result};
use crate::github::{GitHubApi, PersonalAccessToken};
use crate::pagination::{page_cursor, parse_page_token};

/// Fine-grained personal access tokens with access to an organization.
/// Inventory only: nothing is grantable.
pub struct ApiTokenSyncer {
    client: Arc<dyn GitHubApi>,
    cache: Arc<OrgNameCache>,
}

impl ApiTokenSyncer {
    pub fn new(client: Arc<dyn GitHubApi>, cache: Arc<OrgNameCache>) -> Self {
        Self { client, cache }
    }
}

fn token_resource(org_login: &str, org_id: &ResourceId, pat: &PersonalAccessToken) -> Resource {
    let display_name = pat
        .token_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{}'s token {}", pat.owner.login, pat.id));

    Resource::new(
        ResourceId::scoped(ResourceTypeTag::ApiToken, org_login, pat.id),
        display_name,
        Some(org_id.clone()),
        ResourceTrait::Secret(SecretTrait {
            created_at: pat.access_granted_at,
            last_used_at: pat.token_last_used_at,
            expires_at: pat.token_expires_at,
            created_by: Some(ResourceId::bare(ResourceTypeTag::User, pat.owner.id)),
        }),
    )
}

#[async_trait]
impl ResourceSyncer for ApiTokenSyncer {
    fn resource_type(&self) -> ResourceTypeTag {
        ResourceTypeTag::ApiToken
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &PageToken) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::default());
        };
        if parent.resource_type != ResourceTypeTag::Org {
            return Err(ConnectorError::invariant(format!(
                "api tokens cannot be listed under a {} resource",
                parent.resource_type
            )));
        }

        let org_name = self.cache.get_org_name(parent).await?;
        let (mut bag, page) = parse_page_token(&token.token, parent)?;

        let resp = self
            .client
            .list_fine_grained_pats(&org_name, token.list_options(page))
            .await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let items = resp
            .data
            .iter()
            .map(|pat| token_resource(&org_name, parent, pat))
            .collect();

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn entitlements(&self, _resource: &Resource, _token: &PageToken) -> Result<Page<Entitlement>> {
        Ok(Page::default())
    }

    async fn grants(&self, _resource: &Resource, _token: &PageToken) -> Result<Page<Grant>> {
        Ok(Page::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::testing::{FakeGitHub, simple_user};

    fn pat(id: i64, name: Option<&str>) -> PersonalAccessToken {
        PersonalAccessToken {
            id,
            owner: simple_user(56, "octocat"),
            token_name: name.map(str::to_string),
            token_expired: Some(false),
            access_granted_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single(),
            token_last_used_at: None,
            token_expires_at: None,
        }
    }

    #[tokio::test]
    async fn lists_tokens_as_secrets_scoped_to_the_organization() {
        let fake = Arc::new(FakeGitHub::seeded());
        fake.add_pat("acme", pat(90, Some("deploy")));
        fake.add_pat("acme", pat(91, None));
        let syncer = ApiTokenSyncer::new(fake.clone(), Arc::new(OrgNameCache::new(fake.clone())));
        let acme = ResourceId::bare(ResourceTypeTag::Org, 12);

        let page = syncer.list(Some(&acme), &PageToken::default()).await.unwrap();
        assert_eq!(page.items.len(), 2);

        let deploy = &page.items[0];
        assert_eq!(deploy.id.to_string(), "api-token:acme:90");
        assert_eq!(deploy.display_name, "deploy");
        assert_eq!(deploy.parent_resource_id, Some(acme));
        match &deploy.traits {
            ResourceTrait::Secret(secret) => {
                assert!(secret.created_at.is_some());
                assert_eq!(secret.last_used_at, None);
                assert_eq!(secret.expires_at, None);
                assert_eq!(
                    secret.created_by,
                    Some(ResourceId::bare(ResourceTypeTag::User, 56))
                );
            }
            other => panic!("expected a secret trait, got {other:?}"),
        }

        assert_eq!(page.items[1].display_name, "octocat's token 91");
    }

    #[test]
    fn absent_timestamps_are_omitted_when_serialized() {
        let resource = token_resource(
            "acme",
            &ResourceId::bare(ResourceTypeTag::Org, 12),
            &PersonalAccessToken {
                access_granted_at: None,
                ..pat(92, Some("ci"))
            },
        );
        let json = serde_json::to_value(&resource).unwrap();
        let secret = &json["trait"];
        assert_eq!(secret["kind"], "secret");
        assert!(secret.get("created_at").is_none());
        assert!(secret.get("expires_at").is_none());
    }

    #[tokio::test]
    async fn tokens_are_not_grantable() {
        let fake = Arc::new(FakeGitHub::seeded());
        let syncer = ApiTokenSyncer::new(fake.clone(), Arc::new(OrgNameCache::new(fake)));
        let resource = token_resource(
            "acme",
            &ResourceId::bare(ResourceTypeTag::Org, 12),
            &pat(90, Some("deploy")),
        );

        assert!(syncer.entitlements(&resource, &PageToken::default()).await.unwrap().items.is_empty());
        assert!(syncer.grants(&resource, &PageToken::default()).await.unwrap().items.is_empty());
        assert!(syncer.revoke(&Grant::new(
            &resource,
            "x",
            crate::catalog::EntitlementPurpose::Assignment,
            &[ResourceTypeTag::User],
            ResourceId::bare(ResourceTypeTag::User, 56),
        ))
        .await
        .is_err());
    }
}
