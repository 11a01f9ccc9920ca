use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Page, PageToken, ResourceSyncer, rate_limit_annotations, require_principal};
use crate::cache::OrgNameCache;
use crate::catalog::{
    Annotation, Entitlement, EntitlementPurpose, Grant, Resource, ResourceId, ResourceTrait,
    ResourceTypeTag, entitlement_id,
};
use crate::error::{ConnectorError, Result};
use crate::github::{GitHubApi, Organization};
use crate::pagination::{page_cursor, parse_page_token};

pub(crate) const ORG_ROLE_ADMIN: &str = "admin";
pub(crate) const ORG_ROLE_MEMBER: &str = "member";

/// Invitation role for a plain member.
const INVITE_ROLE_MEMBER: &str = "direct_member";
/// Invitation role for an administrator.
const INVITE_ROLE_ADMIN: &str = "admin";

const MEMBERSHIP_PENDING: &str = "pending";
const MEMBERSHIP_ACTIVE: &str = "active";

const ORG_CHILDREN: [ResourceTypeTag; 4] = [
    ResourceTypeTag::User,
    ResourceTypeTag::Team,
    ResourceTypeTag::Repository,
    ResourceTypeTag::ApiToken,
];

/// Organizations the caller administers.
pub struct OrgSyncer {
    client: Arc<dyn GitHubApi>,
    cache: Arc<OrgNameCache>,
    allowed: BTreeSet<String>,
}

impl OrgSyncer {
    pub fn new(client: Arc<dyn GitHubApi>, cache: Arc<OrgNameCache>, allowed: BTreeSet<String>) -> Self {
        Self {
            client,
            cache,
            allowed,
        }
    }

    fn org_resource(org: &Organization) -> Resource {
        Resource::new(
            ResourceId::bare(ResourceTypeTag::Org, org.id),
            org.login.clone(),
            None,
            ResourceTrait::None,
        )
        .with_annotation(Annotation::ExternalLink { url: org.web_url() })
        .with_annotation(Annotation::V1Identifier {
            id: format!("org:{}", org.id),
        })
        .with_annotations(
            ORG_CHILDREN
                .into_iter()
                .map(|resource_type| Annotation::ChildResourceType { resource_type }),
        )
    }

    async fn is_admin(&self, login: &str) -> Result<bool> {
        match self.client.get_own_org_membership(login).await {
            Ok(resp) => Ok(resp.data.role.eq_ignore_ascii_case(ORG_ROLE_ADMIN)),
            Err(e) if e.is_forbidden() => {
                tracing::warn!(org = %login, "Insufficient access to read own membership, skipping organization");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn org_grant(resource: &Resource, role: &str, user_id: i64, org_id: &str) -> Grant {
    Grant::new(
        resource,
        role,
        EntitlementPurpose::Assignment,
        &[ResourceTypeTag::User],
        ResourceId::bare(ResourceTypeTag::User, user_id),
    )
    .with_annotation(Annotation::V1Identifier {
        id: format!("org-grant:{org_id}:{user_id}:{role}"),
    })
}

#[async_trait]
impl ResourceSyncer for OrgSyncer {
    fn resource_type(&self) -> ResourceTypeTag {
        ResourceTypeTag::Org
    }

    async fn list(&self, _parent: Option<&ResourceId>, token: &PageToken) -> Result<Page<Resource>> {
        let root = ResourceId::new(ResourceTypeTag::Org, "");
        let (mut bag, page) = parse_page_token(&token.token, &root)?;

        let resp = self.client.list_orgs(token.list_options(page)).await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let mut items = Vec::new();
        for org in &resp.data {
            if !self.allowed.is_empty() && !self.allowed.contains(&org.login) {
                tracing::debug!(org = %org.login, "Organization not in configured list, skipping");
                continue;
            }
            if !self.is_admin(&org.login).await? {
                tracing::debug!(org = %org.login, "Not an organization admin, skipping");
                continue;
            }
            self.cache.prime(org.id, &org.login).await;
            items.push(Self::org_resource(org));
        }

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn entitlements(&self, resource: &Resource, _token: &PageToken) -> Result<Page<Entitlement>> {
        let items = [ORG_ROLE_MEMBER, ORG_ROLE_ADMIN]
            .into_iter()
            .map(|role| {
                Entitlement::new(resource, role, EntitlementPurpose::Assignment, &[ResourceTypeTag::User])
                    .with_display_name(format!("{} Org {}", resource.display_name, role))
                    .with_description(format!("Access to {} org in GitHub", resource.display_name))
            })
            .collect();
        Ok(Page::complete(items))
    }

    async fn grants(&self, resource: &Resource, token: &PageToken) -> Result<Page<Grant>> {
        let org_name = self.cache.get_org_name(&resource.id).await?;
        let (mut bag, page) = parse_page_token(&token.token, &resource.id)?;

        let resp = self
            .client
            .list_org_members(&org_name, token.list_options(page))
            .await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let mut items = Vec::new();
        for user in &resp.data {
            let membership = match self.client.get_org_membership(&org_name, &user.login).await {
                Ok(resp) => resp.data,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(org = %org_name, user = %user.login, "Membership disappeared, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if membership.state == MEMBERSHIP_PENDING {
                continue;
            }

            match membership.role.as_str() {
                ORG_ROLE_ADMIN => {
                    items.push(org_grant(resource, ORG_ROLE_ADMIN, user.id, &resource.id.resource));
                    items.push(org_grant(resource, ORG_ROLE_MEMBER, user.id, &resource.id.resource));
                }
                ORG_ROLE_MEMBER => {
                    items.push(org_grant(resource, ORG_ROLE_MEMBER, user.id, &resource.id.resource));
                }
                other => {
                    tracing::warn!(org = %org_name, user = %user.login, role = %other, "Unknown org role, skipping");
                }
            }
        }

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<Vec<Annotation>> {
        require_principal(&principal.id, ResourceTypeTag::User, "granted org membership")?;

        let resource_id = &entitlement.resource.id;
        let (role, invite_role) = if entitlement.id == entitlement_id(resource_id, ORG_ROLE_ADMIN) {
            (ORG_ROLE_ADMIN, INVITE_ROLE_ADMIN)
        } else if entitlement.id == entitlement_id(resource_id, ORG_ROLE_MEMBER) {
            (ORG_ROLE_MEMBER, INVITE_ROLE_MEMBER)
        } else {
            return Err(ConnectorError::invariant(format!(
                "unknown org entitlement {}",
                entitlement.id
            )));
        };

        let org_name = self.cache.get_org_name(resource_id).await?;
        let user = self
            .client
            .get_user_by_id(principal.id.upstream_id()?)
            .await?
            .data;

        let is_member = self.client.is_org_member(&org_name, &user.login).await?.data;
        if !is_member {
            let resp = self
                .client
                .create_org_invitation(&org_name, user.id, invite_role)
                .await?;
            tracing::info!(org = %org_name, user = %user.login, role = %invite_role, "Invited user to organization");
            return Ok(rate_limit_annotations(resp.rate_limit));
        }

        let membership = self
            .client
            .get_org_membership(&org_name, &user.login)
            .await?
            .data;
        if membership.role == ORG_ROLE_ADMIN
            || (membership.role == ORG_ROLE_MEMBER && role == ORG_ROLE_MEMBER)
        {
            tracing::debug!(org = %org_name, user = %user.login, role = %membership.role, "Membership already satisfies grant");
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .edit_org_membership(&org_name, &user.login, ORG_ROLE_ADMIN)
            .await?;
        tracing::info!(org = %org_name, user = %user.login, "Promoted user to organization admin");
        Ok(rate_limit_annotations(resp.rate_limit))
    }

    async fn revoke(&self, grant: &Grant) -> Result<Vec<Annotation>> {
        require_principal(&grant.principal, ResourceTypeTag::User, "revoked org membership")?;

        let resource = &grant.entitlement.resource;
        if grant.entitlement.id != entitlement_id(&resource.id, ORG_ROLE_ADMIN) {
            return Err(ConnectorError::invariant(format!(
                "only the admin entitlement can be revoked, got {}",
                grant.entitlement.id
            )));
        }

        let org_name = self.cache.get_org_name(&resource.id).await?;
        let user = self
            .client
            .get_user_by_id(grant.principal.upstream_id()?)
            .await?
            .data;

        let membership = self
            .client
            .get_org_membership(&org_name, &user.login)
            .await?
            .data;
        if membership.role != ORG_ROLE_ADMIN {
            tracing::debug!(org = %org_name, user = %user.login, "User is not an admin, nothing to revoke");
            return Ok(Vec::new());
        }
        if membership.state != MEMBERSHIP_ACTIVE {
            return Err(ConnectorError::invariant(format!(
                "membership of {} in {} is {}, not active",
                user.login, org_name, membership.state
            )));
        }

        let resp = self
            .client
            .edit_org_membership(&org_name, &user.login, ORG_ROLE_MEMBER)
            .await?;
        tracing::info!(org = %org_name, user = %user.login, "Demoted organization admin to member");
        Ok(rate_limit_annotations(resp.rate_limit))
    }
}
