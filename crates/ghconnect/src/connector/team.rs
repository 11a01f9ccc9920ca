use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{Page, PageToken, ResourceSyncer, rate_limit_annotations, require_principal};
use crate::cache::OrgNameCache;
use crate::catalog::{
    Annotation, Entitlement, EntitlementPurpose, Grant, GroupTrait, Profile, Resource, ResourceId,
    ResourceTrait, ResourceTypeTag, parse_scoped_id,
};
use crate::error::{ConnectorError, Result};
use crate::github::{ApiResponse, GitHubApi, Team};
use crate::pagination::{page_cursor, parse_page_token};

const TEAM_ROLE_MEMBER: &str = "member";
const TEAM_ROLE_MAINTAINER: &str = "maintainer";
const TEAM_ROLES: [&str; 2] = [TEAM_ROLE_MEMBER, TEAM_ROLE_MAINTAINER];

/// Profile key holding the owning organization's numeric id.
pub(crate) const PROFILE_ORG_ID: &str = "orgID";

/// Teams, including nested teams, of an organization.
pub struct TeamSyncer {
    client: Arc<dyn GitHubApi>,
    cache: Arc<OrgNameCache>,
}

impl TeamSyncer {
    pub fn new(client: Arc<dyn GitHubApi>, cache: Arc<OrgNameCache>) -> Self {
        Self { client, cache }
    }

    fn team_resource(org_login: &str, org_id: i64, team: &Team) -> Resource {
        let parent = match &team.parent {
            Some(parent) => ResourceId::scoped(ResourceTypeTag::Team, org_login, parent.id),
            None => ResourceId::bare(ResourceTypeTag::Org, org_id),
        };

        let mut profile = Profile::new();
        profile.insert(PROFILE_ORG_ID.to_string(), json!(org_id));
        if let Some(count) = team.members_count {
            profile.insert("members_count".to_string(), json!(count));
        }
        if let Some(count) = team.repos_count {
            profile.insert("repos_count".to_string(), json!(count));
        }

        let mut resource = Resource::new(
            ResourceId::scoped(ResourceTypeTag::Team, org_login, team.id),
            team.name.clone(),
            Some(parent),
            ResourceTrait::Group(GroupTrait {
                member_count: team.members_count,
                repo_count: team.repos_count,
                profile,
            }),
        )
        .with_annotation(Annotation::V1Identifier {
            id: format!("team:{}", team.id),
        });
        if let Some(url) = &team.html_url {
            resource = resource.with_annotation(Annotation::ExternalLink { url: url.clone() });
        }
        resource
    }

    /// Organization login and id for listing the children of `parent`.
    async fn resolve_parent(&self, parent: &ResourceId) -> Result<(String, i64, Option<i64>)> {
        match parent.resource_type {
            ResourceTypeTag::Org => {
                let org_id = parent.upstream_id()?;
                let login = self.cache.get_org_name(parent).await?;
                Ok((login, org_id, None))
            }
            ResourceTypeTag::Team => {
                let (login, team_id) = parse_scoped_id(&parent.resource)?;
                let org_id = self.cache.get_org_id(&login).await?;
                Ok((login, org_id, Some(team_id)))
            }
            other => Err(ConnectorError::invariant(format!(
                "teams cannot be listed under a {other} resource"
            ))),
        }
    }
}

fn org_id_of(resource: &Resource) -> Result<i64> {
    resource.profile_i64(PROFILE_ORG_ID).ok_or_else(|| {
        ConnectorError::invariant(format!("team {} is missing its organization id", resource.id))
    })
}

fn team_id_of(resource: &Resource) -> Result<i64> {
    Ok(parse_scoped_id(&resource.id.resource)?.1)
}

fn check_role(slug: &str) -> Result<()> {
    if TEAM_ROLES.contains(&slug) {
        Ok(())
    } else {
        Err(ConnectorError::invariant(format!("unknown team entitlement {slug:?}")))
    }
}

#[async_trait]
impl ResourceSyncer for TeamSyncer {
    fn resource_type(&self) -> ResourceTypeTag {
        ResourceTypeTag::Team
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &PageToken) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::default());
        };

        let (org_login, org_id, parent_team) = self.resolve_parent(parent).await?;
        let (mut bag, page) = parse_page_token(&token.token, parent)?;

        let resp: ApiResponse<Vec<Team>> = match parent_team {
            Some(team_id) => {
                self.client
                    .list_child_teams(org_id, team_id, token.list_options(page))
                    .await?
            }
            None => self.client.list_teams(&org_login, token.list_options(page)).await?,
        };
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let mut items = Vec::with_capacity(resp.data.len());
        for team in &resp.data {
            let full = self.client.get_team_by_id(org_id, team.id).await?.data;
            items.push(Self::team_resource(&org_login, org_id, &full));
        }

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn entitlements(&self, resource: &Resource, _token: &PageToken) -> Result<Page<Entitlement>> {
        let items = TEAM_ROLES
            .into_iter()
            .map(|role| {
                Entitlement::new(resource, role, EntitlementPurpose::Assignment, &[ResourceTypeTag::User])
                    .with_display_name(format!("{} Team {}", resource.display_name, role))
                    .with_description(format!("Access to {} team in GitHub", resource.display_name))
            })
            .collect();
        Ok(Page::complete(items))
    }

    async fn grants(&self, resource: &Resource, token: &PageToken) -> Result<Page<Grant>> {
        let org_id = org_id_of(resource)?;
        let team_id = team_id_of(resource)?;
        let (mut bag, page) = parse_page_token(&token.token, &resource.id)?;

        let resp = self
            .client
            .list_team_members(org_id, team_id, token.list_options(page))
            .await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let mut items = Vec::with_capacity(resp.data.len());
        for user in &resp.data {
            let membership = match self.client.get_team_membership(org_id, team_id, &user.login).await {
                Ok(resp) => resp.data,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(team = %resource.id, user = %user.login, "Team membership disappeared, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            items.push(
                Grant::new(
                    resource,
                    &membership.role,
                    EntitlementPurpose::Assignment,
                    &[ResourceTypeTag::User],
                    ResourceId::bare(ResourceTypeTag::User, user.id),
                )
                .with_annotation(Annotation::V1Identifier {
                    id: format!("team-grant:{team_id}:{}:{}", user.id, membership.role),
                }),
            );
        }

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<Vec<Annotation>> {
        require_principal(&principal.id, ResourceTypeTag::User, "added to teams")?;
        check_role(&entitlement.slug)?;

        let team = &entitlement.resource;
        let org_id = org_id_of(team)?;
        let team_id = team_id_of(team)?;
        let user = self
            .client
            .get_user_by_id(principal.id.upstream_id()?)
            .await?
            .data;

        let resp = self
            .client
            .add_team_membership(org_id, team_id, &user.login, &entitlement.slug)
            .await?;
        tracing::info!(team = %team.id, user = %user.login, role = %entitlement.slug, "Added team membership");
        Ok(rate_limit_annotations(resp.rate_limit))
    }

    async fn revoke(&self, grant: &Grant) -> Result<Vec<Annotation>> {
        require_principal(&grant.principal, ResourceTypeTag::User, "removed from teams")?;

        let team = &grant.entitlement.resource;
        if team.parent_resource_id.is_none() {
            return Err(ConnectorError::invariant(format!(
                "team {} has no parent resource",
                team.id
            )));
        }
        let org_id = org_id_of(team)?;
        let team_id = team_id_of(team)?;
        let user = self
            .client
            .get_user_by_id(grant.principal.upstream_id()?)
            .await?
            .data;

        match self.client.get_team_membership(org_id, team_id, &user.login).await {
            Ok(resp) if resp.data.role == grant.entitlement.slug => {}
            Ok(_) => {
                tracing::debug!(team = %team.id, user = %user.login, "Team role differs from grant, nothing to revoke");
                return Ok(Vec::new());
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(team = %team.id, user = %user.login, "Not a team member, nothing to revoke");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let resp = self
            .client
            .remove_team_membership(org_id, team_id, &user.login)
            .await?;
        tracing::info!(team = %team.id, user = %user.login, "Removed team membership");
        Ok(rate_limit_annotations(resp.rate_limit))
    }
}
