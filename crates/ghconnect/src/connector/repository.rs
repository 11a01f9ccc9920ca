use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Page, PageToken, ResourceSyncer, rate_limit_annotations};
use crate::cache::OrgNameCache;
use crate::catalog::{
    Annotation, Entitlement, EntitlementPurpose, Grant, Resource, ResourceId, ResourceTrait,
    ResourceTypeTag, parse_scoped_id,
};
use crate::error::{ConnectorError, Result};
use crate::github::{GitHubApi, Repository};
use crate::pagination::{PageState, page_cursor, parse_page_token};

/// Permission levels on a repository, weakest first.
pub const REPOSITORY_PERMISSIONS: [&str; 5] = ["pull", "triage", "push", "maintain", "admin"];

const GRANTABLE_TO: [ResourceTypeTag; 2] = [ResourceTypeTag::User, ResourceTypeTag::Team];

/// Repositories of an organization and the users and teams with access.
pub struct RepositorySyncer {
    client: Arc<dyn GitHubApi>,
    cache: Arc<OrgNameCache>,
}

impl RepositorySyncer {
    pub fn new(client: Arc<dyn GitHubApi>, cache: Arc<OrgNameCache>) -> Self {
        Self { client, cache }
    }

    fn repository_resource(org_id: i64, repo: &Repository) -> Resource {
        let mut resource = Resource::new(
            ResourceId::bare(ResourceTypeTag::Repository, repo.id),
            repo.name.clone(),
            Some(ResourceId::bare(ResourceTypeTag::Org, org_id)),
            ResourceTrait::None,
        )
        .with_annotation(Annotation::V1Identifier {
            id: format!("repo:{}", repo.id),
        });
        if let Some(url) = &repo.html_url {
            resource = resource.with_annotation(Annotation::ExternalLink { url: url.clone() });
        }
        resource
    }

    async fn org_name(&self, resource: &Resource) -> Result<String> {
        let parent = resource.parent_resource_id.as_ref().ok_or_else(|| {
            ConnectorError::invariant(format!("repository {} has no parent organization", resource.id))
        })?;
        self.cache.get_org_name(parent).await
    }

    /// Team slug addressed by a scoped team principal, looked up under the
    /// repository's owning organization.
    async fn team_slug(&self, repo: &Repository, principal: &ResourceId) -> Result<String> {
        let (_, team_id) = parse_scoped_id(&principal.resource)?;
        let team = self.client.get_team_by_id(repo.owner.id, team_id).await?.data;
        Ok(team.slug)
    }
}

/// One grant per permission the principal holds.
fn permission_grants(
    resource: &Resource,
    principal: ResourceId,
    principal_id: i64,
    permissions: &BTreeMap<String, bool>,
) -> impl Iterator<Item = Grant> {
    permissions
        .iter()
        .filter(|(_, granted)| **granted)
        .map(move |(permission, _)| {
            Grant::new(
                resource,
                permission,
                EntitlementPurpose::Permission,
                &GRANTABLE_TO,
                principal.clone(),
            )
            .with_annotation(Annotation::V1Identifier {
                id: format!("repo-grant:{}:{principal_id}:{permission}", resource.id.resource),
            })
        })
}

#[async_trait]
impl ResourceSyncer for RepositorySyncer {
    fn resource_type(&self) -> ResourceTypeTag {
        ResourceTypeTag::Repository
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &PageToken) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::default());
        };
        if parent.resource_type != ResourceTypeTag::Org {
            return Err(ConnectorError::invariant(format!(
                "repositories cannot be listed under a {} resource",
                parent.resource_type
            )));
        }

        let org_id = parent.upstream_id()?;
        let org_name = self.cache.get_org_name(parent).await?;
        let (mut bag, page) = parse_page_token(&token.token, parent)?;

        let resp = self
            .client
            .list_org_repos(&org_name, token.list_options(page))
            .await?;
        let next_token = bag.next_token(&page_cursor(resp.next_page))?;

        let items = resp
            .data
            .iter()
            .map(|repo| Self::repository_resource(org_id, repo))
            .collect();

        Ok(Page {
            items,
            next_token,
            annotations: rate_limit_annotations(resp.rate_limit),
        })
    }

    async fn entitlements(&self, resource: &Resource, _token: &PageToken) -> Result<Page<Entitlement>> {
        let items = REPOSITORY_PERMISSIONS
            .into_iter()
            .map(|permission| {
                Entitlement::new(resource, permission, EntitlementPurpose::Permission, &GRANTABLE_TO)
                    .with_display_name(format!("{} Repo {}", resource.display_name, permission))
                    .with_description(format!(
                        "Access to {} repository in GitHub",
                        resource.display_name
                    ))
            })
            .collect();
        Ok(Page::complete(items))
    }

    /// Collaborators first, then teams. The initial call only lays out the
    /// two phases on the cursor stack and returns no grants.
    async fn grants(&self, resource: &Resource, token: &PageToken) -> Result<Page<Grant>> {
        let org_name = self.org_name(resource).await?;
        let repo_name = resource.display_name.as_str();
        let (mut bag, page) = parse_page_token(&token.token, &resource.id)?;

        let Some(phase) = bag.current().map(|state| state.resource_type) else {
            return Ok(Page::default());
        };

        match phase {
            ResourceTypeTag::Repository => {
                bag.pop();
                bag.push(PageState::new(ResourceTypeTag::Team, resource.id.resource.clone()));
                bag.push(PageState::new(ResourceTypeTag::User, resource.id.resource.clone()));
                Ok(Page {
                    items: Vec::new(),
                    next_token: bag.marshal()?,
                    annotations: Vec::new(),
                })
            }
            ResourceTypeTag::User => {
                let resp = self
                    .client
                    .list_collaborators(&org_name, repo_name, token.list_options(page))
                    .await?;
                let next_token = bag.next_token(&page_cursor(resp.next_page))?;

                let items = resp
                    .data
                    .iter()
                    .flat_map(|user| {
                        permission_grants(
                            resource,
                            ResourceId::bare(ResourceTypeTag::User, user.id),
                            user.id,
                            &user.permissions,
                        )
                    })
                    .collect();

                Ok(Page {
                    items,
                    next_token,
                    annotations: rate_limit_annotations(resp.rate_limit),
                })
            }
            ResourceTypeTag::Team => {
                let resp = self
                    .client
                    .list_repo_teams(&org_name, repo_name, token.list_options(page))
                    .await?;
                let next_token = bag.next_token(&page_cursor(resp.next_page))?;

                let items = resp
                    .data
                    .iter()
                    .flat_map(|team| {
                        permission_grants(
                            resource,
                            ResourceId::scoped(ResourceTypeTag::Team, &org_name, team.id),
                            team.id,
                            &team.permissions,
                        )
                    })
                    .collect();

                Ok(Page {
                    items,
                    next_token,
                    annotations: rate_limit_annotations(resp.rate_limit),
                })
            }
            other => Err(ConnectorError::invalid_page_token(format!(
                "unexpected {other} frame in repository grants"
            ))),
        }
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<Vec<Annotation>> {
        let repo = self
            .client
            .get_repo_by_id(entitlement.resource.id.upstream_id()?)
            .await?
            .data;
        let owner = repo.owner.login.as_str();
        let permission = entitlement.slug.as_str();

        let resp = match principal.id.resource_type {
            ResourceTypeTag::User => {
                let user = self
                    .client
                    .get_user_by_id(principal.id.upstream_id()?)
                    .await?
                    .data;
                let resp = self
                    .client
                    .add_collaborator(owner, &repo.name, &user.login, permission)
                    .await?;
                tracing::info!(repo = %repo.name, user = %user.login, permission, "Added repository collaborator");
                resp
            }
            ResourceTypeTag::Team => {
                let slug = self.team_slug(&repo, &principal.id).await?;
                let resp = self
                    .client
                    .add_team_repo(owner, &slug, owner, &repo.name, permission)
                    .await?;
                tracing::info!(repo = %repo.name, team = %slug, permission, "Added team to repository");
                resp
            }
            other => {
                return Err(ConnectorError::invariant(format!(
                    "repository access can only be granted to users or teams, got {other}"
                )));
            }
        };
        Ok(rate_limit_annotations(resp.rate_limit))
    }

    /// Removes the principal's access to the repository entirely, not just
    /// the revoked permission level.
    async fn revoke(&self, grant: &Grant) -> Result<Vec<Annotation>> {
        let repo = self
            .client
            .get_repo_by_id(grant.entitlement.resource.id.upstream_id()?)
            .await?
            .data;
        let owner = repo.owner.login.as_str();

        let resp = match grant.principal.resource_type {
            ResourceTypeTag::User => {
                let user = self
                    .client
                    .get_user_by_id(grant.principal.upstream_id()?)
                    .await?
                    .data;
                if !self.client.is_collaborator(owner, &repo.name, &user.login).await?.data {
                    tracing::debug!(repo = %repo.name, user = %user.login, "Not a collaborator, nothing to revoke");
                    return Ok(Vec::new());
                }
                let resp = self
                    .client
                    .remove_collaborator(owner, &repo.name, &user.login)
                    .await?;
                tracing::info!(repo = %repo.name, user = %user.login, "Removed repository collaborator");
                resp
            }
            ResourceTypeTag::Team => {
                let slug = self.team_slug(&repo, &grant.principal).await?;
                if !self.client.is_team_repo(owner, &slug, owner, &repo.name).await?.data {
                    tracing::debug!(repo = %repo.name, team = %slug, "Team has no access, nothing to revoke");
                    return Ok(Vec::new());
                }
                let resp = self
                    .client
                    .remove_team_repo(owner, &slug, owner, &repo.name)
                    .await?;
                tracing::info!(repo = %repo.name, team = %slug, "Removed team from repository");
                resp
            }
            other => {
                return Err(ConnectorError::invariant(format!(
                    "repository access can only be revoked from users or teams, got {other}"
                )));
            }
        };
        Ok(rate_limit_annotations(resp.rate_limit))
    }
}
