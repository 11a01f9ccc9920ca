//! In-memory GitHub used by unit tests.
//!
//! State lives behind a mutex; every trait call is counted by name and every
//! upstream mutation bumps [`FakeGitHub::mutations`], so tests can assert
//! that no-op paths really issue no writes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::RateLimitDescription;
use crate::github::{
    ApiResponse, Asset, Collaborator, GitHubApi, GitHubError, ListOptions, Membership,
    Organization, PersonalAccessToken, Repository, SamlIdentity, SimpleUser, Team, TeamMembership,
    TeamParent, User,
};

type Result<T> = std::result::Result<T, GitHubError>;

#[derive(Default)]
struct FakeState {
    orgs: Vec<Organization>,
    own_memberships: HashMap<String, Membership>,
    forbidden_orgs: HashSet<String>,
    members: Vec<(String, SimpleUser)>,
    memberships: HashMap<(String, String), Membership>,
    invitations: Vec<(String, i64, String)>,
    teams: Vec<(i64, Team)>,
    team_members: Vec<(i64, SimpleUser, String)>,
    repos: Vec<Repository>,
    collaborators: Vec<(i64, Collaborator)>,
    repo_teams: Vec<(i64, Team)>,
    users: BTreeMap<i64, User>,
    hidden_users: HashSet<i64>,
    pats: Vec<(String, PersonalAccessToken)>,
    saml: HashMap<String, HashMap<String, SamlIdentity>>,
    rate_limit: Option<RateLimitDescription>,
    graphql_rate_limit: Option<RateLimitDescription>,
    unauthorized: bool,
    calls: HashMap<&'static str, usize>,
    mutations: usize,
}

pub(crate) struct FakeGitHub {
    state: Mutex<FakeState>,
}

fn not_found() -> GitHubError {
    GitHubError::api(404, "Not Found")
}

pub(crate) fn simple_user(id: i64, login: &str) -> SimpleUser {
    SimpleUser {
        id,
        login: login.to_string(),
        avatar_url: Some(format!("https://avatars.githubusercontent.com/u/{id}?v=4")),
        html_url: Some(format!("https://github.com/{login}")),
        user_type: Some("User".to_string()),
    }
}

pub(crate) fn organization(id: i64, login: &str) -> Organization {
    Organization {
        id,
        login: login.to_string(),
        name: None,
        description: None,
        html_url: Some(format!("https://github.com/{login}")),
        avatar_url: None,
    }
}

pub(crate) fn team(id: i64, slug: &str, parent: Option<i64>) -> Team {
    Team {
        id,
        name: slug.to_string(),
        slug: slug.to_string(),
        description: None,
        html_url: Some(format!("https://github.com/orgs/acme/teams/{slug}")),
        members_count: None,
        repos_count: None,
        parent: parent.map(|id| TeamParent {
            id,
            slug: None,
            name: None,
        }),
        organization: None,
        permissions: BTreeMap::new(),
    }
}

pub(crate) fn permissions(granted: &[&str]) -> BTreeMap<String, bool> {
    granted.iter().map(|p| ((*p).to_string(), true)).collect()
}

fn membership(role: &str, state: &str) -> Membership {
    Membership {
        state: state.to_string(),
        role: role.to_string(),
        organization: None,
        user: None,
    }
}

fn page<T: Clone>(items: &[T], opts: ListOptions) -> ApiResponse<Vec<T>> {
    let per_page = opts.per_page as usize;
    let start = (opts.page as usize - 1) * per_page;
    let data: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
    let next_page = (start + per_page < items.len()).then_some(opts.page + 1);
    ApiResponse::new(data).with_next_page(next_page)
}

impl FakeGitHub {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Organization `acme` (12) administered by the caller; repository
    /// `widgets` (34) where user `octocat` (56) holds `permission0` and
    /// `pull`; team `core` (78) with `octocat` as its only member.
    pub(crate) fn seeded() -> Self {
        let fake = Self::new();
        fake.add_org(organization(12, "acme"), "admin");
        fake.add_user(User {
            name: Some("Mona Octocat".to_string()),
            email: Some("mona@example.com".to_string()),
            two_factor_authentication: Some(true),
            ..User::from(simple_user(56, "octocat"))
        });
        fake.add_member("acme", 56, "member", "active");
        fake.add_repo(34, "widgets", "acme", 12);
        fake.add_collaborator(34, 56, &["permission0", "pull"]);
        fake.add_team(12, team(78, "core", None));
        fake.add_team_member(78, 56, "member");
        fake.add_repo_team(34, 78, &["pull", "triage"]);
        fake
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn record(&self, name: &'static str) -> Result<()> {
        self.with_state(|s| {
            *s.calls.entry(name).or_default() += 1;
            if s.unauthorized {
                Err(GitHubError::api(401, "Bad credentials"))
            } else {
                Ok(())
            }
        })
    }

    fn mutate(&self, name: &'static str) -> Result<()> {
        self.record(name)?;
        self.with_state(|s| s.mutations += 1);
        Ok(())
    }

    fn respond<T>(&self, data: T) -> ApiResponse<T> {
        let rate_limit = self.with_state(|s| s.rate_limit.clone());
        ApiResponse::new(data).with_rate_limit(rate_limit)
    }

    fn respond_page<T: Clone>(&self, items: &[T], opts: ListOptions) -> ApiResponse<Vec<T>> {
        let rate_limit = self.with_state(|s| s.rate_limit.clone());
        page(items, opts).with_rate_limit(rate_limit)
    }

    // Seeding

    pub(crate) fn add_org(&self, org: Organization, own_role: &str) {
        self.with_state(|s| {
            s.own_memberships
                .insert(org.login.clone(), membership(own_role, "active"));
            s.orgs.push(org);
        });
    }

    pub(crate) fn forbid_org(&self, login: &str) {
        self.with_state(|s| {
            s.forbidden_orgs.insert(login.to_string());
        });
    }

    pub(crate) fn add_user(&self, user: User) {
        self.with_state(|s| {
            s.users.insert(user.id, user);
        });
    }

    fn user(&self, id: i64) -> User {
        self.with_state(|s| s.users.get(&id).cloned())
            .unwrap_or_else(|| User::from(simple_user(id, &format!("user{id}"))))
    }

    fn summary(user: &User) -> SimpleUser {
        SimpleUser {
            id: user.id,
            login: user.login.clone(),
            avatar_url: user.avatar_url.clone(),
            html_url: user.html_url.clone(),
            user_type: user.user_type.clone(),
        }
    }

    /// Add `user_id` to `org` with the given membership role and state.
    pub(crate) fn add_member(&self, org: &str, user_id: i64, role: &str, state: &str) {
        let user = self.user(user_id);
        self.with_state(|s| {
            s.users.entry(user.id).or_insert_with(|| user.clone());
            s.members.push((org.to_string(), Self::summary(&user)));
            s.memberships.insert(
                (org.to_string(), user.login.clone()),
                membership(role, state),
            );
        });
    }

    pub(crate) fn add_repo(&self, id: i64, name: &str, owner: &str, owner_id: i64) {
        self.with_state(|s| {
            s.repos.push(Repository {
                id,
                name: name.to_string(),
                full_name: Some(format!("{owner}/{name}")),
                html_url: Some(format!("https://github.com/{owner}/{name}")),
                description: None,
                owner: SimpleUser {
                    user_type: Some("Organization".to_string()),
                    ..simple_user(owner_id, owner)
                },
            });
        });
    }

    pub(crate) fn add_collaborator(&self, repo_id: i64, user_id: i64, granted: &[&str]) {
        let user = self.user(user_id);
        self.with_state(|s| {
            s.users.entry(user.id).or_insert_with(|| user.clone());
            s.collaborators.push((
                repo_id,
                Collaborator {
                    id: user.id,
                    login: user.login.clone(),
                    avatar_url: user.avatar_url.clone(),
                    html_url: user.html_url.clone(),
                    permissions: permissions(granted),
                },
            ));
        });
    }

    pub(crate) fn add_team(&self, org_id: i64, team: Team) {
        self.with_state(|s| s.teams.push((org_id, team)));
    }

    pub(crate) fn add_team_member(&self, team_id: i64, user_id: i64, role: &str) {
        let user = self.user(user_id);
        self.with_state(|s| {
            s.users.entry(user.id).or_insert_with(|| user.clone());
            s.team_members
                .push((team_id, Self::summary(&user), role.to_string()));
        });
    }

    pub(crate) fn add_repo_team(&self, repo_id: i64, team_id: i64, granted: &[&str]) {
        self.with_state(|s| {
            if let Some((_, team)) = s.teams.iter().find(|(_, t)| t.id == team_id) {
                let mut team = team.clone();
                team.permissions = permissions(granted);
                s.repo_teams.push((repo_id, team));
            }
        });
    }

    pub(crate) fn hide_user_profile(&self, user_id: i64) {
        self.with_state(|s| {
            s.hidden_users.insert(user_id);
        });
    }

    pub(crate) fn add_pat(&self, org: &str, pat: PersonalAccessToken) {
        self.with_state(|s| s.pats.push((org.to_string(), pat)));
    }

    /// Enable SAML for `org` with the given per-login identities.
    pub(crate) fn set_saml(&self, org: &str, identities: &[(&str, SamlIdentity)]) {
        self.with_state(|s| {
            s.saml.insert(
                org.to_string(),
                identities
                    .iter()
                    .map(|(login, id)| ((*login).to_string(), id.clone()))
                    .collect(),
            );
        });
    }

    pub(crate) fn set_rate_limit(&self, rate_limit: RateLimitDescription) {
        self.with_state(|s| s.rate_limit = Some(rate_limit));
    }

    pub(crate) fn set_graphql_rate_limit(&self, rate_limit: RateLimitDescription) {
        self.with_state(|s| s.graphql_rate_limit = Some(rate_limit));
    }

    pub(crate) fn reject_credentials(&self) {
        self.with_state(|s| s.unauthorized = true);
    }

    // Inspection

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.with_state(|s| s.calls.get(name).copied().unwrap_or(0))
    }

    pub(crate) fn mutations(&self) -> usize {
        self.with_state(|s| s.mutations)
    }

    pub(crate) fn org_role(&self, org: &str, login: &str) -> Option<String> {
        self.with_state(|s| {
            s.memberships
                .get(&(org.to_string(), login.to_string()))
                .map(|m| m.role.clone())
        })
    }

    pub(crate) fn invitations(&self) -> Vec<(String, i64, String)> {
        self.with_state(|s| s.invitations.clone())
    }

    pub(crate) fn team_role(&self, team_id: i64, login: &str) -> Option<String> {
        self.with_state(|s| {
            s.team_members
                .iter()
                .find(|(t, u, _)| *t == team_id && u.login == login)
                .map(|(_, _, role)| role.clone())
        })
    }

    pub(crate) fn collaborator_permissions(
        &self,
        repo_id: i64,
        login: &str,
    ) -> Option<BTreeMap<String, bool>> {
        self.with_state(|s| {
            s.collaborators
                .iter()
                .find(|(r, c)| *r == repo_id && c.login == login)
                .map(|(_, c)| c.permissions.clone())
        })
    }

    pub(crate) fn repo_team_permissions(
        &self,
        repo_id: i64,
        team_id: i64,
    ) -> Option<BTreeMap<String, bool>> {
        self.with_state(|s| {
            s.repo_teams
                .iter()
                .find(|(r, t)| *r == repo_id && t.id == team_id)
                .map(|(_, t)| t.permissions.clone())
        })
    }

    fn repo_id(&self, owner: &str, name: &str) -> Result<i64> {
        self.with_state(|s| {
            s.repos
                .iter()
                .find(|r| r.owner.login == owner && r.name == name)
                .map(|r| r.id)
        })
        .ok_or_else(not_found)
    }

    fn org_id(&self, login: &str) -> Result<i64> {
        self.with_state(|s| s.orgs.iter().find(|o| o.login == login).map(|o| o.id))
            .ok_or_else(not_found)
    }

    fn user_by_login(&self, login: &str) -> Result<User> {
        self.with_state(|s| s.users.values().find(|u| u.login == login).cloned())
            .ok_or_else(not_found)
    }

    fn team_by_slug(&self, org: &str, slug: &str) -> Result<Team> {
        let org_id = self.org_id(org)?;
        self.with_state(|s| {
            s.teams
                .iter()
                .find(|(o, t)| *o == org_id && t.slug == slug)
                .map(|(_, t)| t.clone())
        })
        .ok_or_else(not_found)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_orgs(&self, opts: ListOptions) -> Result<ApiResponse<Vec<Organization>>> {
        self.record("list_orgs")?;
        let orgs = self.with_state(|s| s.orgs.clone());
        Ok(self.respond_page(&orgs, opts))
    }

    async fn get_org(&self, login: &str) -> Result<ApiResponse<Organization>> {
        self.record("get_org")?;
        self.with_state(|s| s.orgs.iter().find(|o| o.login == login).cloned())
            .map(|o| self.respond(o))
            .ok_or_else(not_found)
    }

    async fn get_org_by_id(&self, id: i64) -> Result<ApiResponse<Organization>> {
        self.record("get_org_by_id")?;
        self.with_state(|s| s.orgs.iter().find(|o| o.id == id).cloned())
            .map(|o| self.respond(o))
            .ok_or_else(not_found)
    }

    async fn get_own_org_membership(&self, org: &str) -> Result<ApiResponse<Membership>> {
        self.record("get_own_org_membership")?;
        if self.with_state(|s| s.forbidden_orgs.contains(org)) {
            return Err(GitHubError::api(403, "Resource not accessible by integration"));
        }
        self.with_state(|s| s.own_memberships.get(org).cloned())
            .map(|m| self.respond(m))
            .ok_or_else(not_found)
    }

    async fn get_org_membership(&self, org: &str, user: &str) -> Result<ApiResponse<Membership>> {
        self.record("get_org_membership")?;
        self.with_state(|s| {
            s.memberships
                .get(&(org.to_string(), user.to_string()))
                .cloned()
        })
        .map(|m| self.respond(m))
        .ok_or_else(not_found)
    }

    async fn is_org_member(&self, org: &str, user: &str) -> Result<ApiResponse<bool>> {
        self.record("is_org_member")?;
        let member = self.with_state(|s| {
            s.memberships
                .get(&(org.to_string(), user.to_string()))
                .is_some_and(|m| m.state == "active")
        });
        Ok(self.respond(member))
    }

    async fn edit_org_membership(
        &self,
        org: &str,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<Membership>> {
        self.mutate("edit_org_membership")?;
        let updated = self.with_state(|s| {
            s.memberships
                .get_mut(&(org.to_string(), user.to_string()))
                .map(|m| {
                    m.role = role.to_string();
                    m.clone()
                })
        });
        updated.map(|m| self.respond(m)).ok_or_else(not_found)
    }

    async fn create_org_invitation(
        &self,
        org: &str,
        invitee_id: i64,
        role: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("create_org_invitation")?;
        self.with_state(|s| {
            s.invitations
                .push((org.to_string(), invitee_id, role.to_string()));
        });
        Ok(self.respond(()))
    }

    async fn list_org_members(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>> {
        self.record("list_org_members")?;
        let members: Vec<_> = self.with_state(|s| {
            s.members
                .iter()
                .filter(|(o, _)| o == org)
                .map(|(_, u)| u.clone())
                .collect()
        });
        Ok(self.respond_page(&members, opts))
    }

    async fn list_teams(&self, org: &str, opts: ListOptions) -> Result<ApiResponse<Vec<Team>>> {
        self.record("list_teams")?;
        let org_id = self.org_id(org)?;
        let teams: Vec<_> = self.with_state(|s| {
            s.teams
                .iter()
                .filter(|(o, _)| *o == org_id)
                .map(|(_, t)| t.clone())
                .collect()
        });
        Ok(self.respond_page(&teams, opts))
    }

    async fn get_team_by_id(&self, org_id: i64, team_id: i64) -> Result<ApiResponse<Team>> {
        self.record("get_team_by_id")?;
        let team = self.with_state(|s| {
            let members = s.team_members.iter().filter(|(t, _, _)| *t == team_id).count();
            let repos = s.repo_teams.iter().filter(|(_, t)| t.id == team_id).count();
            s.teams
                .iter()
                .find(|(o, t)| *o == org_id && t.id == team_id)
                .map(|(_, t)| Team {
                    members_count: Some(members as u64),
                    repos_count: Some(repos as u64),
                    ..t.clone()
                })
        });
        team.map(|t| self.respond(t)).ok_or_else(not_found)
    }

    async fn list_child_teams(
        &self,
        org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>> {
        self.record("list_child_teams")?;
        let teams: Vec<_> = self.with_state(|s| {
            s.teams
                .iter()
                .filter(|(o, t)| *o == org_id && t.parent.as_ref().is_some_and(|p| p.id == team_id))
                .map(|(_, t)| t.clone())
                .collect()
        });
        Ok(self.respond_page(&teams, opts))
    }

    async fn list_team_members(
        &self,
        _org_id: i64,
        team_id: i64,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<SimpleUser>>> {
        self.record("list_team_members")?;
        let members: Vec<_> = self.with_state(|s| {
            s.team_members
                .iter()
                .filter(|(t, _, _)| *t == team_id)
                .map(|(_, u, _)| u.clone())
                .collect()
        });
        Ok(self.respond_page(&members, opts))
    }

    async fn get_team_membership(
        &self,
        _org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<TeamMembership>> {
        self.record("get_team_membership")?;
        self.team_role(team_id, user)
            .map(|role| {
                self.respond(TeamMembership {
                    role,
                    state: Some("active".to_string()),
                })
            })
            .ok_or_else(not_found)
    }

    async fn add_team_membership(
        &self,
        _org_id: i64,
        team_id: i64,
        user: &str,
        role: &str,
    ) -> Result<ApiResponse<TeamMembership>> {
        self.mutate("add_team_membership")?;
        let user = Self::summary(&self.user_by_login(user)?);
        self.with_state(|s| {
            s.team_members
                .retain(|(t, u, _)| !(*t == team_id && u.login == user.login));
            s.team_members.push((team_id, user, role.to_string()));
        });
        Ok(self.respond(TeamMembership {
            role: role.to_string(),
            state: Some("active".to_string()),
        }))
    }

    async fn remove_team_membership(
        &self,
        _org_id: i64,
        team_id: i64,
        user: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("remove_team_membership")?;
        self.with_state(|s| {
            s.team_members
                .retain(|(t, u, _)| !(*t == team_id && u.login == user));
        });
        Ok(self.respond(()))
    }

    async fn list_org_repos(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Repository>>> {
        self.record("list_org_repos")?;
        let repos: Vec<_> = self.with_state(|s| {
            s.repos
                .iter()
                .filter(|r| r.owner.login == org)
                .cloned()
                .collect()
        });
        Ok(self.respond_page(&repos, opts))
    }

    async fn get_repo_by_id(&self, id: i64) -> Result<ApiResponse<Repository>> {
        self.record("get_repo_by_id")?;
        self.with_state(|s| s.repos.iter().find(|r| r.id == id).cloned())
            .map(|r| self.respond(r))
            .ok_or_else(not_found)
    }

    async fn list_collaborators(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Collaborator>>> {
        self.record("list_collaborators")?;
        let repo_id = self.repo_id(owner, repo)?;
        let collaborators: Vec<_> = self.with_state(|s| {
            s.collaborators
                .iter()
                .filter(|(r, _)| *r == repo_id)
                .map(|(_, c)| c.clone())
                .collect()
        });
        Ok(self.respond_page(&collaborators, opts))
    }

    async fn is_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<ApiResponse<bool>> {
        self.record("is_collaborator")?;
        let repo_id = self.repo_id(owner, repo)?;
        Ok(self.respond(self.collaborator_permissions(repo_id, user).is_some()))
    }

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("add_collaborator")?;
        let repo_id = self.repo_id(owner, repo)?;
        let user = self.user_by_login(user)?;
        self.with_state(|s| {
            s.collaborators
                .retain(|(r, c)| !(*r == repo_id && c.login == user.login));
            s.collaborators.push((
                repo_id,
                Collaborator {
                    id: user.id,
                    login: user.login.clone(),
                    avatar_url: user.avatar_url.clone(),
                    html_url: user.html_url.clone(),
                    permissions: permissions(&[permission]),
                },
            ));
        });
        Ok(self.respond(()))
    }

    async fn remove_collaborator(
        &self,
        owner: &str,
        repo: &str,
        user: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("remove_collaborator")?;
        let repo_id = self.repo_id(owner, repo)?;
        self.with_state(|s| {
            s.collaborators
                .retain(|(r, c)| !(*r == repo_id && c.login == user));
        });
        Ok(self.respond(()))
    }

    async fn list_repo_teams(
        &self,
        owner: &str,
        repo: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<Team>>> {
        self.record("list_repo_teams")?;
        let repo_id = self.repo_id(owner, repo)?;
        let teams: Vec<_> = self.with_state(|s| {
            s.repo_teams
                .iter()
                .filter(|(r, _)| *r == repo_id)
                .map(|(_, t)| t.clone())
                .collect()
        });
        Ok(self.respond_page(&teams, opts))
    }

    async fn is_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<bool>> {
        self.record("is_team_repo")?;
        let team = self.team_by_slug(org, team_slug)?;
        let repo_id = self.repo_id(owner, repo)?;
        Ok(self.respond(self.repo_team_permissions(repo_id, team.id).is_some()))
    }

    async fn add_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("add_team_repo")?;
        let mut team = self.team_by_slug(org, team_slug)?;
        let repo_id = self.repo_id(owner, repo)?;
        team.permissions = permissions(&[permission]);
        self.with_state(|s| {
            s.repo_teams
                .retain(|(r, t)| !(*r == repo_id && t.id == team.id));
            s.repo_teams.push((repo_id, team));
        });
        Ok(self.respond(()))
    }

    async fn remove_team_repo(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<()>> {
        self.mutate("remove_team_repo")?;
        let team = self.team_by_slug(org, team_slug)?;
        let repo_id = self.repo_id(owner, repo)?;
        self.with_state(|s| {
            s.repo_teams
                .retain(|(r, t)| !(*r == repo_id && t.id == team.id));
        });
        Ok(self.respond(()))
    }

    async fn get_user_by_id(&self, id: i64) -> Result<ApiResponse<User>> {
        self.record("get_user_by_id")?;
        let user = self.with_state(|s| {
            if s.hidden_users.contains(&id) {
                None
            } else {
                s.users.get(&id).cloned()
            }
        });
        user.map(|u| self.respond(u)).ok_or_else(not_found)
    }

    async fn list_fine_grained_pats(
        &self,
        org: &str,
        opts: ListOptions,
    ) -> Result<ApiResponse<Vec<PersonalAccessToken>>> {
        self.record("list_fine_grained_pats")?;
        let pats: Vec<_> = self.with_state(|s| {
            s.pats
                .iter()
                .filter(|(o, _)| o == org)
                .map(|(_, p)| p.clone())
                .collect()
        });
        Ok(self.respond_page(&pats, opts))
    }

    async fn has_saml_provider(&self, org: &str) -> Result<ApiResponse<bool>> {
        self.record("has_saml_provider")?;
        let (enabled, rate_limit) =
            self.with_state(|s| (s.saml.contains_key(org), s.graphql_rate_limit.clone()));
        Ok(ApiResponse::new(enabled).with_rate_limit(rate_limit))
    }

    async fn get_saml_identity(
        &self,
        org: &str,
        login: &str,
    ) -> Result<ApiResponse<Option<SamlIdentity>>> {
        self.record("get_saml_identity")?;
        let (identity, rate_limit) = self.with_state(|s| {
            (
                s.saml.get(org).and_then(|ids| ids.get(login)).cloned(),
                s.graphql_rate_limit.clone(),
            )
        });
        Ok(ApiResponse::new(identity).with_rate_limit(rate_limit))
    }

    async fn fetch_asset(&self, url: &str) -> Result<Asset> {
        self.record("fetch_asset")?;
        Ok(Asset {
            content_type: "image/png".to_string(),
            data: url.as_bytes().to_vec(),
        })
    }
}
