//! Organization id ⇄ login cache shared by every driver.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::{ResourceId, parse_upstream_id};
use crate::error::Result;
use crate::github::GitHubApi;

#[derive(Debug, Default)]
struct OrgNames {
    login_by_id: HashMap<i64, String>,
    id_by_login: HashMap<String, i64>,
}

impl OrgNames {
    fn insert(&mut self, id: i64, login: &str) {
        self.login_by_id.insert(id, login.to_string());
        self.id_by_login.insert(login.to_string(), id);
    }
}

/// Memoizing lookup between organization ids and logins.
///
/// Reads take the shared lock. A miss upgrades to the exclusive lock,
/// re-checks, and only then fetches, so at most one populate per key is in
/// flight.
pub struct OrgNameCache {
    client: Arc<dyn GitHubApi>,
    names: RwLock<OrgNames>,
}

impl OrgNameCache {
    pub fn new(client: Arc<dyn GitHubApi>) -> Self {
        Self {
            client,
            names: RwLock::new(OrgNames::default()),
        }
    }

    /// Record an id/login pair already seen upstream.
    pub async fn prime(&self, id: i64, login: &str) {
        self.names.write().await.insert(id, login);
    }

    /// Login of the organization identified by `org_id`.
    pub async fn get_org_name(&self, org_id: &ResourceId) -> Result<String> {
        let id = parse_upstream_id(&org_id.resource)?;

        if let Some(login) = self.names.read().await.login_by_id.get(&id) {
            return Ok(login.clone());
        }

        let mut names = self.names.write().await;
        if let Some(login) = names.login_by_id.get(&id) {
            return Ok(login.clone());
        }

        let org = self.client.get_org_by_id(id).await?.data;
        tracing::debug!(org_id = id, login = %org.login, "Cached organization name");
        names.insert(org.id, &org.login);
        Ok(org.login)
    }

    /// Numeric id of the organization with `login`.
    pub async fn get_org_id(&self, login: &str) -> Result<i64> {
        if let Some(id) = self.names.read().await.id_by_login.get(login) {
            return Ok(*id);
        }

        let mut names = self.names.write().await;
        if let Some(id) = names.id_by_login.get(login) {
            return Ok(*id);
        }

        let org = self.client.get_org(login).await?.data;
        tracing::debug!(org_id = org.id, login = %org.login, "Cached organization id");
        names.insert(org.id, &org.login);
        Ok(org.id)
    }
}
