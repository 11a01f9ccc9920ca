//! Wire shapes of the GitHub REST responses the connector consumes.
//!
//! Only the fields the drivers read are modelled; everything else in the
//! upstream payloads is ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest page size GitHub accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page selection for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page: u32,
    pub per_page: u32,
}

impl ListOptions {
    /// A zero or oversized page size is clamped to [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        let per_page = if per_page == 0 || per_page > MAX_PAGE_SIZE {
            MAX_PAGE_SIZE
        } else {
            per_page
        };
        Self {
            page: page.max(1),
            per_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Organization {
    /// Web URL of the organization, derived from the login when upstream
    /// omits it.
    #[must_use]
    pub fn web_url(&self) -> String {
        self.html_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}", self.login))
    }
}

/// Summary user record as returned by member and collaborator listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

/// Full user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
    #[serde(default)]
    pub two_factor_authentication: Option<bool>,
}

impl From<SimpleUser> for User {
    fn from(summary: SimpleUser) -> Self {
        Self {
            id: summary.id,
            login: summary.login,
            name: None,
            email: None,
            avatar_url: summary.avatar_url,
            html_url: summary.html_url,
            user_type: summary.user_type,
            two_factor_authentication: None,
        }
    }
}

/// Organization membership of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// `active` or `pending`.
    pub state: String,
    /// `admin`, `member` or `billing_manager`.
    pub role: String,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub user: Option<SimpleUser>,
}

/// Team membership of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    /// `member` or `maintainer`.
    pub role: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Reference to a team's parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamParent {
    pub id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub members_count: Option<u64>,
    #[serde(default)]
    pub repos_count: Option<u64>,
    #[serde(default)]
    pub parent: Option<TeamParent>,
    #[serde(default)]
    pub organization: Option<Organization>,
    /// Present when the team is listed as having access to a repository.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: SimpleUser,
}

/// A repository collaborator and the permission booleans they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

/// Fine-grained personal access token granted access to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalAccessToken {
    pub id: i64,
    pub owner: SimpleUser,
    #[serde(default)]
    pub token_name: Option<String>,
    #[serde(default)]
    pub token_expired: Option<bool>,
    #[serde(default)]
    pub access_granted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// SAML external identity linked to an organization member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamlIdentity {
    pub name_id: Option<String>,
    pub emails: Vec<String>,
}

/// A fetched asset body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content_type: String,
    pub data: Vec<u8>,
}
