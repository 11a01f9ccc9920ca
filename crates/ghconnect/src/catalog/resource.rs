use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Annotation, ResourceId};

/// Extensible string-keyed profile attached to user and group resources.
pub type Profile = BTreeMap<String, serde_json::Value>;

/// A node in the discovered access-control graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    pub parent_resource_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(rename = "trait")]
    pub traits: ResourceTrait,
}

impl Resource {
    #[must_use]
    pub fn new(
        id: ResourceId,
        display_name: impl Into<String>,
        parent_resource_id: Option<ResourceId>,
        traits: ResourceTrait,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            parent_resource_id,
            annotations: Vec::new(),
            traits,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        self.annotations.extend(annotations);
        self
    }

    /// The profile map of a user or group resource.
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match &self.traits {
            ResourceTrait::User(user) => Some(&user.profile),
            ResourceTrait::Group(group) => Some(&group.profile),
            ResourceTrait::Secret(_) | ResourceTrait::None => None,
        }
    }

    /// Look up an integer profile value.
    #[must_use]
    pub fn profile_i64(&self, key: &str) -> Option<i64> {
        self.profile()?.get(key)?.as_i64()
    }
}

/// Capability carried by a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceTrait {
    User(UserTrait),
    Group(GroupTrait),
    Secret(SecretTrait),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub address: String,
    pub primary: bool,
}

/// Opaque reference to an asset the connector can fetch, such as an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTrait {
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<Email>,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<AssetRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: Profile,
}

impl UserTrait {
    /// The primary email address, if any.
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .map(|e| e.address.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTrait {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_count: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: Profile,
}

/// Timestamps are omitted, not zeroed, when upstream does not report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTrait {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ResourceId>,
}

/// Split a display name into first and last name on the first space.
#[must_use]
pub fn split_name(display_name: &str) -> (String, String) {
    match display_name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (display_name.to_string(), String::new()),
    }
}
