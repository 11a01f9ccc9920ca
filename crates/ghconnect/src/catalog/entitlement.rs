use serde::{Deserialize, Serialize};

use super::{Annotation, Resource, ResourceId, ResourceTypeTag, entitlement_id, grant_id};

/// How an entitlement is conferred upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    /// Membership-style entitlement (org or team roles).
    Assignment,
    /// Permission level on a resource (repository access).
    Permission,
}

/// A grantable permission level defined on a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub resource: Resource,
    pub display_name: String,
    pub description: String,
    pub grantable_to: Vec<ResourceTypeTag>,
    pub slug: String,
    pub purpose: EntitlementPurpose,
}

impl Entitlement {
    /// Build an entitlement whose id is derived from the resource id and slug.
    #[must_use]
    pub fn new(
        resource: &Resource,
        slug: &str,
        purpose: EntitlementPurpose,
        grantable_to: &[ResourceTypeTag],
    ) -> Self {
        Self {
            id: entitlement_id(&resource.id, slug),
            display_name: format!("{} {}", resource.display_name, slug),
            description: format!("{} of {} {}", slug, resource.display_name, resource.id.resource_type),
            resource: resource.clone(),
            grantable_to: grantable_to.to_vec(),
            slug: slug.to_string(),
            purpose,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn is_grantable_to(&self, resource_type: ResourceTypeTag) -> bool {
        self.grantable_to.contains(&resource_type)
    }
}

/// An edge from a principal to an entitlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub entitlement: Entitlement,
    pub principal: ResourceId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Grant {
    /// Build a grant of the entitlement `slug` on `resource` to `principal`.
    ///
    /// The entitlement carried by the grant is the same value
    /// [`Entitlement::new`] would produce, so the grant id matches the
    /// listed entitlement's id.
    #[must_use]
    pub fn new(
        resource: &Resource,
        slug: &str,
        purpose: EntitlementPurpose,
        grantable_to: &[ResourceTypeTag],
        principal: ResourceId,
    ) -> Self {
        let entitlement = Entitlement::new(resource, slug, purpose, grantable_to);
        Self {
            id: grant_id(&entitlement.id, &principal),
            entitlement,
            principal,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}
