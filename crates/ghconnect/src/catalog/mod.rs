//! The resource/entitlement/grant catalog and its identifier scheme.
//!
//! Everything here is a computed value: drivers build these types per call
//! and the ids are pure functions of upstream ids and permission slugs, so
//! listing the same upstream state twice yields identical ids.

mod annotations;
mod entitlement;
mod ids;
mod resource;

pub use annotations::{
    Annotation, InvalidRateLimitHeader, RateLimitDescription, RateLimitStatus,
    child_resource_types, rate_limits,
};
pub use entitlement::{Entitlement, EntitlementPurpose, Grant};
pub use ids::{
    ResourceId, ResourceTypeTag, entitlement_id, format_scoped_id, grant_id, parse_scoped_id,
    parse_upstream_id,
};
pub use resource::{
    AssetRef, Email, GroupTrait, Profile, Resource, ResourceTrait, SecretTrait, UserStatus,
    UserTrait, split_name,
};
