use crate::catalog::ResourceTypeTag;

/// Kind of trait carried by resources of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitKind {
    None,
    Group,
    User,
    Secret,
}

/// Static descriptor of a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub id: ResourceTypeTag,
    pub display_name: &'static str,
    pub trait_kind: TraitKind,
}

/// Descriptor for `tag`.
#[must_use]
pub fn resource_type(tag: ResourceTypeTag) -> ResourceType {
    let (display_name, trait_kind) = match tag {
        ResourceTypeTag::Org => ("Org", TraitKind::None),
        ResourceTypeTag::Team => ("Team", TraitKind::Group),
        ResourceTypeTag::Repository => ("Repository", TraitKind::None),
        ResourceTypeTag::User => ("User", TraitKind::User),
        ResourceTypeTag::ApiToken => ("API Token", TraitKind::Secret),
    };
    ResourceType {
        id: tag,
        display_name,
        trait_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_kinds_match_resource_shapes() {
        assert_eq!(resource_type(ResourceTypeTag::Team).trait_kind, TraitKind::Group);
        assert_eq!(resource_type(ResourceTypeTag::User).trait_kind, TraitKind::User);
        assert_eq!(resource_type(ResourceTypeTag::ApiToken).trait_kind, TraitKind::Secret);
        assert_eq!(resource_type(ResourceTypeTag::Repository).display_name, "Repository");
    }
}
