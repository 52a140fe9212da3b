//! Resolved attribute descriptors.

use crate::types::{AttrStrategy, AttrType, FieldLayout};

/// A catalog attribute resolved to a supported type and a validated layout.
///
/// Built once per operator invocation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub relation: String,
    pub name: String,
    pub attr_type: AttrType,
    pub layout: FieldLayout,
}

impl AttributeDescriptor {
    #[must_use]
    pub fn offset(&self) -> usize {
        self.layout.offset
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.layout.length
    }

    /// Returns the parse/compare/copy strategy of this attribute's type.
    #[must_use]
    pub fn strategy(&self) -> &'static dyn AttrStrategy {
        self.attr_type.strategy()
    }
}

impl std::fmt::Display for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.relation, self.name)
    }
}
