//! Attribute resolution: symbolic (relation, attribute) names to typed descriptors.

use crate::catalog::{AttributeCatalog, AttributeDescriptor};
use crate::error::{Result, RelscanError};
use crate::types::{AttrType, FieldLayout};

/// Resolves one attribute through the catalog.
///
/// # Errors
///
/// - `AttributeNotFound` if the catalog has no such attribute
/// - `UnsupportedType` if its type code has no parse/compare semantics
/// - `LayoutViolation` if its offset and length overrun the record length
pub fn resolve_attribute(
    catalog: &dyn AttributeCatalog,
    relation: &str,
    attribute: &str,
) -> Result<AttributeDescriptor> {
    let info = catalog
        .attribute_info(relation, attribute)
        .ok_or_else(|| RelscanError::AttributeNotFound {
            relation: relation.to_string(),
            attribute: attribute.to_string(),
        })?;

    let attr_type =
        AttrType::from_code(info.type_code).ok_or_else(|| RelscanError::UnsupportedType {
            relation: info.relation.clone(),
            attribute: info.name.clone(),
            type_code: info.type_code,
        })?;

    let layout = FieldLayout::new(info.offset, info.length);
    layout.check(info.record_length)?;

    Ok(AttributeDescriptor {
        relation: info.relation,
        name: info.name,
        attr_type,
        layout,
    })
}

/// Resolves a batch of attributes, failing on the first that cannot be resolved.
///
/// # Errors
///
/// See [`resolve_attribute`].
pub fn resolve_all<'a, I>(catalog: &dyn AttributeCatalog, refs: I) -> Result<Vec<AttributeDescriptor>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    refs.into_iter()
        .map(|(relation, attribute)| resolve_attribute(catalog, relation, attribute))
        .collect()
}
