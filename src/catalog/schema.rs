//! Relation schemas and the attribute catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AttributeDescriptor;
use crate::error::{Result, RelscanError};
use crate::types::{AttrType, FieldLayout};

/// Read-only attribute lookup used by the select operator.
///
/// Implementations return the raw catalog entry; type-code and layout
/// validation happen in the resolver.
pub trait AttributeCatalog {
    /// Looks up one attribute of one relation.
    fn attribute_info(&self, relation: &str, attribute: &str) -> Option<AttrInfo>;
}

/// Raw catalog entry for one attribute, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrInfo {
    pub relation: String,
    pub name: String,
    /// Raw type code (see [`AttrType::code`]).
    pub type_code: u8,
    pub offset: usize,
    pub length: usize,
    /// Record length of the owning relation.
    pub record_length: usize,
}

/// Central registry of relation schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    relations: HashMap<String, RelationSchema>,
}

impl Catalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Catalog {
            relations: HashMap::new(),
        }
    }

    /// Registers a new relation schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a relation with the same name already exists.
    pub fn create_relation(&mut self, schema: RelationSchema) -> Result<&RelationSchema> {
        if self.relations.contains_key(&schema.name) {
            return Err(RelscanError::RelationExists(schema.name));
        }
        let name = schema.name.clone();
        Ok(self.relations.entry(name).or_insert(schema))
    }

    /// Removes a relation schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation does not exist.
    pub fn drop_relation(&mut self, name: &str) -> Result<RelationSchema> {
        self.relations
            .remove(name)
            .ok_or_else(|| RelscanError::RelationNotFound(name.to_string()))
    }

    /// Retrieves a relation schema by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations.get(name)
    }

    /// Checks if a relation exists in the catalog.
    #[must_use]
    pub fn relation_exists(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Returns all relation names, sorted.
    #[must_use]
    pub fn relation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Serializes the catalog to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| RelscanError::CatalogError(format!("Failed to serialize catalog: {e}")))
    }

    /// Deserializes a catalog from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| RelscanError::CatalogError(format!("Failed to deserialize catalog: {e}")))
    }
}

impl AttributeCatalog for Catalog {
    fn attribute_info(&self, relation: &str, attribute: &str) -> Option<AttrInfo> {
        let schema = self.relations.get(relation)?;
        let attr = schema.attribute(attribute)?;
        Some(AttrInfo {
            relation: schema.name.clone(),
            name: attr.name.clone(),
            type_code: attr.type_code,
            offset: attr.offset,
            length: attr.length,
            record_length: schema.record_length,
        })
    }
}

/// Schema definition for a heap relation of fixed-length records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSchema {
    /// Relation name.
    pub name: String,
    /// Attributes in record order; offsets are contiguous from 0.
    pub attributes: Vec<AttrDef>,
    /// Sum of attribute lengths.
    pub record_length: usize,
}

impl RelationSchema {
    /// Creates a schema, laying attributes out back to back.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (no attributes, duplicate names,
    /// zero-length attributes, numeric attributes of the wrong width, or a
    /// total record length that overflows `usize`).
    pub fn new(name: impl Into<String>, mut attributes: Vec<AttrDef>) -> Result<Self> {
        let mut offset: usize = 0;
        for attr in &mut attributes {
            attr.offset = offset;
            offset = offset.checked_add(attr.length).ok_or_else(|| {
                RelscanError::SchemaError(format!(
                    "Record length overflows at attribute '{}'",
                    attr.name
                ))
            })?;
        }
        let schema = RelationSchema {
            name: name.into(),
            attributes,
            record_length: offset,
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RelscanError::SchemaError(
                "Relation name must not be empty".into(),
            ));
        }
        if self.attributes.is_empty() {
            return Err(RelscanError::SchemaError(format!(
                "Relation '{}' must have at least one attribute",
                self.name
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(RelscanError::SchemaError(format!(
                    "Duplicate attribute '{}' in relation '{}'",
                    attr.name, self.name
                )));
            }
            if attr.length == 0 {
                return Err(RelscanError::SchemaError(format!(
                    "Attribute '{}' must have a non-zero length",
                    attr.name
                )));
            }
            if let Some(width) = AttrType::from_code(attr.type_code).and_then(|t| t.fixed_width()) {
                if attr.length != width {
                    return Err(RelscanError::SchemaError(format!(
                        "Attribute '{}' must be {width} bytes wide, got {}",
                        attr.name, attr.length
                    )));
                }
            }
            attr.layout().check(self.record_length)?;
        }
        Ok(())
    }

    /// Gets an attribute definition by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Returns the attribute names in record order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Resolves every attribute, in record order.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for an attribute with an unknown type code.
    pub fn descriptors(&self) -> Result<Vec<AttributeDescriptor>> {
        self.attributes
            .iter()
            .map(|attr| {
                let attr_type = AttrType::from_code(attr.type_code).ok_or_else(|| {
                    RelscanError::UnsupportedType {
                        relation: self.name.clone(),
                        attribute: attr.name.clone(),
                        type_code: attr.type_code,
                    }
                })?;
                Ok(AttributeDescriptor {
                    relation: self.name.clone(),
                    name: attr.name.clone(),
                    attr_type,
                    layout: attr.layout(),
                })
            })
            .collect()
    }
}

/// Attribute definition as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDef {
    /// Attribute name.
    pub name: String,
    /// Raw type code.
    pub type_code: u8,
    /// Byte offset within the record.
    pub offset: usize,
    /// Byte length.
    pub length: usize,
}

impl AttrDef {
    /// Creates an attribute definition. The offset is assigned by [`RelationSchema::new`].
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: AttrType, length: usize) -> Self {
        AttrDef {
            name: name.into(),
            type_code: attr_type.code(),
            offset: 0,
            length,
        }
    }

    /// Shorthand for a 4-byte INTEGER attribute.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttrType::Integer, 4)
    }

    /// Shorthand for a 4-byte FLOAT attribute.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, AttrType::Float, 4)
    }

    /// Shorthand for a STRING attribute of `length` bytes.
    #[must_use]
    pub fn string(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, AttrType::String, length)
    }

    /// Returns the byte range of this attribute.
    #[must_use]
    pub fn layout(&self) -> FieldLayout {
        FieldLayout::new(self.offset, self.length)
    }
}
