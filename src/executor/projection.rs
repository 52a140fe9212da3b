//! Projection lists and output record assembly.

use crate::catalog::AttributeDescriptor;
use crate::error::{Result, RelscanError};
use crate::storage::Record;

/// Ordered, non-empty list of attributes of a single source relation.
///
/// The order defines the output record layout: fields are packed back to
/// back, so the output record length is the sum of the attribute lengths.
#[derive(Debug, Clone)]
pub struct ProjectionList {
    attributes: Vec<AttributeDescriptor>,
    output_length: usize,
}

impl ProjectionList {
    /// Builds a projection list.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the list is empty or names more than one relation.
    pub fn new(attributes: Vec<AttributeDescriptor>) -> Result<Self> {
        let Some(first) = attributes.first() else {
            return Err(RelscanError::SchemaError(
                "Projection list must not be empty".into(),
            ));
        };
        if let Some(other) = attributes.iter().find(|a| a.relation != first.relation) {
            return Err(RelscanError::SchemaError(format!(
                "Projection spans relations '{}' and '{}'; joins are not supported",
                first.relation, other.relation
            )));
        }
        let output_length = attributes.iter().map(AttributeDescriptor::length).sum();
        Ok(Self {
            attributes,
            output_length,
        })
    }

    /// The relation every projected attribute belongs to.
    #[must_use]
    pub fn source_relation(&self) -> &str {
        &self.attributes[0].relation
    }

    /// Length of each assembled output record.
    #[must_use]
    pub fn output_length(&self) -> usize {
        self.output_length
    }

    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Copies each projected field of `source`, in projection order, into a new record.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if `source` is too short for a projected field.
    pub fn assemble(&self, source: &Record) -> Result<Record> {
        let mut output = Record::zeroed(self.output_length);
        let mut cursor = 0;
        for attr in &self.attributes {
            attr.strategy()
                .copy_field(source.data(), attr.layout, output.data_mut(), cursor)?;
            cursor += attr.length();
        }
        Ok(output)
    }
}
