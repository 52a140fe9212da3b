//! Per-record predicate evaluated by the storage engine during a scan.

use crate::error::{Result, RelscanError};
use crate::types::{AttrType, CompareOp, FieldLayout};

/// `field op literal`, with the literal already in stored binary form.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPredicate {
    pub layout: FieldLayout,
    pub attr_type: AttrType,
    pub literal: Vec<u8>,
    pub op: CompareOp,
}

impl ScanPredicate {
    /// Builds a predicate, checking the literal is exactly as wide as the field.
    ///
    /// # Errors
    ///
    /// Returns `RecordLengthMismatch` if the literal width differs from the field length.
    pub fn new(
        layout: FieldLayout,
        attr_type: AttrType,
        literal: Vec<u8>,
        op: CompareOp,
    ) -> Result<Self> {
        if literal.len() != layout.length {
            return Err(RelscanError::RecordLengthMismatch {
                expected: layout.length,
                actual: literal.len(),
            });
        }
        Ok(Self {
            layout,
            attr_type,
            literal,
            op,
        })
    }

    /// Evaluates the predicate against one record.
    ///
    /// Incomparable values (e.g. NaN) never match.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if the field falls outside the record.
    pub fn matches(&self, record: &[u8]) -> Result<bool> {
        let field = self.layout.slice(record)?;
        Ok(self
            .attr_type
            .strategy()
            .compare(field, &self.literal)
            .is_some_and(|ordering| self.op.holds(ordering)))
    }
}

impl std::fmt::Display for ScanPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}..{}] {} {:?}",
            self.attr_type,
            self.layout.offset,
            self.layout.offset + self.layout.length,
            self.op,
            self.literal
        )
    }
}
