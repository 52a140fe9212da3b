//! Bounds-checked field layout within a fixed-length record.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RelscanError};

/// Byte range `[offset, offset + length)` of one attribute inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldLayout {
    pub offset: usize,
    pub length: usize,
}

impl FieldLayout {
    #[must_use]
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Returns the exclusive end offset, or None on overflow.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }

    /// Validates that the field fits in a record of `record_length` bytes.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if `offset + length` exceeds the record length.
    pub fn check(&self, record_length: usize) -> Result<()> {
        match self.end() {
            Some(end) if end <= record_length => Ok(()),
            _ => Err(RelscanError::LayoutViolation {
                offset: self.offset,
                length: self.length,
                record_length,
            }),
        }
    }

    /// Borrows the field's bytes out of `record`.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if the field falls outside `record`.
    pub fn slice<'a>(&self, record: &'a [u8]) -> Result<&'a [u8]> {
        self.check(record.len())?;
        Ok(&record[self.offset..self.offset + self.length])
    }

    /// Mutably borrows the field's bytes out of `record`.
    ///
    /// # Errors
    ///
    /// Returns `LayoutViolation` if the field falls outside `record`.
    pub fn slice_mut<'a>(&self, record: &'a mut [u8]) -> Result<&'a mut [u8]> {
        self.check(record.len())?;
        Ok(&mut record[self.offset..self.offset + self.length])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout_check() {
        assert!(FieldLayout::new(0, 4).check(4).is_ok());
        assert!(FieldLayout::new(4, 4).check(8).is_ok());
        assert!(FieldLayout::new(5, 4).check(8).is_err());
        assert!(FieldLayout::new(usize::MAX, 2).check(8).is_err());
    }

    #[test]
    fn test_field_layout_slice() {
        let record = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(FieldLayout::new(2, 3).slice(&record).unwrap(), &[3, 4, 5]);
        assert_eq!(FieldLayout::new(6, 0).slice(&record).unwrap(), &[] as &[u8]);

        let err = FieldLayout::new(4, 3).slice(&record).unwrap_err();
        assert!(matches!(
            err,
            RelscanError::LayoutViolation {
                offset: 4,
                length: 3,
                record_length: 6
            }
        ));
    }

    #[test]
    fn test_field_layout_slice_mut() {
        let mut record = [0u8; 4];
        FieldLayout::new(1, 2)
            .slice_mut(&mut record)
            .unwrap()
            .copy_from_slice(&[9, 9]);
        assert_eq!(record, [0, 9, 9, 0]);
    }
}
