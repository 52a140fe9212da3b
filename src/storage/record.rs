//! Records and record locators.

use std::fmt;

/// An opaque fixed-length record. Its meaning comes from the owning relation's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    data: Vec<u8>,
}

impl Record {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Creates a zero-filled record of `length` bytes.
    #[must_use]
    pub fn zeroed(length: usize) -> Self {
        Self {
            data: vec![0u8; length],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<Vec<u8>> for Record {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Locator of a record within a heap relation, valid only for fetching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Page index within the relation.
    pub page: u32,
    /// Slot index within the page.
    pub slot: u16,
}

impl RecordId {
    #[must_use]
    pub const fn new(page: u32, slot: u16) -> Self {
        Self { page, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}/{})", self.page, self.slot)
    }
}
