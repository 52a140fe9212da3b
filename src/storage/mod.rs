//! Storage collaborators for the select operator.
//!
//! This module provides:
//! - The scan/insert collaborator traits ([`StorageEngine`], [`RecordScan`], [`RecordInsert`])
//! - Records, locators and scan predicates
//! - An in-process page-based heap store ([`HeapStore`])
//! - Snapshot persistence ([`snapshot`])

mod heap;
mod predicate;
mod record;

pub mod page;
pub mod snapshot;

pub use heap::{HeapFile, HeapInsert, HeapScan, HeapStore};
pub use page::{HeapPage, PAGE_SIZE};
pub use predicate::ScanPredicate;
pub use record::{Record, RecordId};

use crate::error::{Result, RelscanError};

/// Largest supported page size; slot indices must fit in a `u16`.
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

/// Opens scan and insertion handles on named relations.
pub trait StorageEngine {
    /// Opens a scan handle on a relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation cannot be opened.
    fn open_scan(&self, relation: &str) -> Result<Box<dyn RecordScan + '_>>;

    /// Opens an insertion handle on a relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation cannot be opened.
    fn open_insert(&self, relation: &str) -> Result<Box<dyn RecordInsert + '_>>;
}

/// A single-owner cursor over a relation's records.
///
/// Protocol: `start_scan`, then `next`/`fetch` until `next` returns `None`,
/// then `end_scan`. `close` releases the handle and may be called once the
/// caller is done, whatever state the scan is in.
pub trait RecordScan {
    /// Starts the scan. `None` means every record qualifies.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    fn start_scan(&mut self, predicate: Option<ScanPredicate>) -> Result<()>;

    /// Advances to the next qualifying record. `Ok(None)` is end-of-scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn next(&mut self) -> Result<Option<RecordId>>;

    /// Fetches the record at a locator returned by `next`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn fetch(&mut self, rid: RecordId) -> Result<Record>;

    /// Ends a started scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan was not started.
    fn end_scan(&mut self) -> Result<()>;

    /// Releases the handle.
    fn close(&mut self);
}

/// A single-owner append handle on a relation.
pub trait RecordInsert {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn insert(&mut self, record: &Record) -> Result<RecordId>;

    /// Releases the handle.
    fn close(&mut self);
}

/// Configuration for the heap store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Size of each heap page in bytes (default: 4KB).
    pub page_size: usize,
    /// Verify page and snapshot checksums when loading (default: true).
    pub verify_checksums: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            verify_checksums: true,
        }
    }
}

impl StorageConfig {
    /// Creates a new storage configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets whether checksums are verified on load.
    #[must_use]
    pub fn with_verify_checksums(mut self, verify_checksums: bool) -> Self {
        self.verify_checksums = verify_checksums;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the page size is out of range.
    pub fn validate(&self) -> Result<()> {
        check_page_size(self.page_size)
    }
}

pub(crate) fn check_page_size(page_size: usize) -> Result<()> {
    if !(page::MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(RelscanError::StorageError(format!(
            "Page size {page_size} outside [{}, {MAX_PAGE_SIZE}]",
            page::MIN_PAGE_SIZE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.page_size, PAGE_SIZE);
        assert!(config.verify_checksums);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_config_builder() {
        let config = StorageConfig::new()
            .with_page_size(512)
            .with_verify_checksums(false);
        assert_eq!(config.page_size, 512);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_storage_config_rejects_bad_page_size() {
        assert!(StorageConfig::new().with_page_size(16).validate().is_err());
        assert!(StorageConfig::new()
            .with_page_size(MAX_PAGE_SIZE + 1)
            .validate()
            .is_err());
    }
}
