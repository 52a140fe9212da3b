//! Scoped ownership of scan and insert handles.
//!
//! A lease owns one storage handle and releases it exactly once, either
//! explicitly via `finish` or implicitly on drop. Leases declared in
//! acquisition order are therefore released in reverse order on every exit
//! path.

use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{Record, RecordId, RecordInsert, RecordScan, ScanPredicate, StorageEngine};

/// Owned scan handle on the source relation.
pub struct ScanLease<'a> {
    relation: String,
    handle: Box<dyn RecordScan + 'a>,
    started: bool,
    released: bool,
}

impl<'a> ScanLease<'a> {
    /// Opens a scan handle.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error; nothing is held on failure.
    pub fn open(storage: &'a dyn StorageEngine, relation: &str) -> Result<Self> {
        let handle = storage.open_scan(relation)?;
        debug!(relation, "acquired scan handle");
        Ok(Self {
            relation: relation.to_string(),
            handle,
            started: false,
            released: false,
        })
    }

    /// Starts the scan, filtered by `predicate` if present.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error.
    pub fn start(&mut self, predicate: Option<ScanPredicate>) -> Result<()> {
        self.handle.start_scan(predicate)?;
        self.started = true;
        Ok(())
    }

    /// Advances to the next qualifying record.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error.
    pub fn next(&mut self) -> Result<Option<RecordId>> {
        self.handle.next()
    }

    /// Fetches the record at `rid`.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error.
    pub fn fetch(&mut self, rid: RecordId) -> Result<Record> {
        self.handle.fetch(rid)
    }

    /// Ends an exhausted scan normally, then releases the handle.
    ///
    /// # Errors
    ///
    /// Returns the error from ending the scan; the handle is released regardless.
    pub fn finish(mut self) -> Result<()> {
        let ended = if self.started {
            self.started = false;
            self.handle.end_scan()
        } else {
            Ok(())
        };
        self.release();
        ended
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if self.started {
            self.started = false;
            if let Err(e) = self.handle.end_scan() {
                warn!(relation = %self.relation, error = %e, "failed to end scan during release");
            }
        }
        self.handle.close();
        self.released = true;
        debug!(relation = %self.relation, "released scan handle");
    }
}

impl Drop for ScanLease<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owned insertion handle on the destination relation.
pub struct InsertLease<'a> {
    relation: String,
    handle: Box<dyn RecordInsert + 'a>,
    inserted: usize,
    released: bool,
}

impl<'a> InsertLease<'a> {
    /// Opens an insertion handle.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error; nothing is held on failure.
    pub fn open(storage: &'a dyn StorageEngine, relation: &str) -> Result<Self> {
        let handle = storage.open_insert(relation)?;
        debug!(relation, "acquired insert handle");
        Ok(Self {
            relation: relation.to_string(),
            handle,
            inserted: 0,
            released: false,
        })
    }

    /// Inserts one record.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's error.
    pub fn insert(&mut self, record: &Record) -> Result<RecordId> {
        let rid = self.handle.insert(record)?;
        self.inserted += 1;
        Ok(rid)
    }

    /// Number of records inserted through this lease.
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Releases the handle, returning the number of records inserted.
    pub fn finish(mut self) -> usize {
        self.release();
        self.inserted
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.handle.close();
        self.released = true;
        debug!(relation = %self.relation, inserted = self.inserted, "released insert handle");
    }
}

impl Drop for InsertLease<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
