//! Heap relations and the in-process heap store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RelscanError};
use crate::storage::page::HeapPage;
use crate::storage::{
    check_page_size, Record, RecordId, RecordInsert, RecordScan, ScanPredicate, StorageConfig, StorageEngine,
};

/// An unordered collection of fixed-length records spread over heap pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapFile {
    page_size: usize,
    record_length: usize,
    pages: Vec<HeapPage>,
    #[serde(skip)]
    record_count: usize,
    /// Index of the first page that may have a free slot; pages never regain space.
    #[serde(skip)]
    open_page: usize,
}

impl HeapFile {
    /// Creates an empty heap file.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if a record of this length cannot fit in a page.
    pub fn new(page_size: usize, record_length: usize) -> Result<Self> {
        // Probe once so oversized records fail at creation, not first insert.
        HeapPage::new(page_size, record_length)?;
        Ok(Self {
            page_size,
            record_length,
            pages: Vec::new(),
            record_count: 0,
            open_page: 0,
        })
    }

    #[must_use]
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends a record to the first page with a free slot, allocating a page if none has one.
    ///
    /// # Errors
    ///
    /// Returns `RecordLengthMismatch` if the record has the wrong length.
    pub fn insert(&mut self, record: &[u8]) -> Result<RecordId> {
        if record.len() != self.record_length {
            return Err(RelscanError::RecordLengthMismatch {
                expected: self.record_length,
                actual: record.len(),
            });
        }
        while self.pages.get(self.open_page).is_some_and(HeapPage::is_full) {
            self.open_page += 1;
        }
        if self.open_page == self.pages.len() {
            self.pages
                .push(HeapPage::new(self.page_size, self.record_length)?);
        }
        let page_idx = self.open_page;
        let slot = self.pages[page_idx].insert(record)?;
        self.record_count += 1;
        Ok(RecordId::new(page_idx as u32, slot as u16))
    }

    /// Returns the bytes of the record at `rid`.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if no live record is there.
    pub fn get(&self, rid: RecordId) -> Result<&[u8]> {
        self.pages
            .get(rid.page as usize)
            .ok_or_else(|| RelscanError::RecordNotFound(rid.to_string()))?
            .get(rid.slot as usize)
            .map_err(|_| RelscanError::RecordNotFound(rid.to_string()))
    }

    /// Iterates over live records in page/slot order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pages.iter().flat_map(|page| {
            let mut slot = 0;
            std::iter::from_fn(move || {
                let live = page.next_live(slot)?;
                slot = live + 1;
                page.get(live).ok()
            })
        })
    }

    fn sealed(&self) -> Self {
        let mut copy = self.clone();
        for page in &mut copy.pages {
            page.seal();
        }
        copy
    }

    fn restore(mut self, verify_checksums: bool) -> Result<Self> {
        check_page_size(self.page_size)?;
        let mut count = 0;
        for page in &self.pages {
            if verify_checksums {
                page.verify(self.page_size, self.record_length)?;
            } else {
                page.check_header(self.page_size, self.record_length)?;
            }
            count += page.live_count();
        }
        self.record_count = count;
        self.open_page = 0;
        Ok(self)
    }
}

/// In-process storage engine holding every heap relation.
///
/// Handles borrow the store; each handle is owned by a single caller.
#[derive(Debug)]
pub struct HeapStore {
    config: StorageConfig,
    relations: RwLock<HashMap<String, HeapFile>>,
}

impl HeapStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            relations: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the storage configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates an empty heap relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation exists or its records cannot fit in a page.
    pub fn create_relation(&self, name: &str, record_length: usize) -> Result<()> {
        let mut relations = self.relations.write();
        if relations.contains_key(name) {
            return Err(RelscanError::RelationExists(name.to_string()));
        }
        let file = HeapFile::new(self.config.page_size, record_length)?;
        relations.insert(name.to_string(), file);
        debug!(relation = name, record_length, "created heap relation");
        Ok(())
    }

    /// Removes a heap relation and all its records.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if it does not exist.
    pub fn drop_relation(&self, name: &str) -> Result<()> {
        self.relations
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RelscanError::RelationNotFound(name.to_string()))
    }

    /// Checks if a heap relation exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.relations.read().contains_key(name)
    }

    /// Returns the number of records in a relation.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if it does not exist.
    pub fn record_count(&self, name: &str) -> Result<usize> {
        self.relations
            .read()
            .get(name)
            .map(HeapFile::record_count)
            .ok_or_else(|| RelscanError::RelationNotFound(name.to_string()))
    }

    /// Copies out every record of a relation in storage order.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if it does not exist.
    pub fn records(&self, name: &str) -> Result<Vec<Record>> {
        let relations = self.relations.read();
        let file = relations
            .get(name)
            .ok_or_else(|| RelscanError::RelationNotFound(name.to_string()))?;
        Ok(file.iter().map(|bytes| Record::new(bytes.to_vec())).collect())
    }

    /// Returns a checksummed copy of every relation for persistence.
    pub(crate) fn sealed_relations(&self) -> HashMap<String, HeapFile> {
        self.relations
            .read()
            .iter()
            .map(|(name, file)| (name.clone(), file.sealed()))
            .collect()
    }

    /// Rebuilds a store from persisted relations.
    pub(crate) fn from_relations(
        config: StorageConfig,
        relations: HashMap<String, HeapFile>,
    ) -> Result<Self> {
        config.validate()?;
        let mut restored = HashMap::with_capacity(relations.len());
        for (name, file) in relations {
            let file = file.restore(config.verify_checksums).map_err(|e| match e {
                RelscanError::ChecksumError(msg) => {
                    RelscanError::ChecksumError(format!("relation '{name}': {msg}"))
                }
                other => other,
            })?;
            restored.insert(name, file);
        }
        Ok(Self {
            config,
            relations: RwLock::new(restored),
        })
    }

    fn missing(name: &str) -> RelscanError {
        RelscanError::RelationNotFound(name.to_string())
    }
}

impl StorageEngine for HeapStore {
    fn open_scan(&self, relation: &str) -> Result<Box<dyn RecordScan + '_>> {
        if !self.contains(relation) {
            return Err(Self::missing(relation));
        }
        debug!(relation, "opened heap scan");
        Ok(Box::new(HeapScan {
            store: self,
            relation: relation.to_string(),
            state: ScanState::Opened,
            closed: false,
        }))
    }

    fn open_insert(&self, relation: &str) -> Result<Box<dyn RecordInsert + '_>> {
        if !self.contains(relation) {
            return Err(Self::missing(relation));
        }
        debug!(relation, "opened heap insert");
        Ok(Box::new(HeapInsert {
            store: self,
            relation: relation.to_string(),
            inserted: 0,
            closed: false,
        }))
    }
}

#[derive(Debug)]
enum ScanState {
    Opened,
    Scanning {
        predicate: Option<ScanPredicate>,
        page: usize,
        slot: usize,
    },
    Ended,
}

/// Scan cursor over one heap relation.
///
/// The predicate, if any, is evaluated inside `next`, so only qualifying
/// locators are ever returned.
pub struct HeapScan<'a> {
    store: &'a HeapStore,
    relation: String,
    state: ScanState,
    closed: bool,
}

impl HeapScan<'_> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RelscanError::ScanStateError(format!(
                "scan on '{}' is closed",
                self.relation
            )));
        }
        Ok(())
    }

    fn not_scanning(&self, op: &str) -> RelscanError {
        RelscanError::ScanStateError(format!(
            "{op} on '{}' requires an active scan (state: {})",
            self.relation,
            match self.state {
                ScanState::Opened => "opened",
                ScanState::Scanning { .. } => "scanning",
                ScanState::Ended => "ended",
            }
        ))
    }
}

impl RecordScan for HeapScan<'_> {
    fn start_scan(&mut self, predicate: Option<ScanPredicate>) -> Result<()> {
        self.ensure_open()?;
        if matches!(self.state, ScanState::Scanning { .. }) {
            return Err(RelscanError::ScanStateError(format!(
                "scan on '{}' is already started",
                self.relation
            )));
        }
        {
            let relations = self.store.relations.read();
            let file = relations
                .get(&self.relation)
                .ok_or_else(|| HeapStore::missing(&self.relation))?;
            if let Some(pred) = &predicate {
                pred.layout.check(file.record_length)?;
            }
        }
        debug!(relation = %self.relation, filtered = predicate.is_some(), "started heap scan");
        self.state = ScanState::Scanning {
            predicate,
            page: 0,
            slot: 0,
        };
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RecordId>> {
        self.ensure_open()?;
        if !matches!(self.state, ScanState::Scanning { .. }) {
            return Err(self.not_scanning("next"));
        }
        let relations = self.store.relations.read();
        let file = relations
            .get(&self.relation)
            .ok_or_else(|| HeapStore::missing(&self.relation))?;
        let ScanState::Scanning {
            predicate,
            page,
            slot,
        } = &mut self.state
        else {
            return Ok(None);
        };

        while let Some(heap_page) = file.pages.get(*page) {
            let Some(live) = heap_page.next_live(*slot) else {
                *page += 1;
                *slot = 0;
                continue;
            };
            *slot = live + 1;
            let qualifies = match predicate {
                Some(pred) => pred.matches(heap_page.get(live)?)?,
                None => true,
            };
            if qualifies {
                return Ok(Some(RecordId::new(*page as u32, live as u16)));
            }
        }
        Ok(None)
    }

    fn fetch(&mut self, rid: RecordId) -> Result<Record> {
        self.ensure_open()?;
        if !matches!(self.state, ScanState::Scanning { .. }) {
            return Err(self.not_scanning("fetch"));
        }
        let relations = self.store.relations.read();
        let file = relations
            .get(&self.relation)
            .ok_or_else(|| HeapStore::missing(&self.relation))?;
        Ok(Record::new(file.get(rid)?.to_vec()))
    }

    fn end_scan(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !matches!(self.state, ScanState::Scanning { .. }) {
            return Err(self.not_scanning("end_scan"));
        }
        self.state = ScanState::Ended;
        debug!(relation = %self.relation, "ended heap scan");
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(relation = %self.relation, "closed heap scan");
        }
    }
}

/// Append-only insertion handle on one heap relation.
pub struct HeapInsert<'a> {
    store: &'a HeapStore,
    relation: String,
    inserted: usize,
    closed: bool,
}

impl RecordInsert for HeapInsert<'_> {
    fn insert(&mut self, record: &Record) -> Result<RecordId> {
        if self.closed {
            return Err(RelscanError::StorageError(format!(
                "insert handle on '{}' is closed",
                self.relation
            )));
        }
        let mut relations = self.store.relations.write();
        let file = relations
            .get_mut(&self.relation)
            .ok_or_else(|| HeapStore::missing(&self.relation))?;
        let rid = file.insert(record.data())?;
        self.inserted += 1;
        Ok(rid)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(relation = %self.relation, inserted = self.inserted, "closed heap insert");
        }
    }
}
