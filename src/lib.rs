//! relscan - selection-projection over fixed-length heap relations
//!
//! The core is [`executor::select_project`]: it scans one relation, keeps
//! the records matching an optional single-attribute predicate, and appends
//! their projection to a destination relation. [`Database`] bundles a
//! catalog and an in-memory heap store around it, with snapshot persistence.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod storage;
pub mod types;

use std::path::Path;

use tracing::{debug, info};

pub use catalog::{AttrDef, Catalog, RelationSchema};
pub use error::{RelscanError, Result};
pub use executor::{select_project, SelectRequest, SelectSummary};
pub use storage::{HeapStore, StorageConfig};
pub use types::{AttrType, CompareOp, Value};

use catalog::{decode_tuple, encode_tuple};
use executor::InsertLease;
use storage::snapshot;

/// Configuration for creating or opening a database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Heap storage settings.
    pub storage: StorageConfig,
    /// Reject every mutating operation (default: false).
    pub read_only: bool,
}

impl DatabaseConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage configuration.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Sets read-only mode.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// A catalog plus the heap relations it describes.
pub struct Database {
    catalog: Catalog,
    store: HeapStore,
    config: DatabaseConfig,
}

impl Database {
    /// Creates an empty database.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage configuration is invalid.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let store = HeapStore::new(config.storage.clone())?;
        Ok(Self {
            catalog: Catalog::new(),
            store,
            config,
        })
    }

    /// Loads a database from a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn open(path: &Path, config: DatabaseConfig) -> Result<Self> {
        let (catalog, store) = snapshot::read_snapshot(path, config.storage.clone())?;
        info!(
            path = %path.display(),
            relations = catalog.relation_names().len(),
            read_only = config.read_only,
            "database opened"
        );
        Ok(Self {
            catalog,
            store,
            config,
        })
    }

    /// Writes the whole database to a snapshot file, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` in read-only mode, or an I/O error.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.check_writable()?;
        snapshot::write_snapshot(path, &self.catalog, &self.store)
    }

    /// Registers a relation and allocates its heap storage.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` in read-only mode or `RelationExists` for a duplicate name.
    pub fn create_relation(&mut self, schema: RelationSchema) -> Result<()> {
        self.check_writable()?;
        if self.catalog.relation_exists(&schema.name) {
            return Err(RelscanError::RelationExists(schema.name));
        }
        self.store
            .create_relation(&schema.name, schema.record_length)?;
        debug!(relation = %schema.name, record_length = schema.record_length, "relation created");
        self.catalog.create_relation(schema)?;
        Ok(())
    }

    /// Removes a relation and its records.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` in read-only mode or `RelationNotFound`.
    pub fn drop_relation(&mut self, name: &str) -> Result<()> {
        self.check_writable()?;
        self.catalog.drop_relation(name)?;
        self.store.drop_relation(name)?;
        debug!(relation = name, "relation dropped");
        Ok(())
    }

    /// Appends one record built from `values`, one per attribute in schema order.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly`, `RelationNotFound`, or `SchemaError` for mismatched values.
    pub fn insert_values(&mut self, relation: &str, values: &[Value]) -> Result<()> {
        self.check_writable()?;
        let schema = self.schema(relation)?;
        let record = encode_tuple(schema, values)?;
        let mut insert = InsertLease::open(&self.store, relation)?;
        insert.insert(&record)?;
        insert.finish();
        Ok(())
    }

    /// Runs the selection-projection operator over this database.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` in read-only mode, otherwise see [`select_project`].
    pub fn select(&mut self, request: &SelectRequest) -> Result<SelectSummary> {
        self.check_writable()?;
        select_project(&self.catalog, &self.store, request)
    }

    /// Decodes every record of a relation, in storage order.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation does not exist.
    pub fn scan_values(&self, relation: &str) -> Result<Vec<Vec<Value>>> {
        let descriptors = self.schema(relation)?.descriptors()?;
        self.store
            .records(relation)?
            .iter()
            .map(|record| decode_tuple(&descriptors, record))
            .collect()
    }

    /// Number of records stored in a relation.
    ///
    /// # Errors
    ///
    /// Returns `RelationNotFound` if the relation does not exist.
    pub fn record_count(&self, relation: &str) -> Result<usize> {
        self.store.record_count(relation)
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &HeapStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    fn schema(&self, relation: &str) -> Result<&RelationSchema> {
        self.catalog
            .relation(relation)
            .ok_or_else(|| RelscanError::RelationNotFound(relation.to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.config.read_only {
            return Err(RelscanError::ReadOnly);
        }
        Ok(())
    }
}
