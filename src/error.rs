//! Error types for relscan operations.

use thiserror::Error;

/// Result type alias using [`RelscanError`].
pub type Result<T> = std::result::Result<T, RelscanError>;

/// Error types for relscan operations.
#[derive(Debug, Error)]
pub enum RelscanError {
    // ==================== Select Operator Errors ====================
    /// A projection or filter attribute is not in the catalog.
    #[error("Attribute not found: {relation}.{attribute}")]
    AttributeNotFound { relation: String, attribute: String },

    /// A filter literal could not be parsed as the attribute's type.
    #[error("Cannot parse literal '{literal}' as {attr_type}: {reason}")]
    LiteralParseFailed {
        literal: String,
        attr_type: &'static str,
        reason: String,
    },

    /// The catalog recorded a type code with no parse/compare semantics.
    #[error("Unsupported attribute type code {type_code} for {relation}.{attribute}")]
    UnsupportedType {
        relation: String,
        attribute: String,
        type_code: u8,
    },

    /// The destination relation could not be opened for insertion.
    #[error("Failed to open output relation '{relation}': {source}")]
    OutputOpenFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    /// The source relation could not be opened for scanning.
    #[error("Failed to open source relation '{relation}': {source}")]
    SourceOpenFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    /// The scan over the source relation could not be started.
    #[error("Failed to start scan on '{relation}': {source}")]
    ScanStartFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    /// Advancing the scan or fetching the current record failed.
    #[error("Failed to read from '{relation}': {source}")]
    ScanReadFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    /// Inserting an assembled record into the destination failed.
    #[error("Failed to insert into '{relation}': {source}")]
    InsertFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    /// Ending an exhausted scan failed.
    #[error("Failed to end scan on '{relation}': {source}")]
    ScanEndFailed {
        relation: String,
        #[source]
        source: Box<RelscanError>,
    },

    // ==================== Catalog Errors ====================
    /// Relation is not known to the catalog or the storage engine.
    #[error("Relation not found: {0}")]
    RelationNotFound(String),

    /// Relation with the same name already exists.
    #[error("Relation already exists: {0}")]
    RelationExists(String),

    /// Schema definition or request shape is invalid.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A field does not fit inside its record.
    #[error("Layout violation: field at offset {offset} with length {length} exceeds record length {record_length}")]
    LayoutViolation {
        offset: usize,
        length: usize,
        record_length: usize,
    },

    /// Catalog persistence errors.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    // ==================== Storage Errors ====================
    /// No live record at the given locator.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A record does not match the relation's fixed record length.
    #[error("Record length mismatch: expected {expected} bytes, got {actual}")]
    RecordLengthMismatch { expected: usize, actual: usize },

    /// A scan handle was used out of order (e.g. `next` before `start_scan`).
    #[error("Scan state error: {0}")]
    ScanStateError(String),

    /// Page-related errors.
    #[error("Page error: {0}")]
    PageError(String),

    /// General storage errors.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The database is open in read-only mode.
    #[error("Database is read-only")]
    ReadOnly,

    // ==================== Persistence Errors ====================
    /// Checksum validation failure.
    #[error("Checksum mismatch: {0}")]
    ChecksumError(String),

    /// Snapshot file is truncated or has the wrong magic bytes.
    #[error("Invalid snapshot file: {0}")]
    InvalidSnapshot(String),

    /// Unsupported snapshot format version.
    #[error("Unsupported snapshot version: {version} (max supported: {max_supported})")]
    UnsupportedVersion { version: u32, max_supported: u32 },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelscanError {
    /// Returns true for the operator-level variants that wrap a collaborator failure.
    #[must_use]
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            RelscanError::OutputOpenFailed { .. }
                | RelscanError::SourceOpenFailed { .. }
                | RelscanError::ScanStartFailed { .. }
                | RelscanError::ScanReadFailed { .. }
                | RelscanError::InsertFailed { .. }
                | RelscanError::ScanEndFailed { .. }
        )
    }
}
