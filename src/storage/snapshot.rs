//! Snapshot persistence for a catalog and its heap relations.
//!
//! File layout:
//! ```text
//! [0..8)    magic "RELSCAN\0"
//! [8..12)   version: u32 LE
//! [12..16)  CRC32 of the payload: u32 LE
//! [16..24)  payload length: u64 LE
//! [24..)    bincode payload (catalog + heap relations)
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{Result, RelscanError};
use crate::storage::{HeapFile, HeapStore, StorageConfig};

/// Magic bytes for snapshot file identification.
pub const MAGIC_BYTES: &[u8; 8] = b"RELSCAN\0";

/// Current snapshot format version.
pub const CURRENT_VERSION: u32 = 1;

/// Size of the fixed snapshot header.
pub const HEADER_SIZE: usize = 24;

/// Fixed-size header in front of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub checksum: u32,
    pub payload_len: u64,
}

impl SnapshotHeader {
    /// Creates a header describing `payload`.
    #[must_use]
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: CURRENT_VERSION,
            checksum: crc32fast::hash(payload),
            payload_len: payload.len() as u64,
        }
    }

    /// Encodes the header into its fixed byte form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&self.magic);
        out[8..12].copy_from_slice(&self.version.to_le_bytes());
        out[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        out[16..24].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    /// Decodes and validates a header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSnapshot` for a short buffer or wrong magic bytes, and
    /// `UnsupportedVersion` for a newer format.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header: &[u8; HEADER_SIZE] = data
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| {
                RelscanError::InvalidSnapshot(format!(
                    "file is {} bytes, shorter than the {HEADER_SIZE}-byte header",
                    data.len()
                ))
            })?;

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&header[0..8]);
        if magic != *MAGIC_BYTES {
            return Err(RelscanError::InvalidSnapshot("bad magic bytes".into()));
        }

        let mut word = [0u8; 4];
        word.copy_from_slice(&header[8..12]);
        let version = u32::from_le_bytes(word);
        if version > CURRENT_VERSION {
            return Err(RelscanError::UnsupportedVersion {
                version,
                max_supported: CURRENT_VERSION,
            });
        }
        word.copy_from_slice(&header[12..16]);
        let checksum = u32::from_le_bytes(word);

        let mut len = [0u8; 8];
        len.copy_from_slice(&header[16..24]);

        Ok(Self {
            magic,
            version,
            checksum,
            payload_len: u64::from_le_bytes(len),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    catalog: Catalog,
    relations: HashMap<String, HeapFile>,
}

/// Encodes a catalog and every heap relation into snapshot bytes.
///
/// # Errors
///
/// Returns `StorageError` if serialization fails.
pub fn encode(catalog: &Catalog, store: &HeapStore) -> Result<Vec<u8>> {
    let payload = SnapshotPayload {
        catalog: catalog.clone(),
        relations: store.sealed_relations(),
    };
    let body = bincode::serialize(&payload)
        .map_err(|e| RelscanError::StorageError(format!("Failed to serialize snapshot: {e}")))?;

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&SnapshotHeader::for_payload(&body).to_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decodes snapshot bytes into a catalog and a heap store.
///
/// # Errors
///
/// Returns an error if the header is invalid, the payload is truncated, the
/// checksum does not match (when verification is enabled), or the catalog
/// and heap relations disagree.
pub fn decode(data: &[u8], config: StorageConfig) -> Result<(Catalog, HeapStore)> {
    let header = SnapshotHeader::from_bytes(data)?;
    let body = &data[HEADER_SIZE..];
    if body.len() as u64 != header.payload_len {
        return Err(RelscanError::InvalidSnapshot(format!(
            "payload is {} bytes, header says {}",
            body.len(),
            header.payload_len
        )));
    }
    if config.verify_checksums {
        let actual = crc32fast::hash(body);
        if actual != header.checksum {
            return Err(RelscanError::ChecksumError(format!(
                "snapshot checksum {:#010x} does not match {actual:#010x}",
                header.checksum
            )));
        }
    }

    let payload: SnapshotPayload = bincode::deserialize(body).map_err(|e| {
        RelscanError::InvalidSnapshot(format!("Failed to deserialize snapshot: {e}"))
    })?;

    for name in payload.catalog.relation_names() {
        let (Some(schema), Some(file)) =
            (payload.catalog.relation(name), payload.relations.get(name))
        else {
            return Err(RelscanError::InvalidSnapshot(format!(
                "catalog relation '{name}' has no heap data"
            )));
        };
        if schema.record_length != file.record_length() {
            return Err(RelscanError::InvalidSnapshot(format!(
                "relation '{name}' record length {} disagrees with catalog ({})",
                file.record_length(),
                schema.record_length
            )));
        }
    }
    if let Some(orphan) = payload
        .relations
        .keys()
        .find(|name| !payload.catalog.relation_exists(name))
    {
        return Err(RelscanError::InvalidSnapshot(format!(
            "heap relation '{orphan}' is missing from the catalog"
        )));
    }

    let store = HeapStore::from_relations(config, payload.relations)?;
    Ok((payload.catalog, store))
}

/// Writes a snapshot file, replacing any existing file at `path`.
///
/// # Errors
///
/// Returns an error if encoding or any file operation fails.
pub fn write_snapshot(path: &Path, catalog: &Catalog, store: &HeapStore) -> Result<()> {
    let bytes = encode(catalog, store)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote snapshot");
    Ok(())
}

/// Reads a snapshot file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_snapshot(path: &Path, config: StorageConfig) -> Result<(Catalog, HeapStore)> {
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read snapshot");
    decode(&bytes, config)
}
