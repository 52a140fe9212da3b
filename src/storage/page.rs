//! Fixed-slot heap pages.
//!
//! Every page of a heap relation holds records of one fixed length.
//!
//! Layout:
//! ```text
//! [0..4)    record_length: u32
//! [4..8)    capacity: u32 (number of slots)
//! [8..12)   live_count: u32
//! [12..16)  checksum: u32 (CRC32 of bytes [16..page_size), written by `seal`)
//! [16..16+bitmap_len)  occupancy bitmap, 1 bit per slot
//! [slots_start..)      capacity * record_length bytes of slots
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, RelscanError};

/// Default page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Smallest page size a heap relation accepts.
pub const MIN_PAGE_SIZE: usize = 64;

/// Bytes of fixed header before the occupancy bitmap.
pub const PAGE_HEADER_SIZE: usize = 16;

/// Returns how many `record_length` slots fit into a page of `page_size` bytes.
#[must_use]
pub fn slot_capacity(page_size: usize, record_length: usize) -> usize {
    if record_length == 0 || page_size <= PAGE_HEADER_SIZE {
        return 0;
    }
    let body = page_size - PAGE_HEADER_SIZE;
    // A slot also needs a bitmap byte, so a record as long as the body never fits.
    if record_length >= body {
        return 0;
    }
    // Each slot costs its bytes plus one bitmap bit.
    let mut capacity = body.saturating_mul(8) / record_length.saturating_mul(8).saturating_add(1);
    while capacity > 0 && capacity.div_ceil(8) + capacity * record_length > body {
        capacity -= 1;
    }
    capacity
}

/// A heap page of fixed-length record slots.
#[derive(Clone, Serialize, Deserialize)]
pub struct HeapPage {
    data: Vec<u8>,
}

impl HeapPage {
    /// Creates an empty page.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if not even one record fits.
    pub fn new(page_size: usize, record_length: usize) -> Result<Self> {
        let capacity = slot_capacity(page_size, record_length);
        if capacity == 0 {
            return Err(RelscanError::PageError(format!(
                "Record length {record_length} does not fit in a {page_size}-byte page"
            )));
        }
        let mut data = vec![0u8; page_size];
        data[0..4].copy_from_slice(&(record_length as u32).to_le_bytes());
        data[4..8].copy_from_slice(&(capacity as u32).to_le_bytes());
        Ok(Self { data })
    }

    fn header_u32(&self, at: usize) -> usize {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[at..at + 4]);
        u32::from_le_bytes(word) as usize
    }

    fn set_header_u32(&mut self, at: usize, value: usize) {
        self.data[at..at + 4].copy_from_slice(&(value as u32).to_le_bytes());
    }

    /// Returns the fixed record length of this page.
    #[must_use]
    pub fn record_length(&self) -> usize {
        self.header_u32(0)
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.header_u32(4)
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.header_u32(8)
    }

    /// Returns true if every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.live_count() >= self.capacity()
    }

    fn slots_start(&self) -> usize {
        PAGE_HEADER_SIZE + self.capacity().div_ceil(8)
    }

    /// Checks if the slot holds a record.
    #[must_use]
    pub fn is_live(&self, slot: usize) -> bool {
        if slot >= self.capacity() {
            return false;
        }
        (self.data[PAGE_HEADER_SIZE + slot / 8] & (1 << (slot % 8))) != 0
    }

    fn set_live(&mut self, slot: usize, live: bool) {
        let byte = PAGE_HEADER_SIZE + slot / 8;
        if live {
            self.data[byte] |= 1 << (slot % 8);
        } else {
            self.data[byte] &= !(1 << (slot % 8));
        }
    }

    /// Stores a record in the first free slot and returns the slot index.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has the wrong length or the page is full.
    pub fn insert(&mut self, record: &[u8]) -> Result<usize> {
        let record_length = self.record_length();
        if record.len() != record_length {
            return Err(RelscanError::RecordLengthMismatch {
                expected: record_length,
                actual: record.len(),
            });
        }
        // Slots fill in order, so the live count is normally the first free slot.
        let hint = self.live_count();
        let slot = if hint < self.capacity() && !self.is_live(hint) {
            hint
        } else {
            (0..self.capacity())
                .find(|&s| !self.is_live(s))
                .ok_or_else(|| RelscanError::PageError("Page is full".into()))?
        };

        let start = self.slots_start() + slot * record_length;
        self.data[start..start + record_length].copy_from_slice(record);
        self.set_live(slot, true);
        let live = self.live_count();
        self.set_header_u32(8, live + 1);
        Ok(slot)
    }

    /// Returns the bytes of a live slot.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the slot is empty or out of range.
    pub fn get(&self, slot: usize) -> Result<&[u8]> {
        if !self.is_live(slot) {
            return Err(RelscanError::RecordNotFound(format!("slot {slot}")));
        }
        let record_length = self.record_length();
        let start = self.slots_start() + slot * record_length;
        Ok(&self.data[start..start + record_length])
    }

    /// Returns the first live slot at or after `from`.
    #[must_use]
    pub fn next_live(&self, from: usize) -> Option<usize> {
        (from..self.capacity()).find(|&s| self.is_live(s))
    }

    /// Computes the CRC32 checksum of the page body.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.data[PAGE_HEADER_SIZE..])
    }

    /// Writes the current checksum into the header.
    pub fn seal(&mut self) {
        let checksum = self.checksum();
        self.data[12..16].copy_from_slice(&checksum.to_le_bytes());
    }

    /// Checks the header against the owning relation's page size and record length.
    ///
    /// # Errors
    ///
    /// Returns `PageError` on a malformed header.
    pub fn check_header(&self, page_size: usize, record_length: usize) -> Result<()> {
        if self.data.len() != page_size
            || self.record_length() != record_length
            || self.capacity() != slot_capacity(page_size, record_length)
            || self.live_count() > self.capacity()
        {
            return Err(RelscanError::PageError(format!(
                "Malformed page header (size {}, record length {}, capacity {})",
                self.data.len(),
                self.record_length(),
                self.capacity()
            )));
        }
        Ok(())
    }

    /// Verifies the header and the body checksum written by [`HeapPage::seal`].
    ///
    /// # Errors
    ///
    /// Returns `ChecksumError` on a checksum mismatch, `PageError` on a
    /// malformed header.
    pub fn verify(&self, page_size: usize, record_length: usize) -> Result<()> {
        self.check_header(page_size, record_length)?;
        let stored = self.header_u32(12) as u32;
        let actual = self.checksum();
        if stored != actual {
            return Err(RelscanError::ChecksumError(format!(
                "page checksum {stored:#010x} does not match {actual:#010x}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage")
            .field("record_length", &self.record_length())
            .field("capacity", &self.capacity())
            .field("live_count", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_capacity_fits_page() {
        for record_length in [1, 4, 7, 20, 100, 4000] {
            let capacity = slot_capacity(PAGE_SIZE, record_length);
            assert!(capacity > 0);
            assert!(
                PAGE_HEADER_SIZE + capacity.div_ceil(8) + capacity * record_length <= PAGE_SIZE
            );
            // One more slot would not fit.
            let more = capacity + 1;
            assert!(PAGE_HEADER_SIZE + more.div_ceil(8) + more * record_length > PAGE_SIZE);
        }
        assert_eq!(slot_capacity(PAGE_SIZE, PAGE_SIZE), 0);
        assert_eq!(slot_capacity(PAGE_SIZE, 0), 0);
    }

    #[test]
    fn test_page_rejects_oversized_records() {
        assert!(HeapPage::new(64, 100).is_err());
    }

    #[test]
    fn test_huge_record_length_does_not_overflow() {
        for record_length in [usize::MAX / 4, usize::MAX / 8 + 1, usize::MAX] {
            assert_eq!(slot_capacity(PAGE_SIZE, record_length), 0);
            assert!(matches!(
                HeapPage::new(PAGE_SIZE, record_length),
                Err(RelscanError::PageError(_))
            ));
        }

        let page = HeapPage::new(PAGE_SIZE, 4).unwrap();
        assert!(matches!(
            page.check_header(PAGE_SIZE, usize::MAX / 4),
            Err(RelscanError::PageError(_))
        ));
        assert!(matches!(
            page.verify(PAGE_SIZE, usize::MAX),
            Err(RelscanError::PageError(_))
        ));
    }

    #[test]
    fn test_page_insert_and_get() {
        let mut page = HeapPage::new(PAGE_SIZE, 4).unwrap();
        assert_eq!(page.live_count(), 0);

        let a = page.insert(&[1, 2, 3, 4]).unwrap();
        let b = page.insert(&[5, 6, 7, 8]).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(page.live_count(), 2);
        assert_eq!(page.get(1).unwrap(), &[5, 6, 7, 8]);
        assert!(page.get(2).is_err());
        assert_eq!(page.next_live(0), Some(0));
        assert_eq!(page.next_live(2), None);
    }

    #[test]
    fn test_page_length_mismatch() {
        let mut page = HeapPage::new(PAGE_SIZE, 4).unwrap();
        assert!(matches!(
            page.insert(&[1, 2, 3]),
            Err(RelscanError::RecordLengthMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_page_insert_takes_slots_in_order() {
        let mut page = HeapPage::new(MIN_PAGE_SIZE, 4).unwrap();
        let slots: Vec<usize> = (0..page.capacity())
            .map(|i| page.insert(&[i as u8; 4]).unwrap())
            .collect();
        assert_eq!(slots, (0..page.capacity()).collect::<Vec<_>>());
        assert_eq!(page.get(slots.len() - 1).unwrap(), &[(slots.len() - 1) as u8; 4]);
    }

    #[test]
    fn test_page_fills_up() {
        let mut page = HeapPage::new(MIN_PAGE_SIZE, 8).unwrap();
        let capacity = page.capacity();
        for i in 0..capacity {
            page.insert(&[i as u8; 8]).unwrap();
        }
        assert!(page.is_full());
        assert!(page.insert(&[0; 8]).is_err());
    }

    #[test]
    fn test_page_checksum_verification() {
        let mut page = HeapPage::new(PAGE_SIZE, 4).unwrap();
        page.insert(&[9, 9, 9, 9]).unwrap();
        page.seal();
        assert!(page.verify(PAGE_SIZE, 4).is_ok());

        page.insert(&[1, 1, 1, 1]).unwrap();
        assert!(matches!(
            page.verify(PAGE_SIZE, 4),
            Err(RelscanError::ChecksumError(_))
        ));
        assert!(matches!(
            page.verify(PAGE_SIZE, 8),
            Err(RelscanError::PageError(_))
        ));
    }
}
