//! Global layout: hash order, data offsets and raw buffer placement
//!
//! The head section's size depends only on the texture count, so every
//! offset is known before anything is written:
//!
//! ```text
//! header_bytes = 0xDC + n * 0x20          end of the head container
//! pad_to_data  = 0x80 - (header_bytes + 8) % 0x80
//! data_base    = header_bytes + 8 + pad_to_data + 0x100
//! ```
//!
//! Blobs follow `data_base` in ascending hash order, each start rounded up
//! to 0x40.

use crate::error::{Error, Result};
use crate::formats::common::align_up;
use crate::formats::tpk::{
    CHUNK_HEADER_SIZE, DATA_OFFSET_ENTRY_SIZE, DataOffsetEntry, DataOffsetTable, HASH_ENTRY_SIZE,
    TEXTURE_BLOB_HEADER_SIZE,
};

/// Bytes before the head container's variable part: root header, leading
/// null, head header, file info, and the hash list / offset table headers
pub const HEADER_BASE_SIZE: u64 = 0xDC;
/// Head bytes added per texture (hash entry + offset entry)
pub const HEADER_PER_TEXTURE: u64 = (HASH_ENTRY_SIZE + DATA_OFFSET_ENTRY_SIZE) as u64;
/// Alignment of the data container
pub const DATA_ALIGNMENT: u64 = 0x80;
/// Distance from the data container to the first blob
pub const DATA_PREFIX: u64 = 0x100;
/// Alignment of every blob after the first
pub const BLOB_ALIGNMENT: u64 = 0x40;
/// Leading zero bytes of the raw buffer before `data_base`
pub const RAW_PREFIX: u64 = 0x78;
/// Body size of the null chunk that opens the root
pub const ROOT_NULL_SIZE: u32 = 0x30;
/// Body size of the null chunk between head link and raw data
pub const DATA_NULL_SIZE: u32 = 0x50;

/// A texture in layout order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureLayoutRecord {
    pub hash: u32,
    /// Absolute file offset, filled in by [`LayoutPlan::assign`]
    pub offset: u32,
    pub compressed_length: u32,
    pub real_length: u32,
    /// Encoded blob
    pub blob: Vec<u8>,
    /// Display name, for error messages
    pub name: String,
}

impl TextureLayoutRecord {
    /// Record for an encoded blob; lengths come from the blob itself
    pub fn new(hash: u32, name: impl Into<String>, blob: Vec<u8>) -> Result<Self> {
        let compressed_length = u32::try_from(blob.len()).map_err(|_| Error::ChunkTooLarge {
            size: blob.len() as u64,
        })?;
        let real_length = compressed_length
            .checked_sub(TEXTURE_BLOB_HEADER_SIZE as u32)
            .ok_or_else(|| Error::InvalidTextureBlob {
                message: format!("blob of {compressed_length} bytes has no header"),
            })?;
        Ok(Self {
            hash,
            offset: 0,
            compressed_length,
            real_length,
            blob,
            name: name.into(),
        })
    }

    #[must_use]
    pub fn offset_entry(&self) -> DataOffsetEntry {
        DataOffsetEntry::new(self.hash, self.offset, self.compressed_length, self.real_length)
    }
}

/// Sort records by hash; two records with one hash are an error
pub fn sort_by_hash(records: &mut [TextureLayoutRecord]) -> Result<()> {
    records.sort_by_key(|r| r.hash);
    if let Some(pair) = records.windows(2).find(|w| w[0].hash == w[1].hash) {
        return Err(Error::DuplicateHash {
            hash: pair[0].hash,
            first: pair[0].name.clone(),
            second: pair[1].name.clone(),
        });
    }
    Ok(())
}

/// Computed sizes and offsets for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub count: usize,
    /// End of the head container
    pub header_bytes: u64,
    /// Body size of the null chunk before the data container
    pub pad_to_data: u32,
    /// Absolute offset of the first blob
    pub data_base: u64,
    /// Cursor after the last blob, rounded to [`BLOB_ALIGNMENT`]
    pub data_end: u64,
}

impl LayoutPlan {
    /// Offsets that depend only on the texture count
    #[must_use]
    pub fn for_count(count: usize) -> Self {
        let header_bytes = HEADER_BASE_SIZE + count as u64 * HEADER_PER_TEXTURE;
        let pad_to_data =
            DATA_ALIGNMENT - (header_bytes + u64::from(CHUNK_HEADER_SIZE)) % DATA_ALIGNMENT;
        let data_base = header_bytes + u64::from(CHUNK_HEADER_SIZE) + pad_to_data + DATA_PREFIX;
        Self {
            count,
            header_bytes,
            // Always in 1..=0x80
            pad_to_data: pad_to_data as u32,
            data_base,
            data_end: data_base,
        }
    }

    /// Assign offsets to hash-sorted records and return the finished plan
    pub fn assign(records: &mut [TextureLayoutRecord]) -> Result<Self> {
        let mut plan = Self::for_count(records.len());
        let mut cursor = plan.data_base;
        for record in records.iter_mut() {
            record.offset = u32::try_from(cursor).map_err(|_| Error::ChunkTooLarge { size: cursor })?;
            cursor = align_up(cursor + u64::from(record.compressed_length), BLOB_ALIGNMENT);
        }
        plan.data_end = cursor;
        plan.verify(records)?;
        Ok(plan)
    }

    /// Check the assigned offsets: ascending hashes, increasing and
    /// non-overlapping offsets, 0x40 alignment after the first, all inside
    /// `data_base..data_end`
    pub fn verify(&self, records: &[TextureLayoutRecord]) -> Result<()> {
        let fail = |message: String| Err(Error::LayoutInvariant { message });

        if records.len() != self.count {
            return fail(format!("{} records for a plan of {}", records.len(), self.count));
        }
        if self.data_base % BLOB_ALIGNMENT != 0 || (self.data_base - DATA_PREFIX) % DATA_ALIGNMENT != 0 {
            return fail(format!("data base {:#x} is misaligned", self.data_base));
        }

        let mut previous: Option<&TextureLayoutRecord> = None;
        for record in records {
            let offset = u64::from(record.offset);
            let end = offset + u64::from(record.compressed_length);
            if offset < self.data_base || end > self.data_end {
                return fail(format!(
                    "'{}' at {offset:#x}..{end:#x} is outside {:#x}..{:#x}",
                    record.name, self.data_base, self.data_end
                ));
            }
            if let Some(prev) = previous {
                if prev.hash >= record.hash {
                    return fail(format!("'{}' is not in ascending hash order", record.name));
                }
                if u64::from(prev.offset) + u64::from(prev.compressed_length) > offset {
                    return fail(format!("'{}' overlaps '{}'", record.name, prev.name));
                }
                if offset % BLOB_ALIGNMENT != 0 {
                    return fail(format!("'{}' at {offset:#x} is not 0x40 aligned", record.name));
                }
            }
            previous = Some(record);
        }
        Ok(())
    }

    /// Absolute offset of the raw buffer's first byte
    #[must_use]
    pub fn raw_position(&self) -> u64 {
        self.data_base - RAW_PREFIX
    }

    /// Size of the raw buffer
    #[must_use]
    pub fn raw_len(&self) -> u64 {
        self.data_end - self.data_base + RAW_PREFIX
    }

    /// Zeroed raw buffer with every blob copied to its offset
    pub fn build_raw(&self, records: &[TextureLayoutRecord]) -> Result<Vec<u8>> {
        let len = usize::try_from(self.raw_len()).map_err(|_| Error::ChunkTooLarge {
            size: self.raw_len(),
        })?;
        let mut raw = vec![0u8; len];
        let base = self.raw_position();
        for record in records {
            let start = (u64::from(record.offset) - base) as usize;
            let end = start + record.blob.len();
            let Some(slot) = raw.get_mut(start..end) else {
                return Err(Error::LayoutInvariant {
                    message: format!("'{}' does not fit the raw buffer", record.name),
                });
            };
            slot.copy_from_slice(&record.blob);
        }
        Ok(raw)
    }

    /// Offset table for the assigned records
    pub fn offset_table(records: &[TextureLayoutRecord]) -> Result<DataOffsetTable> {
        let mut table = DataOffsetTable::new();
        for record in records {
            table.insert(record.offset_entry())?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(hash: u32, len: usize) -> TextureLayoutRecord {
        TextureLayoutRecord::new(hash, format!("T{hash}"), vec![hash as u8; len]).unwrap()
    }

    #[test]
    fn test_plan_for_one_texture() {
        let plan = LayoutPlan::for_count(1);
        assert_eq!(plan.header_bytes, 0xFC);
        assert_eq!(plan.pad_to_data, 0x7C);
        assert_eq!(plan.data_base, 0x280);
    }

    #[test]
    fn test_plan_data_alignment() {
        for count in 0..64 {
            let plan = LayoutPlan::for_count(count);
            assert!(plan.pad_to_data >= 1 && plan.pad_to_data <= 0x80);
            assert_eq!((plan.header_bytes + 8 + u64::from(plan.pad_to_data)) % 0x80, 0);
            assert_eq!(plan.data_base % 0x80, 0);
        }
    }

    #[test]
    fn test_offsets_are_aligned_and_ordered() {
        let mut records = vec![record(3, 0x1AC), record(1, 0x50), record(2, 0x40)];
        sort_by_hash(&mut records).unwrap();
        let plan = LayoutPlan::assign(&mut records).unwrap();

        let offsets: Vec<u32> = records.iter().map(|r| r.offset).collect();
        let base = plan.data_base as u32;
        assert_eq!(offsets, vec![base, base + 0x80, base + 0xC0]);
        assert_eq!(plan.data_end, u64::from(base) + 0xC0 + 0x1C0);
        assert_eq!(records[0].real_length, 0x40);
    }

    #[test]
    fn test_duplicate_hash() {
        let mut records = vec![record(9, 0x20), record(4, 0x20), record(9, 0x20)];
        let err = sort_by_hash(&mut records).unwrap_err();
        assert!(matches!(err, Error::DuplicateHash { hash: 9, .. }));
    }

    #[test]
    fn test_raw_buffer_placement() {
        let mut records = vec![record(1, 0x30), record(2, 0x20)];
        let plan = LayoutPlan::assign(&mut records).unwrap();
        let raw = plan.build_raw(&records).unwrap();

        assert_eq!(raw.len() as u64, plan.raw_len());
        assert_eq!(raw.len() as u64, 0x78 + 0x40 + 0x40);
        assert!(raw[..0x78].iter().all(|&b| b == 0));
        assert_eq!(&raw[0x78..0xA8], &[1u8; 0x30]);
        assert!(raw[0xA8..0xB8].iter().all(|&b| b == 0));
        assert_eq!(&raw[0xB8..0xD8], &[2u8; 0x20]);
    }

    #[test]
    fn test_verify_catches_overlap() {
        let mut records = vec![record(1, 0x80), record(2, 0x20)];
        let plan = LayoutPlan::assign(&mut records).unwrap();
        records[1].offset -= 0x40;
        assert!(matches!(plan.verify(&records), Err(Error::LayoutInvariant { .. })));
    }

    #[test]
    fn test_empty_package() {
        let plan = LayoutPlan::assign(&mut []).unwrap();
        assert_eq!(plan.data_end, plan.data_base);
        assert_eq!(plan.raw_len(), RAW_PREFIX);
        assert!(LayoutPlan::offset_table(&[]).unwrap().is_empty());
    }
}
