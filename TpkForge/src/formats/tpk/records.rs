//! Typed leaf records of the head and data containers

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::chunk::{CHUNK_HEADER_SIZE, ChunkBody, ChunkId};
use crate::error::{Error, Result};
use crate::formats::common::{check_fixed_string, read_fixed_string, write_fixed_string};
use crate::utils::tpk_hash;

/// `FileInfo` format version
pub const FILE_INFO_VERSION: i32 = 5;
/// Width of the package identifier field
pub const FILE_INFO_NAME_SIZE: usize = 0x1C;
/// Width of the pipeline path field
pub const FILE_INFO_PATH_SIZE: usize = 0x40;
/// Zero bytes after the path hash
const FILE_INFO_RESERVED: usize = 0x18;
/// Encoded `FileInfo` body size
pub const FILE_INFO_SIZE: usize = 4 + FILE_INFO_NAME_SIZE + FILE_INFO_PATH_SIZE + 4 + FILE_INFO_RESERVED;

/// Bytes per hash list entry (hash + zero)
pub const HASH_ENTRY_SIZE: usize = 8;
/// Bytes per offset table entry
pub const DATA_OFFSET_ENTRY_SIZE: usize = 0x18;
/// Flags word written on every offset table entry
pub const DATA_OFFSET_FLAGS: i32 = 0x100;

/// Encoded `HeadLink` body size
pub const HEAD_LINK_SIZE: usize = 0x18;
/// Constant third word of the head link
pub const HEAD_LINK_UNKNOWN: i32 = 1;

/// Error for a body shorter than its record needs
fn check_body_len(body: &[u8], needed: usize, position: u64, id: ChunkId) -> Result<()> {
    if body.len() < needed {
        return Err(Error::InvalidChunk {
            offset: position.saturating_sub(u64::from(CHUNK_HEADER_SIZE)),
            message: format!("{id} body is {} bytes, needs at least {needed}", body.len()),
        });
    }
    Ok(())
}

// ============================================================================
// FileInfo
// ============================================================================

/// Package identity: identifier, pipeline path and the path's hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub version: i32,
    /// Package identifier
    pub name: String,
    /// Pipeline path the package is registered under
    pub path: String,
    /// `tpk_hash(path)`; must equal the head link's hash
    pub file_hash: u32,
}

impl FileInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            version: FILE_INFO_VERSION,
            name: name.into(),
            file_hash: tpk_hash(&path),
            path,
        }
    }

    /// Check that both strings fit their fields
    pub fn validate(&self) -> Result<()> {
        check_fixed_string(&self.name, FILE_INFO_NAME_SIZE)?;
        check_fixed_string(&self.path, FILE_INFO_PATH_SIZE)
    }
}

impl ChunkBody for FileInfo {
    const ID: ChunkId = ChunkId::HEAD_FILE_INFO;

    fn read_body(body: &[u8], position: u64) -> Result<Self> {
        check_body_len(body, FILE_INFO_SIZE, position, Self::ID)?;
        let mut cursor = Cursor::new(body);
        let version = cursor.read_i32::<LittleEndian>()?;
        let name = read_fixed_string(&mut cursor, FILE_INFO_NAME_SIZE)?;
        let path = read_fixed_string(&mut cursor, FILE_INFO_PATH_SIZE)?;
        let file_hash = cursor.read_u32::<LittleEndian>()?;
        Ok(Self {
            version,
            name,
            path,
            file_hash,
        })
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.version)?;
        write_fixed_string(writer, &self.name, FILE_INFO_NAME_SIZE)?;
        write_fixed_string(writer, &self.path, FILE_INFO_PATH_SIZE)?;
        writer.write_u32::<LittleEndian>(self.file_hash)?;
        writer.write_all(&[0u8; FILE_INFO_RESERVED])?;
        Ok(())
    }

    fn body_len(&self) -> u64 {
        FILE_INFO_SIZE as u64
    }
}

// ============================================================================
// HashList
// ============================================================================

/// Texture hashes, one `(hash, 0)` pair each
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashList {
    pub hashes: Vec<u32>,
}

impl HashList {
    #[must_use]
    pub fn new(hashes: Vec<u32>) -> Self {
        Self { hashes }
    }
}

impl ChunkBody for HashList {
    const ID: ChunkId = ChunkId::HEAD_HASH;

    fn read_body(body: &[u8], _position: u64) -> Result<Self> {
        let hashes = body
            .chunks_exact(HASH_ENTRY_SIZE)
            .map(|entry| u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]))
            .collect();
        Ok(Self { hashes })
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &hash in &self.hashes {
            writer.write_u32::<LittleEndian>(hash)?;
            writer.write_i32::<LittleEndian>(0)?;
        }
        Ok(())
    }

    fn body_len(&self) -> u64 {
        (self.hashes.len() * HASH_ENTRY_SIZE) as u64
    }
}

// ============================================================================
// DataOffsets
// ============================================================================

/// Location of one texture blob in the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataOffsetEntry {
    pub hash: u32,
    /// Absolute file offset of the blob
    pub offset: u32,
    /// Blob length in bytes
    pub length: u32,
    /// Blob length minus its 0x10-byte header
    pub real_length: u32,
    pub flags: i32,
}

impl DataOffsetEntry {
    #[must_use]
    pub fn new(hash: u32, offset: u32, length: u32, real_length: u32) -> Self {
        Self {
            hash,
            offset,
            length,
            real_length,
            flags: DATA_OFFSET_FLAGS,
        }
    }
}

/// Offset table keyed by texture hash; iteration is ascending by hash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataOffsetTable {
    entries: BTreeMap<u32, DataOffsetEntry>,
}

impl DataOffsetTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A second entry for the same hash is rejected.
    pub fn insert(&mut self, entry: DataOffsetEntry) -> Result<()> {
        match self.entries.entry(entry.hash) {
            Entry::Occupied(existing) => Err(Error::DuplicateHash {
                hash: entry.hash,
                first: format!("entry at {:#x}", existing.get().offset),
                second: format!("entry at {:#x}", entry.offset),
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, hash: u32) -> Option<&DataOffsetEntry> {
        self.entries.get(&hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataOffsetEntry> {
        self.entries.values()
    }

    /// Hashes in ascending order
    pub fn hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ChunkBody for DataOffsetTable {
    const ID: ChunkId = ChunkId::HEAD_DATA_OFFSET;

    fn read_body(body: &[u8], _position: u64) -> Result<Self> {
        let mut table = Self::new();
        for raw in body.chunks_exact(DATA_OFFSET_ENTRY_SIZE) {
            let mut cursor = Cursor::new(raw);
            let hash = cursor.read_u32::<LittleEndian>()?;
            let offset = cursor.read_u32::<LittleEndian>()?;
            let length = cursor.read_u32::<LittleEndian>()?;
            let real_length = cursor.read_u32::<LittleEndian>()?;
            let flags = cursor.read_i32::<LittleEndian>()?;
            table.insert(DataOffsetEntry {
                hash,
                offset,
                length,
                real_length,
                flags,
            })?;
        }
        Ok(table)
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in self.iter() {
            writer.write_u32::<LittleEndian>(entry.hash)?;
            writer.write_u32::<LittleEndian>(entry.offset)?;
            writer.write_u32::<LittleEndian>(entry.length)?;
            writer.write_u32::<LittleEndian>(entry.real_length)?;
            writer.write_i32::<LittleEndian>(entry.flags)?;
            writer.write_i32::<LittleEndian>(0)?;
        }
        Ok(())
    }

    fn body_len(&self) -> u64 {
        (self.entries.len() * DATA_OFFSET_ENTRY_SIZE) as u64
    }
}

// ============================================================================
// HeadLink
// ============================================================================

/// First child of the data container; carries the package path hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadLink {
    pub unknown: i32,
    pub file_hash: u32,
}

impl HeadLink {
    #[must_use]
    pub fn new(file_hash: u32) -> Self {
        Self {
            unknown: HEAD_LINK_UNKNOWN,
            file_hash,
        }
    }
}

impl ChunkBody for HeadLink {
    const ID: ChunkId = ChunkId::DATA_HEAD_LINK;

    fn read_body(body: &[u8], position: u64) -> Result<Self> {
        check_body_len(body, HEAD_LINK_SIZE, position, Self::ID)?;
        let mut cursor = Cursor::new(body);
        cursor.set_position(8);
        let unknown = cursor.read_i32::<LittleEndian>()?;
        let file_hash = cursor.read_u32::<LittleEndian>()?;
        Ok(Self { unknown, file_hash })
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(self.unknown)?;
        writer.write_u32::<LittleEndian>(self.file_hash)?;
        writer.write_i32::<LittleEndian>(0)?;
        writer.write_i32::<LittleEndian>(0)?;
        Ok(())
    }

    fn body_len(&self) -> u64 {
        HEAD_LINK_SIZE as u64
    }
}

// ============================================================================
// DataRaw
// ============================================================================

/// The raw texture data region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRaw {
    pub data: Vec<u8>,
    /// Absolute file offset of `data[0]`, when known
    position: Option<u64>,
}

impl DataRaw {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: None,
        }
    }

    /// Raw data that will sit at a known absolute offset
    #[must_use]
    pub fn at_position(data: Vec<u8>, position: u64) -> Self {
        Self {
            data,
            position: Some(position),
        }
    }

    #[must_use]
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Bytes at absolute file `offset`
    pub fn slice(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let base = self.position.ok_or_else(|| Error::InvalidChunk {
            offset,
            message: "raw data has no known file position".to_string(),
        })?;
        let out_of_range = || Error::InvalidChunk {
            offset,
            message: format!(
                "{length} bytes at {offset:#x} fall outside raw data {base:#x}..{:#x}",
                base + self.data.len() as u64
            ),
        };

        let start = offset.checked_sub(base).ok_or_else(out_of_range)?;
        let end = start.checked_add(length).ok_or_else(out_of_range)?;
        if end > self.data.len() as u64 {
            return Err(out_of_range());
        }
        Ok(&self.data[start as usize..end as usize])
    }
}

impl ChunkBody for DataRaw {
    const ID: ChunkId = ChunkId::DATA_RAW;

    fn read_body(body: &[u8], position: u64) -> Result<Self> {
        Ok(Self::at_position(body.to_vec(), position))
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn body_len(&self) -> u64 {
        self.data.len() as u64
    }
}

// ============================================================================
// Null
// ============================================================================

/// Zero filler; content is not meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullChunk {
    pub length: u32,
}

impl NullChunk {
    #[must_use]
    pub fn new(length: u32) -> Self {
        Self { length }
    }
}

impl ChunkBody for NullChunk {
    const ID: ChunkId = ChunkId::NULL;

    fn read_body(body: &[u8], position: u64) -> Result<Self> {
        let length = u32::try_from(body.len()).map_err(|_| Error::InvalidChunk {
            offset: position,
            message: "null chunk larger than 4 GiB".to_string(),
        })?;
        Ok(Self { length })
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        std::io::copy(&mut std::io::repeat(0).take(u64::from(self.length)), writer)?;
        Ok(())
    }

    fn body_len(&self) -> u64 {
        u64::from(self.length)
    }
}
