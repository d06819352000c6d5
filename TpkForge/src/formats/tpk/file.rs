//! Reading finished packages

use std::io::Cursor;
use std::path::Path;

use serde::Serialize;

use super::chunk::{Chunk, ChunkId};
use super::records::{DataOffsetEntry, DataOffsetTable, DataRaw, FileInfo, HashList, HeadLink};
use super::texture::TextureBlob;
use crate::error::{Error, Result};
use crate::formats::dds::fourcc_name;
use crate::utils::tpk_hash;

/// A parsed package: the top-level chunk sequence of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpkFile {
    pub chunks: Vec<Chunk>,
}

/// Summary of one packaged texture, as listed by `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedTexture {
    pub hash: u32,
    pub name: String,
    pub width: u16,
    pub height: u16,
    pub format: String,
    pub has_alpha: bool,
    pub usage: u32,
    pub offset: u32,
    pub length: u32,
    pub real_length: u32,
    pub memory_offset: u32,
    pub pitch: u32,
}

impl TpkFile {
    /// Wrap an already assembled chunk sequence
    #[must_use]
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Read a package from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Parse a package; the whole buffer is treated as one chunk sequence
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let chunks = Chunk::read_sequence(data, 0)?;
        tracing::debug!("parsed {} top-level chunks from {} bytes", chunks.len(), data.len());
        Ok(Self { chunks })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let capacity: u64 = self.chunks.iter().map(Chunk::encoded_len).sum();
        let mut cursor = Cursor::new(Vec::with_capacity(usize::try_from(capacity).unwrap_or(0)));
        for chunk in &self.chunks {
            chunk.write(&mut cursor)?;
        }
        Ok(cursor.into_inner())
    }

    /// First chunk with `id`, depth-first across the top-level sequence
    #[must_use]
    pub fn find(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.iter().find_map(|chunk| chunk.find(id))
    }

    pub fn file_info(&self) -> Result<&FileInfo> {
        match self.find(ChunkId::HEAD_FILE_INFO) {
            Some(Chunk::FileInfo(info)) => Ok(info),
            _ => Err(Error::MissingChunk("FileInfo")),
        }
    }

    pub fn hash_list(&self) -> Result<&HashList> {
        match self.find(ChunkId::HEAD_HASH) {
            Some(Chunk::HashList(list)) => Ok(list),
            _ => Err(Error::MissingChunk("HashList")),
        }
    }

    pub fn data_offsets(&self) -> Result<&DataOffsetTable> {
        match self.find(ChunkId::HEAD_DATA_OFFSET) {
            Some(Chunk::DataOffsets(table)) => Ok(table),
            _ => Err(Error::MissingChunk("DataOffsets")),
        }
    }

    pub fn head_link(&self) -> Result<&HeadLink> {
        match self.find(ChunkId::DATA_HEAD_LINK) {
            Some(Chunk::HeadLink(link)) => Ok(link),
            _ => Err(Error::MissingChunk("HeadLink")),
        }
    }

    pub fn data_raw(&self) -> Result<&DataRaw> {
        match self.find(ChunkId::DATA_RAW) {
            Some(Chunk::DataRaw(raw)) => Ok(raw),
            _ => Err(Error::MissingChunk("DataRaw")),
        }
    }

    /// Offset table entry for `hash`
    pub fn entry(&self, hash: u32) -> Result<&DataOffsetEntry> {
        self.data_offsets()?
            .get(hash)
            .ok_or_else(|| Error::TextureNotFound(format!("{hash:#010x}")))
    }

    /// Encoded blob bytes for `hash`
    pub fn blob_bytes(&self, hash: u32) -> Result<&[u8]> {
        let entry = self.entry(hash)?;
        self.data_raw()?
            .slice(u64::from(entry.offset), u64::from(entry.length))
    }

    /// Decoded blob for `hash`
    pub fn texture(&self, hash: u32) -> Result<TextureBlob> {
        TextureBlob::parse(self.blob_bytes(hash)?)
    }

    /// Decoded blob for a texture display name
    pub fn texture_by_name(&self, name: &str) -> Result<TextureBlob> {
        let hash = tpk_hash(name);
        match self.texture(hash) {
            Err(Error::TextureNotFound(_)) => Err(Error::TextureNotFound(name.to_string())),
            other => other,
        }
    }

    /// One summary per offset table entry, ascending by hash
    pub fn textures(&self) -> Result<Vec<PackagedTexture>> {
        let table = self.data_offsets()?;
        let raw = self.data_raw()?;

        table
            .iter()
            .map(|entry| {
                let bytes = raw.slice(u64::from(entry.offset), u64::from(entry.length))?;
                let info = TextureBlob::parse(bytes)?.info;
                Ok(PackagedTexture {
                    hash: entry.hash,
                    name: info.name,
                    width: info.width,
                    height: info.height,
                    format: fourcc_name(info.d3d_format),
                    has_alpha: info.alpha != 0,
                    usage: info.usage,
                    offset: entry.offset,
                    length: entry.length,
                    real_length: entry.real_length,
                    memory_offset: info.memory_offset,
                    pitch: info.pitch,
                })
            })
            .collect()
    }

    /// Cross-record consistency problems: hash list vs. offset table,
    /// head link vs. file info. Empty when the package is coherent.
    pub fn consistency_warnings(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let listed = &self.hash_list()?.hashes;
        let indexed: Vec<u32> = self.data_offsets()?.hashes().collect();
        if *listed != indexed {
            warnings.push(format!(
                "hash list has {} entries but the offset table indexes {} different ones",
                listed.len(),
                indexed.len()
            ));
        }

        let info = self.file_info()?;
        let link = self.head_link()?;
        if info.file_hash != link.file_hash {
            warnings.push(format!(
                "head link hash {:#010x} does not match file info hash {:#010x}",
                link.file_hash, info.file_hash
            ));
        }
        if tpk_hash(&info.path) != info.file_hash {
            warnings.push(format!(
                "file info hash {:#010x} is not the hash of '{}'",
                info.file_hash, info.path
            ));
        }

        Ok(warnings)
    }
}
