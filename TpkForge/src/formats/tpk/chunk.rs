//! Generic chunk tree codec
//!
//! Writing emits the header with a placeholder length, writes the body, then
//! seeks back and patches in the measured length. Reading walks a byte slice:
//! each child body is handed to its codec as a sub-slice, and the cursor always
//! advances by the declared length, whatever the codec consumed.

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::records::{DataOffsetTable, DataRaw, FileInfo, HashList, HeadLink, NullChunk};
use crate::error::{Error, Result};

/// Size of a chunk header (id + length)
pub const CHUNK_HEADER_SIZE: u32 = 8;

/// 32-bit chunk identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u32);

impl ChunkId {
    /// Root of a texture package
    pub const TEXTURE_ROOT: Self = Self(0xB330_0000);
    /// Head container (file info, hash list, offset table)
    pub const HEAD: Self = Self(0xB331_0000);
    pub const HEAD_FILE_INFO: Self = Self(0x3331_0001);
    pub const HEAD_HASH: Self = Self(0x3331_0002);
    pub const HEAD_DATA_OFFSET: Self = Self(0x3331_0003);
    /// Data container (head link, raw texture data)
    pub const DATA: Self = Self(0xB332_0000);
    pub const DATA_HEAD_LINK: Self = Self(0x3332_0001);
    pub const DATA_RAW: Self = Self(0x3332_0002);
    /// Filler / alignment padding
    pub const NULL: Self = Self(0);

    /// Bit marking a chunk whose body is a sequence of chunks
    pub const CONTAINER_BIT: u32 = 0x8000_0000;

    /// Whether the high "container" bit is set
    #[must_use]
    pub const fn has_container_bit(self) -> bool {
        self.0 & Self::CONTAINER_BIT != 0
    }

    /// Human-readable name for known ids
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::TEXTURE_ROOT => Some("TextureRoot"),
            Self::HEAD => Some("Head"),
            Self::HEAD_FILE_INFO => Some("FileInfo"),
            Self::HEAD_HASH => Some("HashList"),
            Self::HEAD_DATA_OFFSET => Some("DataOffsets"),
            Self::DATA => Some("Data"),
            Self::DATA_HEAD_LINK => Some("HeadLink"),
            Self::DATA_RAW => Some("DataRaw"),
            Self::NULL => Some("Null"),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({:#010x})", self.0),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// Chunk header: id and body length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: ChunkId,
    pub length: u32,
}

impl ChunkHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let id = ChunkId(reader.read_u32::<LittleEndian>()?);
        let length = reader.read_u32::<LittleEndian>()?;
        Ok(Self { id, length })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.id.0)?;
        writer.write_u32::<LittleEndian>(self.length)?;
        Ok(())
    }
}

/// Codec for a typed leaf chunk body
pub trait ChunkBody: Sized {
    /// The id this body is stored under
    const ID: ChunkId;

    /// Decode from the body bytes. `position` is the absolute offset of
    /// `body[0]` within the file.
    fn read_body(body: &[u8], position: u64) -> Result<Self>;

    /// Encode the body (without header)
    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Encoded body size in bytes
    fn body_len(&self) -> u64;
}

/// A container chunk and its children, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: ChunkId,
    pub children: Vec<Chunk>,
}

impl Container {
    #[must_use]
    pub fn new(id: ChunkId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Append a child chunk
    pub fn push(&mut self, child: impl Into<Chunk>) {
        self.children.push(child.into());
    }

    /// Builder-style [`Container::push`]
    #[must_use]
    pub fn with(mut self, child: impl Into<Chunk>) -> Self {
        self.push(child);
        self
    }
}

/// A leaf with an id nothing here knows how to decode; bytes are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
}

/// One node of the chunk tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Container(Container),
    FileInfo(FileInfo),
    HashList(HashList),
    DataOffsets(DataOffsetTable),
    HeadLink(HeadLink),
    DataRaw(DataRaw),
    Null(NullChunk),
    Unknown(UnknownChunk),
}

/// What a chunk id decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkKind {
    Container,
    FileInfo,
    HashList,
    DataOffsets,
    HeadLink,
    DataRaw,
    Null,
    Opaque,
}

/// Explicit id table first, then the high-bit rule, then opaque
fn classify(id: ChunkId) -> ChunkKind {
    match id {
        ChunkId::TEXTURE_ROOT | ChunkId::HEAD | ChunkId::DATA => ChunkKind::Container,
        ChunkId::HEAD_FILE_INFO => ChunkKind::FileInfo,
        ChunkId::HEAD_HASH => ChunkKind::HashList,
        ChunkId::HEAD_DATA_OFFSET => ChunkKind::DataOffsets,
        ChunkId::DATA_HEAD_LINK => ChunkKind::HeadLink,
        ChunkId::DATA_RAW => ChunkKind::DataRaw,
        ChunkId::NULL => ChunkKind::Null,
        other if other.has_container_bit() => ChunkKind::Container,
        _ => ChunkKind::Opaque,
    }
}

impl Chunk {
    /// The id written in this chunk's header
    #[must_use]
    pub fn id(&self) -> ChunkId {
        match self {
            Chunk::Container(c) => c.id,
            Chunk::FileInfo(_) => FileInfo::ID,
            Chunk::HashList(_) => HashList::ID,
            Chunk::DataOffsets(_) => DataOffsetTable::ID,
            Chunk::HeadLink(_) => HeadLink::ID,
            Chunk::DataRaw(_) => DataRaw::ID,
            Chunk::Null(_) => ChunkId::NULL,
            Chunk::Unknown(u) => u.id,
        }
    }

    /// Encoded body size (excluding this chunk's own header)
    #[must_use]
    pub fn body_len(&self) -> u64 {
        match self {
            Chunk::Container(c) => c
                .children
                .iter()
                .map(|child| u64::from(CHUNK_HEADER_SIZE) + child.body_len())
                .sum(),
            Chunk::FileInfo(r) => r.body_len(),
            Chunk::HashList(r) => r.body_len(),
            Chunk::DataOffsets(r) => r.body_len(),
            Chunk::HeadLink(r) => r.body_len(),
            Chunk::DataRaw(r) => r.body_len(),
            Chunk::Null(n) => u64::from(n.length),
            Chunk::Unknown(u) => u.data.len() as u64,
        }
    }

    /// Encoded size including the header
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        u64::from(CHUNK_HEADER_SIZE) + self.body_len()
    }

    /// Children of a container, empty for leaves
    #[must_use]
    pub fn children(&self) -> &[Chunk] {
        match self {
            Chunk::Container(c) => &c.children,
            _ => &[],
        }
    }

    /// Depth-first search for the first chunk with `id` (including `self`)
    #[must_use]
    pub fn find(&self, id: ChunkId) -> Option<&Chunk> {
        if self.id() == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Write header and body, backpatching the length
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.id().0)?;
        let length_pos = writer.stream_position()?;
        writer.write_u32::<LittleEndian>(0)?; // Placeholder length

        let body_start = writer.stream_position()?;
        self.write_body(writer)?;
        let end_pos = writer.stream_position()?;

        let size = end_pos - body_start;
        let length = u32::try_from(size).map_err(|_| Error::ChunkTooLarge { size })?;

        writer.seek(SeekFrom::Start(length_pos))?;
        writer.write_u32::<LittleEndian>(length)?;
        writer.seek(SeekFrom::Start(end_pos))?;
        Ok(())
    }

    fn write_body<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        match self {
            Chunk::Container(c) => {
                for child in &c.children {
                    child.write(writer)?;
                }
                Ok(())
            }
            Chunk::FileInfo(r) => r.write_body(writer),
            Chunk::HashList(r) => r.write_body(writer),
            Chunk::DataOffsets(r) => r.write_body(writer),
            Chunk::HeadLink(r) => r.write_body(writer),
            Chunk::DataRaw(r) => r.write_body(writer),
            Chunk::Null(n) => n.write_body(writer),
            Chunk::Unknown(u) => {
                writer.write_all(&u.data)?;
                Ok(())
            }
        }
    }

    /// Decode a sequence of sibling chunks that exactly fills `data`.
    ///
    /// `base` is the absolute file offset of `data[0]`.
    pub fn read_sequence(data: &[u8], base: u64) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut pos = 0usize;
        let header_size = CHUNK_HEADER_SIZE as usize;

        while pos < data.len() {
            let offset = base + pos as u64;
            if data.len() - pos < header_size {
                return Err(Error::InvalidChunk {
                    offset,
                    message: format!("{} trailing bytes cannot hold a chunk header", data.len() - pos),
                });
            }

            let header = ChunkHeader::read(&mut &data[pos..pos + header_size])?;
            let body_start = pos + header_size;
            let body_end = body_start
                .checked_add(header.length as usize)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| Error::InvalidChunk {
                    offset,
                    message: format!(
                        "{} declares {} bytes but only {} remain in its parent",
                        header.id,
                        header.length,
                        data.len() - body_start
                    ),
                })?;

            let body = &data[body_start..body_end];
            chunks.push(Self::decode(header.id, body, base + body_start as u64)?);
            pos = body_end;
        }

        Ok(chunks)
    }

    /// Decode one chunk body by id
    fn decode(id: ChunkId, body: &[u8], position: u64) -> Result<Chunk> {
        let chunk = match classify(id) {
            ChunkKind::Container => Chunk::Container(Container {
                id,
                children: Self::read_sequence(body, position)?,
            }),
            ChunkKind::FileInfo => Chunk::FileInfo(FileInfo::read_body(body, position)?),
            ChunkKind::HashList => Chunk::HashList(HashList::read_body(body, position)?),
            ChunkKind::DataOffsets => {
                Chunk::DataOffsets(DataOffsetTable::read_body(body, position)?)
            }
            ChunkKind::HeadLink => Chunk::HeadLink(HeadLink::read_body(body, position)?),
            ChunkKind::DataRaw => Chunk::DataRaw(DataRaw::read_body(body, position)?),
            ChunkKind::Null => Chunk::Null(NullChunk::read_body(body, position)?),
            ChunkKind::Opaque => Chunk::Unknown(UnknownChunk {
                id,
                data: body.to_vec(),
            }),
        };
        tracing::trace!("decoded {} ({} bytes) at {:#x}", id, body.len(), position);
        Ok(chunk)
    }
}

impl From<Container> for Chunk {
    fn from(c: Container) -> Self {
        Chunk::Container(c)
    }
}

impl From<FileInfo> for Chunk {
    fn from(r: FileInfo) -> Self {
        Chunk::FileInfo(r)
    }
}

impl From<HashList> for Chunk {
    fn from(r: HashList) -> Self {
        Chunk::HashList(r)
    }
}

impl From<DataOffsetTable> for Chunk {
    fn from(r: DataOffsetTable) -> Self {
        Chunk::DataOffsets(r)
    }
}

impl From<HeadLink> for Chunk {
    fn from(r: HeadLink) -> Self {
        Chunk::HeadLink(r)
    }
}

impl From<DataRaw> for Chunk {
    fn from(r: DataRaw) -> Self {
        Chunk::DataRaw(r)
    }
}

impl From<NullChunk> for Chunk {
    fn from(n: NullChunk) -> Self {
        Chunk::Null(n)
    }
}

impl From<UnknownChunk> for Chunk {
    fn from(u: UnknownChunk) -> Self {
        Chunk::Unknown(u)
    }
}
