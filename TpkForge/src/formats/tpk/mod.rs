//! TPK texture package format
//!
//! A TPK file is a tree of length-prefixed chunks. Every chunk starts with an
//! 8-byte header (`u32` id, `u32` body length, little-endian). Ids with the
//! high bit set are containers whose body is a sequence of child chunks; all
//! other ids are leaves with a typed or opaque body.
//!
//! ```text
//! TextureRoot (0xB3300000)
//! ├── Null            0x30 bytes of filler
//! ├── Head (0xB3310000)
//! │   ├── FileInfo    version, identifier, pipeline path, path hash
//! │   ├── HashList    (hash, 0) per texture, ascending
//! │   └── DataOffsets (hash, offset, length, real length, flags, 0), ascending
//! ├── Null            pads the data container onto a 0x80 boundary
//! └── Data (0xB3320000)
//!     ├── HeadLink    links back to FileInfo through the path hash
//!     ├── Null        0x50 bytes of filler
//!     └── DataRaw     texture blobs at absolute offsets, 0x40 aligned
//! ```

mod chunk;
mod file;
mod records;
mod texture;

pub use chunk::{CHUNK_HEADER_SIZE, Chunk, ChunkBody, ChunkHeader, ChunkId, Container, UnknownChunk};
pub use file::{PackagedTexture, TpkFile};
pub use records::{
    DATA_OFFSET_ENTRY_SIZE, DATA_OFFSET_FLAGS, DataOffsetEntry, DataOffsetTable, DataRaw,
    FILE_INFO_NAME_SIZE, FILE_INFO_PATH_SIZE, FILE_INFO_SIZE, FILE_INFO_VERSION, FileInfo,
    HASH_ENTRY_SIZE, HEAD_LINK_SIZE, HEAD_LINK_UNKNOWN, HashList, HeadLink, NullChunk,
};
pub use texture::{
    TEXTURE_BLOB_HEADER_SIZE, TEXTURE_BLOB_MAGIC, TEXTURE_BLOB_VERSION, TEXTURE_INFO_SIZE,
    TEXTURE_NAME_SIZE, TextureBlob, TextureInfo,
};
