//! Texture blobs stored in the raw data region
//!
//! A blob is a 0x10-byte header, the mip-0 pixel data, then the 0x9C-byte
//! [`TextureInfo`] record the engine uses to place the texture in memory.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::formats::common::{read_fixed_string, write_fixed_string};

/// First word of every texture blob
pub const TEXTURE_BLOB_MAGIC: u32 = 0x5757_4152;
/// Second word of every texture blob
pub const TEXTURE_BLOB_VERSION: u32 = 0x1001;
/// Blob header size
pub const TEXTURE_BLOB_HEADER_SIZE: usize = 0x10;
/// Encoded [`TextureInfo`] size
pub const TEXTURE_INFO_SIZE: usize = 0x9C;
/// Width of the texture name field
pub const TEXTURE_NAME_SIZE: usize = 0x18;

const INFO_PADDING: usize = 0x14;

/// Per-texture metadata record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureInfo {
    pub name: String,
    pub hash: u32,
    pub usage: u32,
    pub memory_offset: u32,
    pub memory_palette_offset: u32,
    pub texture_length: u32,
    pub palette_length: u32,
    pub pitch: u32,
    pub width: u16,
    pub height: u16,
    pub d1: u32,
    pub d2: u32,
    pub d3: u32,
    pub d4: u32,
    pub d5: u32,
    pub d6: u32,
    pub d7: u32,
    pub d8: u32,
    pub alpha: u32,
    pub d9: u32,
    pub d10: u32,
    /// Pixel format as its fourcc integer
    pub d3d_format: u32,
}

impl TextureInfo {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        skip_words(reader, 3)?;
        let name = read_fixed_string(reader, TEXTURE_NAME_SIZE)?;
        let hash = reader.read_u32::<LittleEndian>()?;
        let usage = reader.read_u32::<LittleEndian>()?;
        skip_words(reader, 1)?;
        let memory_offset = reader.read_u32::<LittleEndian>()?;
        let memory_palette_offset = reader.read_u32::<LittleEndian>()?;
        let texture_length = reader.read_u32::<LittleEndian>()?;
        let palette_length = reader.read_u32::<LittleEndian>()?;
        let pitch = reader.read_u32::<LittleEndian>()?;
        let width = reader.read_u16::<LittleEndian>()?;
        let height = reader.read_u16::<LittleEndian>()?;

        let mut d = [0u32; 8];
        reader.read_u32_into::<LittleEndian>(&mut d)?;

        let mut padding = [0u8; INFO_PADDING];
        reader.read_exact(&mut padding)?;
        skip_words(reader, 2)?;

        let alpha = reader.read_u32::<LittleEndian>()?;
        let d9 = reader.read_u32::<LittleEndian>()?;
        let d10 = reader.read_u32::<LittleEndian>()?;
        let d3d_format = reader.read_u32::<LittleEndian>()?;
        skip_words(reader, 2)?;

        Ok(Self {
            name,
            hash,
            usage,
            memory_offset,
            memory_palette_offset,
            texture_length,
            palette_length,
            pitch,
            width,
            height,
            d1: d[0],
            d2: d[1],
            d3: d[2],
            d4: d[3],
            d5: d[4],
            d6: d[5],
            d7: d[6],
            d8: d[7],
            alpha,
            d9,
            d10,
            d3d_format,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_zero_words(writer, 3)?;
        write_fixed_string(writer, &self.name, TEXTURE_NAME_SIZE)?;
        writer.write_u32::<LittleEndian>(self.hash)?;
        writer.write_u32::<LittleEndian>(self.usage)?;
        write_zero_words(writer, 1)?;
        writer.write_u32::<LittleEndian>(self.memory_offset)?;
        writer.write_u32::<LittleEndian>(self.memory_palette_offset)?;
        writer.write_u32::<LittleEndian>(self.texture_length)?;
        writer.write_u32::<LittleEndian>(self.palette_length)?;
        writer.write_u32::<LittleEndian>(self.pitch)?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        for d in [
            self.d1, self.d2, self.d3, self.d4, self.d5, self.d6, self.d7, self.d8,
        ] {
            writer.write_u32::<LittleEndian>(d)?;
        }
        writer.write_all(&[0u8; INFO_PADDING])?;
        write_zero_words(writer, 2)?;
        writer.write_u32::<LittleEndian>(self.alpha)?;
        writer.write_u32::<LittleEndian>(self.d9)?;
        writer.write_u32::<LittleEndian>(self.d10)?;
        writer.write_u32::<LittleEndian>(self.d3d_format)?;
        write_zero_words(writer, 2)?;
        Ok(())
    }
}

fn skip_words<R: Read>(reader: &mut R, count: usize) -> Result<()> {
    for _ in 0..count {
        reader.read_u32::<LittleEndian>()?;
    }
    Ok(())
}

fn write_zero_words<W: Write>(writer: &mut W, count: usize) -> Result<()> {
    for _ in 0..count {
        writer.write_u32::<LittleEndian>(0)?;
    }
    Ok(())
}

/// A decoded texture blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBlob {
    /// Mip-0 pixel data
    pub pixels: Vec<u8>,
    pub info: TextureInfo,
}

impl TextureBlob {
    #[must_use]
    pub fn new(pixels: Vec<u8>, info: TextureInfo) -> Self {
        Self { pixels, info }
    }

    /// Encoded size: header + pixels + metadata
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        TEXTURE_BLOB_HEADER_SIZE + self.pixels.len() + TEXTURE_INFO_SIZE
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body_len = self.pixels.len() + TEXTURE_INFO_SIZE;
        let too_large = || Error::InvalidTextureBlob {
            message: format!("{} pixel bytes do not fit a blob", self.pixels.len()),
        };
        let inner = u32::try_from(body_len).map_err(|_| too_large())?;
        let outer = inner
            .checked_add(TEXTURE_BLOB_HEADER_SIZE as u32)
            .ok_or_else(too_large)?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.write_u32::<LittleEndian>(TEXTURE_BLOB_MAGIC)?;
        out.write_u32::<LittleEndian>(TEXTURE_BLOB_VERSION)?;
        out.write_u32::<LittleEndian>(inner)?;
        out.write_u32::<LittleEndian>(outer)?;
        out.extend_from_slice(&self.pixels);
        self.info.write(&mut out)?;
        Ok(out)
    }

    /// Decode a blob. Trailing bytes past the declared size are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < TEXTURE_BLOB_HEADER_SIZE + TEXTURE_INFO_SIZE {
            return Err(Error::InvalidTextureBlob {
                message: format!("{} bytes is too short for a texture blob", data.len()),
            });
        }

        let mut cursor = Cursor::new(data);
        let magic = cursor.read_u32::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;
        if magic != TEXTURE_BLOB_MAGIC || version != TEXTURE_BLOB_VERSION {
            return Err(Error::InvalidTextureBlob {
                message: format!("bad header {magic:#010x}/{version:#x}"),
            });
        }

        let inner = cursor.read_u32::<LittleEndian>()? as usize;
        let outer = cursor.read_u32::<LittleEndian>()? as usize;
        if inner < TEXTURE_INFO_SIZE
            || outer != inner + TEXTURE_BLOB_HEADER_SIZE
            || outer > data.len()
        {
            return Err(Error::InvalidTextureBlob {
                message: format!(
                    "inconsistent sizes {inner:#x}/{outer:#x} for {} available bytes",
                    data.len()
                ),
            });
        }

        let pixel_len = inner - TEXTURE_INFO_SIZE;
        let pixels = data[TEXTURE_BLOB_HEADER_SIZE..TEXTURE_BLOB_HEADER_SIZE + pixel_len].to_vec();
        cursor.set_position((TEXTURE_BLOB_HEADER_SIZE + pixel_len) as u64);
        let info = TextureInfo::read(&mut cursor)?;

        Ok(Self { pixels, info })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_info() -> TextureInfo {
        TextureInfo {
            name: "CAR_SKIN".into(),
            hash: 0x1234_5678,
            usage: 0x001A_93CF,
            memory_offset: 0x800,
            memory_palette_offset: 0x810,
            texture_length: 0x10,
            palette_length: 0,
            pitch: 0x10,
            width: 8,
            height: 4,
            d1: 0x0022_0203,
            d2: 0x10000,
            d3: 0,
            d4: 0x0100_0000,
            d5: 0x100,
            d6: 0,
            d7: 0x0100_0000,
            d8: 0x100,
            alpha: 0,
            d9: 5,
            d10: 6,
            d3d_format: 0x3154_5844,
        }
    }

    #[test]
    fn test_info_field_offsets() {
        let mut out = Vec::new();
        sample_info().write(&mut out).unwrap();
        assert_eq!(out.len(), TEXTURE_INFO_SIZE);

        let word = |at: usize| u32::from_le_bytes([out[at], out[at + 1], out[at + 2], out[at + 3]]);
        assert_eq!(&out[0..12], &[0u8; 12]);
        assert_eq!(&out[0x0C..0x14], b"CAR_SKIN");
        assert_eq!(word(0x24), 0x1234_5678);
        assert_eq!(word(0x28), 0x001A_93CF);
        assert_eq!(word(0x30), 0x800);
        assert_eq!(word(0x34), 0x810);
        assert_eq!(word(0x40), 0x10);
        assert_eq!(word(0x44), 8 | (4 << 16));
        assert_eq!(word(0x48), 0x0022_0203);
        assert_eq!(word(0x64), 0x100);
        assert_eq!(&out[0x68..0x84], &[0u8; 0x1C]);
        assert_eq!(word(0x84), 0);
        assert_eq!(word(0x88), 5);
        assert_eq!(word(0x8C), 6);
        assert_eq!(word(0x90), 0x3154_5844);
        assert_eq!(&out[0x94..], &[0u8; 8]);

        assert_eq!(TextureInfo::read(&mut Cursor::new(&out)).unwrap(), sample_info());
    }

    #[test]
    fn test_blob_layout() {
        let blob = TextureBlob::new(vec![0xAB; 0x10], sample_info());
        let bytes = blob.to_bytes().unwrap();
        assert_eq!(bytes.len(), 0x10 + 0xAC);
        assert_eq!(bytes.len(), blob.encoded_len());
        assert_eq!(&bytes[0..4], &TEXTURE_BLOB_MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x1001u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(0x10u32 + 0x9C).to_le_bytes());
        assert_eq!(&bytes[12..16], &(0x10u32 + 0x9C + 0x10).to_le_bytes());
        assert_eq!(&bytes[0x10..0x20], &[0xAB; 0x10]);

        assert_eq!(TextureBlob::parse(&bytes).unwrap(), blob);
    }

    #[test]
    fn test_blob_rejects_garbage() {
        assert!(TextureBlob::parse(&[0u8; 4]).is_err());
        assert!(TextureBlob::parse(&[0u8; 0x100]).is_err());

        let mut bytes = TextureBlob::new(vec![0; 4], sample_info()).to_bytes().unwrap();
        bytes[12] = 0xFF;
        assert!(matches!(
            TextureBlob::parse(&bytes),
            Err(Error::InvalidTextureBlob { .. })
        ));
    }
}
