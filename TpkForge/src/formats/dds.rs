//! Minimal DDS (`DirectDraw` Surface) reader and writer
//!
//! Only what packaging needs is decoded: dimensions, pitch, the pixel format
//! block, and the raw bytes of each mip level. Pixel data is never decoded.
//!
//! Mip payloads follow the texture pipeline convention: the
//! first level is `pitch` bytes and each following level is half the previous
//! one. Only level 0 is ever packaged, so later levels are read best-effort.
//! Writing goes through `ddsfile` and emits the base level only.

use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use ddsfile::{D3DFormat, Dds, NewD3dParams};

use crate::error::{Error, Result};

/// "DDS " magic (little-endian)
pub const DDS_MAGIC: u32 = 0x2053_4444;

/// Size of the magic plus the fixed DDS header
pub const DDS_HEADER_SIZE: usize = 128;

/// Pixel format flag: the `fourcc` field holds a compression code
pub const DDPF_FOURCC: u32 = 0x4;
/// Pixel format flag: 8-bit palette indexed
pub const DDPF_PALETTE_INDEXED: u32 = 0x20;
/// Pixel format flag: uncompressed RGB
pub const DDPF_RGB: u32 = 0x40;

/// Caps: texture
const DDSCAPS_TEXTURE: u32 = 0x1000;

/// Largest palette exponent accepted (`2^bpp` entries)
const MAX_PALETTE_BITS: u32 = 16;

/// Compressed formats the TPK pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// DXT1 / BC1 - opaque or 1-bit alpha
    Dxt1,
    /// DXT3 / BC2 - explicit 4-bit alpha
    Dxt3,
}

impl TextureFormat {
    /// `FourCC` code as stored in DDS headers and TPK metadata
    #[must_use]
    pub const fn fourcc(self) -> u32 {
        match self {
            Self::Dxt1 => 0x3154_5844, // 'DXT1'
            Self::Dxt3 => 0x3354_5844, // 'DXT3'
        }
    }

    /// Map a raw `FourCC` code back to a supported format
    #[must_use]
    pub const fn from_fourcc(fourcc: u32) -> Option<Self> {
        match fourcc {
            0x3154_5844 => Some(Self::Dxt1),
            0x3354_5844 => Some(Self::Dxt3),
            _ => None,
        }
    }

    /// Matching `ddsfile` format for writing
    #[must_use]
    pub const fn d3d_format(self) -> D3DFormat {
        match self {
            Self::Dxt1 => D3DFormat::DXT1,
            Self::Dxt3 => D3DFormat::DXT3,
        }
    }

    /// Whether the engine treats this format as carrying alpha
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Dxt3)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dxt1 => "DXT1",
            Self::Dxt3 => "DXT3",
        }
    }
}

/// Render a `FourCC` code as text when printable, hex otherwise
#[must_use]
pub fn fourcc_name(fourcc: u32) -> String {
    let bytes = fourcc.to_le_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic()) {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        format!("{fourcc:#x}")
    }
}

/// The DDS pixel format block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: u32,
    pub bits_per_pixel: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
}

/// A parsed DDS file: header fields plus raw level payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsImage {
    pub height: u32,
    pub width: u32,
    /// Row pitch or linear size of the base level, in bytes
    pub pitch: u32,
    pub depth: u32,
    /// Mip count as declared by the header (0 is stored as-is)
    pub mip_count: u32,
    pub pixel_format: DdsPixelFormat,
    pub caps1: u32,
    pub caps2: u32,
    pub palette: Option<Vec<u8>>,
    /// Raw payload of each level that was present, base level first
    pub mips: Vec<Vec<u8>>,
}

impl DdsImage {
    /// Read and parse a DDS file from disk
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, or any parse error
    /// from [`DdsImage::parse`].
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    /// Parse DDS data from bytes
    ///
    /// # Errors
    /// Returns [`Error::InvalidDdsMagic`] if the magic is wrong,
    /// [`Error::DdsTruncated`] if the header, palette or base level is cut
    /// short, and [`Error::InvalidDds`] for an impossible palette size.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::DdsTruncated { what: "header" });
        }
        let mut cursor = Cursor::new(data);

        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != DDS_MAGIC {
            return Err(Error::InvalidDdsMagic(magic));
        }
        if data.len() < DDS_HEADER_SIZE {
            return Err(Error::DdsTruncated { what: "header" });
        }

        // Header size and header flags
        let _header_size = cursor.read_u32::<LittleEndian>()?;
        let _header_flags = cursor.read_u32::<LittleEndian>()?;

        let height = cursor.read_u32::<LittleEndian>()?;
        let width = cursor.read_u32::<LittleEndian>()?;
        let pitch = cursor.read_u32::<LittleEndian>()?;
        let depth = cursor.read_u32::<LittleEndian>()?;
        let mip_count = cursor.read_u32::<LittleEndian>()?;

        // Reserved
        cursor.set_position(cursor.position() + 11 * 4);

        let pixel_format = DdsPixelFormat {
            size: cursor.read_u32::<LittleEndian>()?,
            flags: cursor.read_u32::<LittleEndian>()?,
            fourcc: cursor.read_u32::<LittleEndian>()?,
            bits_per_pixel: cursor.read_u32::<LittleEndian>()?,
            red_mask: cursor.read_u32::<LittleEndian>()?,
            green_mask: cursor.read_u32::<LittleEndian>()?,
            blue_mask: cursor.read_u32::<LittleEndian>()?,
            alpha_mask: cursor.read_u32::<LittleEndian>()?,
        };

        let caps1 = cursor.read_u32::<LittleEndian>()?;
        let caps2 = cursor.read_u32::<LittleEndian>()?;
        // Two reserved caps words and a trailing reserved word
        cursor.set_position(cursor.position() + 3 * 4);

        let palette = if pixel_format.flags & DDPF_PALETTE_INDEXED != 0 {
            if pixel_format.bits_per_pixel > MAX_PALETTE_BITS {
                return Err(Error::InvalidDds {
                    message: format!(
                        "palette with {} bits per pixel",
                        pixel_format.bits_per_pixel
                    ),
                });
            }
            let len = (1usize << pixel_format.bits_per_pixel) * 4;
            Some(read_section(&mut cursor, len, "palette")?)
        } else {
            None
        };

        let base = read_section(&mut cursor, pitch as usize, "mip level 0")?;
        let mut mips = vec![base];

        // Later levels: half the previous size each, clamped to what is left
        let mut level_len = pitch as usize / 2;
        for _ in 1..mip_count.max(1) {
            let remaining = data.len().saturating_sub(cursor.position() as usize);
            if remaining == 0 || level_len == 0 {
                break;
            }
            let len = level_len.min(remaining);
            mips.push(read_section(&mut cursor, len, "mip level")?);
            level_len /= 2;
        }

        Ok(Self {
            height,
            width,
            pitch,
            depth,
            mip_count,
            pixel_format,
            caps1,
            caps2,
            palette,
            mips,
        })
    }

    /// Create a single-level compressed image with the given base payload
    #[must_use]
    pub fn new_compressed(width: u32, height: u32, format: TextureFormat, pixels: Vec<u8>) -> Self {
        Self {
            height,
            width,
            pitch: pixels.len() as u32,
            depth: 0,
            mip_count: 1,
            pixel_format: DdsPixelFormat {
                size: 32,
                flags: DDPF_FOURCC,
                fourcc: format.fourcc(),
                ..DdsPixelFormat::default()
            },
            caps1: DDSCAPS_TEXTURE,
            caps2: 0,
            palette: None,
            mips: vec![pixels],
        }
    }

    /// Raw bytes of the base level
    #[must_use]
    pub fn base_level(&self) -> &[u8] {
        self.mips.first().map_or(&[], Vec::as_slice)
    }

    /// The compressed format, if this image passes the DXT1/DXT3 gate
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for anything that is not a
    /// `FourCC`-compressed DXT1 or DXT3 surface.
    pub fn compressed_format(&self) -> Result<TextureFormat> {
        let pf = &self.pixel_format;
        if pf.flags & DDPF_FOURCC == 0 {
            return Err(Error::UnsupportedFormat {
                fourcc: pf.fourcc,
                flags: pf.flags,
            });
        }
        TextureFormat::from_fourcc(pf.fourcc).ok_or(Error::UnsupportedFormat {
            fourcc: pf.fourcc,
            flags: pf.flags,
        })
    }

    /// Encode the base level as a single-level DDS file.
    ///
    /// The `pitch` word carries the linear size of the base level, which is
    /// what [`DdsImage::parse`] expects. Palettes and later mips are not
    /// written.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFormat`] for images outside the DXT1/DXT3
    /// gate and [`Error::DdsError`] if the base level does not match the
    /// surface size.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let format = self.compressed_format()?;
        let base = self.base_level();

        let mut dds = Dds::new_d3d(NewD3dParams {
            height: self.height,
            width: self.width,
            depth: None,
            format: format.d3d_format(),
            mipmap_levels: None,
            caps2: None,
        })
        .map_err(|e| Error::DdsError(format!("Failed to create DDS: {e}")))?;

        let dds_data = dds
            .get_mut_data(0)
            .map_err(|e| Error::DdsError(format!("No DDS data layer: {e}")))?;
        if dds_data.len() != base.len() {
            return Err(Error::DdsError(format!(
                "{}x{} {} surface needs {} bytes, base level has {}",
                self.width,
                self.height,
                format.as_str(),
                dds_data.len(),
                base.len()
            )));
        }
        dds_data.copy_from_slice(base);
        dds.header.pitch = None;
        dds.header.linear_size = Some(base.len() as u32);

        let mut output = Vec::with_capacity(DDS_HEADER_SIZE + base.len());
        dds.write(&mut output)
            .map_err(|e| Error::DdsError(format!("Failed to write DDS: {e}")))?;
        Ok(output)
    }
}

/// Read exactly `len` bytes, reporting a short read as truncation of `what`
fn read_section(cursor: &mut Cursor<&[u8]>, len: usize, what: &'static str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::DdsTruncated { what }
        } else {
            Error::Io(e)
        }
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dxt1_bytes() -> Vec<u8> {
        DdsImage::new_compressed(8, 4, TextureFormat::Dxt1, (0u8..16).collect())
            .to_bytes()
            .unwrap()
    }

    fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_parse_written_header() {
        let bytes = dxt1_bytes();
        assert_eq!(bytes.len(), DDS_HEADER_SIZE + 16);

        let parsed = DdsImage::parse(&bytes).unwrap();
        assert_eq!(parsed.width, 8);
        assert_eq!(parsed.height, 4);
        assert_eq!(parsed.pitch, 16);
        assert_eq!(parsed.compressed_format().unwrap(), TextureFormat::Dxt1);
        assert_eq!(parsed.base_level(), &(0u8..16).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_write_dxt3() {
        let image = DdsImage::new_compressed(8, 8, TextureFormat::Dxt3, vec![3u8; 64]);
        let parsed = DdsImage::parse(&image.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.compressed_format().unwrap(), TextureFormat::Dxt3);
        assert_eq!(parsed.pitch, 64);
        assert_eq!(parsed.base_level(), &[3u8; 64][..]);
    }

    #[test]
    fn test_write_rejects_wrong_payload_size() {
        let image = DdsImage::new_compressed(8, 8, TextureFormat::Dxt1, vec![0u8; 7]);
        assert!(matches!(image.to_bytes(), Err(Error::DdsError(_))));

        let mut image = DdsImage::new_compressed(8, 8, TextureFormat::Dxt1, vec![0u8; 32]);
        image.pixel_format.fourcc = 0x3554_5844; // DXT5
        assert!(matches!(image.to_bytes(), Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = dxt1_bytes();
        bytes[0] = b'X';
        assert!(matches!(DdsImage::parse(&bytes), Err(Error::InvalidDdsMagic(_))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = dxt1_bytes();
        assert!(matches!(
            DdsImage::parse(&bytes[..64]),
            Err(Error::DdsTruncated { what: "header" })
        ));
        assert!(matches!(
            DdsImage::parse(&bytes[..2]),
            Err(Error::DdsTruncated { what: "header" })
        ));
    }

    #[test]
    fn test_truncated_base_level() {
        let bytes = dxt1_bytes();
        assert!(matches!(
            DdsImage::parse(&bytes[..bytes.len() - 1]),
            Err(Error::DdsTruncated { what: "mip level 0" })
        ));
    }

    #[test]
    fn test_mip_levels_halve_and_clamp() {
        let image = DdsImage::new_compressed(16, 16, TextureFormat::Dxt3, vec![1u8; 256]);
        let mut bytes = image.to_bytes().unwrap();
        put_u32(&mut bytes, 28, 4);
        // 128 + 40 bytes follow the base level; the next levels are missing
        bytes.extend_from_slice(&[2u8; 128]);
        bytes.extend_from_slice(&[3u8; 40]);
        let parsed = DdsImage::parse(&bytes).unwrap();

        let sizes: Vec<usize> = parsed.mips.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![256, 128, 40]);
        assert_eq!(parsed.mip_count, 4);
    }

    #[test]
    fn test_palette_is_skipped() {
        let image = DdsImage::new_compressed(4, 4, TextureFormat::Dxt1, vec![9u8; 8]);
        let mut bytes = image.to_bytes().unwrap();
        put_u32(&mut bytes, 80, DDPF_PALETTE_INDEXED);
        put_u32(&mut bytes, 88, 2);
        bytes.splice(DDS_HEADER_SIZE..DDS_HEADER_SIZE, [7u8; 16]);

        let parsed = DdsImage::parse(&bytes).unwrap();
        assert_eq!(parsed.palette.as_deref(), Some(&[7u8; 16][..]));
        assert_eq!(parsed.base_level(), &[9u8; 8]);
        assert!(matches!(
            parsed.compressed_format(),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_format_gate() {
        let mut image = DdsImage::parse(&dxt1_bytes()).unwrap();
        image.pixel_format.fourcc = 0x3554_5844; // DXT5
        assert!(matches!(
            image.compressed_format(),
            Err(Error::UnsupportedFormat { fourcc: 0x3554_5844, .. })
        ));

        image.pixel_format.fourcc = TextureFormat::Dxt3.fourcc();
        assert_eq!(image.compressed_format().unwrap(), TextureFormat::Dxt3);

        // Right code, but not flagged as FourCC-compressed
        image.pixel_format.flags = DDPF_RGB;
        assert!(image.compressed_format().is_err());
    }

    #[test]
    fn test_fourcc_name() {
        assert_eq!(fourcc_name(TextureFormat::Dxt1.fourcc()), "DXT1");
        assert_eq!(fourcc_name(21), "0x15");
    }
}
