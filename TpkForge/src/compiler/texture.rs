//! Per-texture synthesis: DDS source to metadata record and blob

use super::config::TextureEntry;
use crate::error::{Error, Result};
use crate::formats::dds::{DdsImage, TextureFormat};
use crate::formats::tpk::{TextureBlob, TextureInfo};
use crate::utils::{normalize_path, tpk_hash};

/// A texture ready for layout, still in manifest order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTexture {
    /// Manifest entry index
    pub index: usize,
    pub format: TextureFormat,
    pub blob: TextureBlob,
}

impl CompiledTexture {
    #[must_use]
    pub fn hash(&self) -> u32 {
        self.blob.info.hash
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.blob.info.name
    }
}

/// Load and compile one manifest entry. The memory offset is left at 0;
/// see [`assign_memory_offsets`].
pub fn compile_entry(entry: &TextureEntry) -> Result<CompiledTexture> {
    tracing::debug!("reading {}", normalize_path(&entry.file));
    let image = DdsImage::read(&entry.file).map_err(|e| e.for_texture(entry.index, entry.name.clone()))?;
    compile_image(entry, &image).map_err(|e| e.for_texture(entry.index, entry.name.clone()))
}

/// Compile an already parsed image for `entry`
pub fn compile_image(entry: &TextureEntry, image: &DdsImage) -> Result<CompiledTexture> {
    let format = image.compressed_format()?;
    let (width, height) = checked_dimensions(image)?;
    let has_alpha = format.has_alpha();
    let flag_a = entry.flag_a;
    let pixels = image.base_level().to_vec();

    let info = TextureInfo {
        name: entry.name.clone(),
        hash: tpk_hash(&entry.name),
        usage: entry.usage.value(),
        memory_offset: 0,
        memory_palette_offset: image.pitch,
        texture_length: image.pitch,
        palette_length: 0,
        pitch: image.pitch,
        width,
        height,
        d1: size_code(width, height),
        d2: 0x10000,
        d3: if has_alpha { 0x500 } else { 0 },
        d4: match (has_alpha, flag_a) {
            (true, false) => 0x10201,
            (true, true) => 0x10200,
            (false, false) => 0x0100_0000,
            (false, true) => 0x0300_0000,
        },
        d5: 0x100,
        d6: 0,
        d7: 0x0100_0000,
        d8: 0x100,
        alpha: u32::from(has_alpha),
        d9: 5,
        d10: 6,
        d3d_format: format.fourcc(),
    };

    Ok(CompiledTexture {
        index: entry.index,
        format,
        blob: TextureBlob::new(pixels, info),
    })
}

/// `0x220000 + (log2 h << 8) + log2 w`, logs floored
#[must_use]
pub fn size_code(width: u16, height: u16) -> u32 {
    0x0022_0000 + (height.max(1).ilog2() << 8) + width.max(1).ilog2()
}

fn checked_dimensions(image: &DdsImage) -> Result<(u16, u16)> {
    if image.width == 0 || image.height == 0 {
        return Err(Error::InvalidDds {
            message: format!("zero-sized surface {}x{}", image.width, image.height),
        });
    }
    match (u16::try_from(image.width), u16::try_from(image.height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::InvalidDds {
            message: format!(
                "surface {}x{} exceeds {}x{}",
                image.width,
                image.height,
                u16::MAX,
                u16::MAX
            ),
        }),
    }
}

/// Fill in memory offsets from a running cursor, in the given order
pub fn assign_memory_offsets(textures: &mut [CompiledTexture]) -> Result<()> {
    let mut cursor: u32 = 0;
    for texture in textures {
        let info = &mut texture.blob.info;
        info.memory_offset = cursor;
        info.memory_palette_offset = cursor.wrapping_add(info.texture_length);
        cursor = cursor
            .checked_add(info.texture_length)
            .and_then(|c| c.checked_add(info.palette_length))
            .ok_or_else(|| Error::LayoutInvariant {
                message: "texture memory exceeds 4 GiB".to_string(),
            })?;
    }
    Ok(())
}
