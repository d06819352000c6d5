//! Unpack TPK textures back to DDS files

use std::path::Path;

use anyhow::{Context, bail};

use crate::cli::progress::{PICTURE, print_step};
use crate::formats::dds::{DdsImage, TextureFormat, fourcc_name};
use crate::formats::tpk::{TextureBlob, TpkFile};

pub fn execute(tpk_path: &Path, destination: &Path, name: Option<&str>, hash: Option<&str>) -> anyhow::Result<()> {
    let tpk = TpkFile::read(tpk_path).with_context(|| format!("failed to read {}", tpk_path.display()))?;

    let blobs: Vec<(u32, TextureBlob)> = match (name, hash) {
        (Some(name), _) => {
            let blob = tpk.texture_by_name(name)?;
            vec![(blob.info.hash, blob)]
        }
        (None, Some(hash)) => {
            let hash = parse_hash(hash)?;
            vec![(hash, tpk.texture(hash)?)]
        }
        (None, None) => tpk
            .data_offsets()?
            .hashes()
            .map(|hash| Ok((hash, tpk.texture(hash)?)))
            .collect::<crate::Result<_>>()?,
    };

    std::fs::create_dir_all(destination)?;
    print_step(1, 1, PICTURE, &format!("Extracting {} textures", blobs.len()));

    for (hash, blob) in &blobs {
        let info = &blob.info;
        let Some(format) = TextureFormat::from_fourcc(info.d3d_format) else {
            tracing::warn!("Skipping {hash:08X}: unsupported format {}", fourcc_name(info.d3d_format));
            continue;
        };

        let image = DdsImage::new_compressed(
            u32::from(info.width),
            u32::from(info.height),
            format,
            blob.pixels.clone(),
        );
        let bytes = match image.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping {hash:08X}: {e}");
                continue;
            }
        };
        let file_name = output_file_name(*hash, &info.name);
        let out = destination.join(&file_name);
        std::fs::write(&out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
        println!("  {file_name} ({})", format.as_str());
    }

    Ok(())
}

/// File name for an extracted texture. Stored names that could leave the
/// destination directory fall back to the hash.
fn output_file_name(hash: u32, name: &str) -> String {
    let unsafe_name = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', ':', '\0']);
    if unsafe_name {
        format!("{hash:08X}.dds")
    } else {
        format!("{name}.dds")
    }
}

fn parse_hash(text: &str) -> anyhow::Result<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    match u32::from_str_radix(digits, 16) {
        Ok(hash) => Ok(hash),
        Err(_) => bail!("'{text}' is not a hexadecimal hash"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash() {
        assert_eq!(parse_hash("0x1A2B3C4D").unwrap(), 0x1A2B_3C4D);
        assert_eq!(parse_hash("deadbeef").unwrap(), 0xDEAD_BEEF);
        assert!(parse_hash("nothex").is_err());
    }

    #[test]
    fn test_output_file_name_stays_in_destination() {
        assert_eq!(output_file_name(0x1234, "CAR_SKIN"), "CAR_SKIN.dds");
        assert_eq!(output_file_name(0x1234, ""), "00001234.dds");
        for name in ["/tmp/x", "../x", "..", "a/b", "a\\b", "C:x"] {
            assert_eq!(output_file_name(0xABCD_EF01, name), "ABCDEF01.dds", "{name}");
        }
    }

    #[test]
    fn test_extract_ignores_traversal_names() {
        use crate::compiler::TpkCompiler;
        use crate::formats::tpk::TpkFile;

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir_all(&source).unwrap();
        let image = DdsImage::new_compressed(8, 8, TextureFormat::Dxt1, vec![1; 32]);
        std::fs::write(source.join("t.dds"), image.to_bytes().unwrap()).unwrap();
        std::fs::write(
            source.join("t.ini"),
            "[tpk]\nidentifier = T\npipelinepath = T.BIN\n\n[texture]\nfile = t.dds\nname = ../escaped\n",
        )
        .unwrap();
        let result = TpkCompiler::from_manifest(source.join("t.ini")).unwrap().build().unwrap();

        let out = dir.path().join("out");
        execute(&result.output, &out, None, None).unwrap();

        let hash = TpkFile::read(&result.output).unwrap().hash_list().unwrap().hashes[0];
        assert!(out.join(format!("{hash:08X}.dds")).exists());
        assert!(!dir.path().join("escaped.dds").exists());
    }
}
