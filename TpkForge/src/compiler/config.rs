//! Package configuration read from a manifest

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::formats::common::check_fixed_string;
use crate::formats::tpk::{FILE_INFO_NAME_SIZE, FILE_INFO_PATH_SIZE, FileInfo, TEXTURE_NAME_SIZE};
use crate::manifest::{Manifest, ManifestSource};
use crate::utils::resolve_relative;

/// Output file name when the manifest does not set one
pub const DEFAULT_OUTPUT: &str = "TEXTURES.BIN";

const TPK_SECTION: &str = "tpk";
const TEXTURE_SECTION: &str = "texture";

/// Engine usage class of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureUsage {
    Type1,
    Type2,
    #[default]
    Default,
}

impl TextureUsage {
    /// Parse a manifest `usage` value; anything unrecognised is [`TextureUsage::Default`]
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("type1") => Self::Type1,
            Some("type2") => Self::Type2,
            _ => Self::Default,
        }
    }

    /// Value stored in the metadata record
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Type1 => 0x1B81_E7B0,
            Self::Type2 => 0x1DA6_C8A6,
            Self::Default => 0x001A_93CF,
        }
    }
}

/// One `[texture]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    /// Position in the manifest (0-based)
    pub index: usize,
    /// Source DDS file, resolved against the manifest directory
    pub file: PathBuf,
    /// Display name (with the `xname` prefix applied)
    pub name: String,
    pub usage: TextureUsage,
    pub flag_a: bool,
}

impl TextureEntry {
    #[must_use]
    pub fn new(index: usize, file: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            index,
            file: file.into(),
            name: name.into(),
            usage: TextureUsage::Default,
            flag_a: false,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn with_flag_a(mut self, flag_a: bool) -> Self {
        self.flag_a = flag_a;
        self
    }
}

/// Everything the compiler needs to build one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    /// Package identifier (`FileInfo` name)
    pub identifier: String,
    /// Pipeline path (`FileInfo` path, hashed for the head link)
    pub pipeline_path: String,
    /// Output file
    pub output: PathBuf,
    pub textures: Vec<TextureEntry>,
}

impl PackageConfig {
    /// Load a manifest file and read the configuration from it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manifest = Manifest::load(path)?;
        Self::from_source(&manifest, manifest.base_dir())
    }

    /// Read the configuration from any manifest source.
    ///
    /// Relative `file` and `output` paths are resolved against `base_dir`.
    pub fn from_source<S: ManifestSource + ?Sized>(source: &S, base_dir: &Path) -> Result<Self> {
        let xname = source.value(TPK_SECTION, "xname");
        let identifier = source.value(TPK_SECTION, "identifier").unwrap_or_default();
        let pipeline_path = source.value(TPK_SECTION, "pipelinepath").unwrap_or_default();
        let output = source.value(TPK_SECTION, "output").unwrap_or(DEFAULT_OUTPUT);

        let count = source.count(TEXTURE_SECTION);
        let mut textures = Vec::with_capacity(count);
        for index in 0..count {
            let file = required(source, index, "file")?;
            let base_name = required(source, index, "name")?;
            let name = match xname {
                Some(prefix) => format!("{prefix}_{base_name}"),
                None => base_name.to_string(),
            };

            let usage = TextureUsage::parse(source.indexed_value(TEXTURE_SECTION, index, "usage"));
            let flag_a = source.indexed_value(TEXTURE_SECTION, index, "flaga") == Some("1");

            textures.push(
                TextureEntry::new(index, resolve_relative(base_dir, file), name)
                    .with_usage(usage)
                    .with_flag_a(flag_a),
            );
        }

        let config = Self {
            identifier: identifier.to_string(),
            pipeline_path: pipeline_path.to_string(),
            output: resolve_relative(base_dir, output),
            textures,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every fixed-width string before any file is touched
    pub fn validate(&self) -> Result<()> {
        check_fixed_string(&self.identifier, FILE_INFO_NAME_SIZE)?;
        check_fixed_string(&self.pipeline_path, FILE_INFO_PATH_SIZE)?;
        for entry in &self.textures {
            check_fixed_string(&entry.name, TEXTURE_NAME_SIZE)
                .map_err(|e| e.for_texture(entry.index, entry.name.clone()))?;
        }
        Ok(())
    }

    /// The package's `FileInfo` record
    #[must_use]
    pub fn file_info(&self) -> FileInfo {
        FileInfo::new(self.identifier.clone(), self.pipeline_path.clone())
    }
}

fn required<'a, S: ManifestSource + ?Sized>(source: &'a S, index: usize, key: &str) -> Result<&'a str> {
    source
        .indexed_value(TEXTURE_SECTION, index, key)
        .ok_or_else(|| Error::MissingConfigValue {
            section: TEXTURE_SECTION.to_string(),
            index: Some(index),
            key: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tpk_hash;

    fn config(text: &str) -> Result<PackageConfig> {
        let manifest = Manifest::parse(text)?;
        PackageConfig::from_source(&manifest, Path::new("/work"))
    }

    #[test]
    fn test_usage_values() {
        assert_eq!(TextureUsage::parse(Some("TYPE1")).value(), 0x1B81_E7B0);
        assert_eq!(TextureUsage::parse(Some("type2")).value(), 0x1DA6_C8A6);
        assert_eq!(TextureUsage::parse(Some("type3")).value(), 0x001A_93CF);
        assert_eq!(TextureUsage::parse(None), TextureUsage::Default);
    }

    #[test]
    fn test_defaults() {
        let cfg = config("[tpk]\n").unwrap();
        assert_eq!(cfg.identifier, "");
        assert_eq!(cfg.pipeline_path, "");
        assert_eq!(cfg.output, Path::new("/work").join(DEFAULT_OUTPUT));
        assert!(cfg.textures.is_empty());
        assert_eq!(cfg.file_info().file_hash, tpk_hash(""));
    }

    #[test]
    fn test_entries() {
        let cfg = config(
            "[tpk]\nidentifier=CARS\npipelinepath=GLOBAL\\CARS.BIN\noutput=out\\CARS.BIN\n\
             [texture]\nfile=tex\\a.dds\nname=A\nusage=Type2\nflaga=1\n\
             [texture]\nfile=b.dds\nname=B\nflaga=true\n",
        )
        .unwrap();

        assert_eq!(cfg.output, Path::new("/work/out/CARS.BIN"));
        assert_eq!(cfg.textures.len(), 2);
        let a = &cfg.textures[0];
        assert_eq!(a.file, Path::new("/work/tex/a.dds"));
        assert_eq!(a.name, "A");
        assert_eq!(a.usage, TextureUsage::Type2);
        assert!(a.flag_a);
        // Only the exact string "1" enables the flag
        assert!(!cfg.textures[1].flag_a);
        assert_eq!(cfg.textures[1].index, 1);
    }

    #[test]
    fn test_xname_prefix() {
        let cfg = config("[tpk]\nxname=CAR\n[texture]\nfile=a.dds\nname=SKIN\n").unwrap();
        assert_eq!(cfg.textures[0].name, "CAR_SKIN");
    }

    #[test]
    fn test_empty_xname_still_prefixes() {
        let cfg = config("[tpk]\nxname=\n[texture]\nfile=a.dds\nname=SKIN\n").unwrap();
        assert_eq!(cfg.textures[0].name, "_SKIN");
        assert_eq!(tpk_hash(&cfg.textures[0].name), 0x0490_BB73);

        let cfg = config("[tpk]\n[texture]\nfile=a.dds\nname=SKIN\n").unwrap();
        assert_eq!(cfg.textures[0].name, "SKIN");
    }

    #[test]
    fn test_missing_name() {
        let err = config("[tpk]\n[texture]\nfile=a.dds\n[texture]\nfile=b.dds\n").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingConfigValue { index: Some(0), ref key, .. } if key == "name"
        ));
    }

    #[test]
    fn test_long_texture_name() {
        let err = config("[tpk]\n[texture]\nfile=a.dds\nname=ABCDEFGHIJKLMNOPQRSTUVWXYZ\n").unwrap_err();
        assert!(matches!(err.root(), Error::NameTooLong { max: 0x18, .. }));
        assert!(matches!(err, Error::Texture { index: 0, .. }));
    }

    #[test]
    fn test_long_identifier() {
        let err = config(&format!("[tpk]\nidentifier={}\n", "X".repeat(0x1D))).unwrap_err();
        assert!(matches!(err, Error::NameTooLong { max: 0x1C, .. }));
    }
}
