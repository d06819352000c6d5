//! Error types for `TpkForge`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `TpkForge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to persist the finished package to its destination.
    #[error("failed to write package to {path}: {message}")]
    PersistFailed {
        /// The destination path.
        path: PathBuf,
        /// The underlying error message.
        message: String,
    },

    // ==================== DDS Source Errors ====================
    /// The file is not a valid DDS file (missing "DDS " magic).
    #[error("invalid DDS magic: expected 'DDS ', found {0:#010x}")]
    InvalidDdsMagic(u32),

    /// The DDS data ended before a required section was complete.
    #[error("truncated DDS: {what}")]
    DdsTruncated {
        /// Which section was cut short.
        what: &'static str,
    },

    /// The DDS header is well-formed but its values cannot be packaged.
    #[error("invalid DDS: {message}")]
    InvalidDds {
        /// Description of what is invalid.
        message: String,
    },

    /// DDS encoding error while writing an extracted surface.
    #[error("DDS error: {0}")]
    DdsError(String),

    /// The DDS uses a pixel format other than DXT1 or DXT3.
    #[error("unsupported texture format: fourcc {fourcc:#010x} (flags {flags:#x}); only DXT1 and DXT3 are supported")]
    UnsupportedFormat {
        /// The raw fourcc / format word from the pixel format block.
        fourcc: u32,
        /// The pixel format flags.
        flags: u32,
    },

    // ==================== Manifest / Config Errors ====================
    /// The manifest text could not be parsed.
    #[error("manifest parse error on line {line}: {message}")]
    ManifestParse {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A required manifest value is missing.
    #[error("missing manifest value [{section}]{} '{key}'", entry_suffix(.index.as_ref()))]
    MissingConfigValue {
        /// The section name.
        section: String,
        /// Entry index for repeated sections.
        index: Option<usize>,
        /// The key that was expected.
        key: String,
    },

    /// A string does not fit its fixed-width field.
    #[error("name '{name}' is longer than {max} bytes")]
    NameTooLong {
        /// The offending string.
        name: String,
        /// Maximum field width in bytes.
        max: usize,
    },

    /// A string stored in a fixed-width ASCII field contains non-ASCII characters.
    #[error("name '{name}' contains non-ASCII characters")]
    NonAsciiName {
        /// The offending string.
        name: String,
    },

    // ==================== Packaging Errors ====================
    /// Two textures resolve to the same hash.
    #[error("duplicate texture hash {hash:#010x}: '{first}' and '{second}'")]
    DuplicateHash {
        /// The colliding hash.
        hash: u32,
        /// Name of the texture that claimed the hash first.
        first: String,
        /// Name of the texture that collided.
        second: String,
    },

    /// Layout computation produced inconsistent offsets (internal defect).
    #[error("layout invariant violated: {message}")]
    LayoutInvariant {
        /// Description of the violated invariant.
        message: String,
    },

    /// A texture entry failed to compile.
    #[error("texture #{index} ('{name}'): {source}")]
    Texture {
        /// 0-based manifest entry index.
        index: usize,
        /// Display name, or source file when the name is not known yet.
        name: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    // ==================== TPK Container Errors ====================
    /// A chunk header or body is inconsistent with its surroundings.
    #[error("invalid chunk at offset {offset:#x}: {message}")]
    InvalidChunk {
        /// Absolute offset of the chunk header.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// A chunk body is too large for its 32-bit length field.
    #[error("chunk body too large: {size} bytes")]
    ChunkTooLarge {
        /// The body size in bytes.
        size: u64,
    },

    /// The package has no chunk of the requested kind.
    #[error("package has no {0} chunk")]
    MissingChunk(&'static str),

    /// The requested texture is not in the package.
    #[error("texture not found in package: {0}")]
    TextureNotFound(String),

    /// A texture blob inside the package is malformed.
    #[error("invalid texture blob: {message}")]
    InvalidTextureBlob {
        /// Description of the problem.
        message: String,
    },
}

impl Error {
    /// Wrap an error with the manifest entry it belongs to.
    #[must_use]
    pub fn for_texture(self, index: usize, name: impl Into<String>) -> Self {
        Error::Texture {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`Error::Texture`] wrappers.
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Error::Texture { source, .. } => source.root(),
            other => other,
        }
    }
}

fn entry_suffix(index: Option<&usize>) -> String {
    index.map(|i| format!(" #{i}")).unwrap_or_default()
}

/// A specialized Result type for `TpkForge` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_texture_context() {
        let err = Error::UnsupportedFormat { fourcc: 21, flags: 0x40 }.for_texture(2, "car_skin");
        assert!(matches!(err.root(), Error::UnsupportedFormat { fourcc: 21, .. }));
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("car_skin"));
    }

    #[test]
    fn test_missing_value_message() {
        let err = Error::MissingConfigValue {
            section: "texture".into(),
            index: Some(3),
            key: "file".into(),
        };
        assert_eq!(err.to_string(), "missing manifest value [texture] #3 'file'");
    }
}
