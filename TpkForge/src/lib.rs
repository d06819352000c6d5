//! # TpkForge
//!
//! A pure-Rust compiler and inspector for TPK texture packages, the chunked
//! texture containers used by Need for Speed: Most Wanted era games.
//!
//! ## Quick Start
//!
//! ### Building a package from a manifest
//!
//! ```no_run
//! use tpkforge::compiler::TpkCompiler;
//!
//! let result = TpkCompiler::from_manifest("textures.txt")?.build()?;
//! println!("{} textures, {} bytes", result.texture_count, result.size_bytes);
//! # Ok::<(), tpkforge::Error>(())
//! ```
//!
//! ### Reading a package
//!
//! ```no_run
//! use tpkforge::formats::tpk::TpkFile;
//!
//! let tpk = TpkFile::read("TEXTURES.BIN")?;
//! for texture in tpk.textures()? {
//!     println!("{:08x} {} {}x{}", texture.hash, texture.name, texture.width, texture.height);
//! }
//! # Ok::<(), tpkforge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `tpkforge` command-line binary

pub mod compiler;
pub mod error;
pub mod formats;
pub mod manifest;
pub mod utils;

pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::compiler::{
        CompilePhase, CompileProgress, CompileResult, PackageConfig, TextureEntry, TextureUsage,
        TpkCompiler,
    };
    pub use crate::error::{Error, Result};
    pub use crate::formats::dds::{DdsImage, TextureFormat};
    pub use crate::formats::tpk::{Chunk, ChunkId, PackagedTexture, TextureBlob, TextureInfo, TpkFile};
    pub use crate::manifest::{Manifest, ManifestSource};
    pub use crate::utils::tpk_hash;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
