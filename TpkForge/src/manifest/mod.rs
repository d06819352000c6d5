//! Texture manifests
//!
//! A manifest is a sectioned `key = value` text file. The `[tpk]` section
//! describes the package; every `[texture]` header opens one more texture
//! entry.
//!
//! ```text
//! [tpk]
//! identifier   = CARS
//! pipelinepath = GLOBAL\CARS.BIN
//! output       = CARS.BIN
//!
//! [texture]
//! file  = skin.dds
//! name  = CAR_SKIN
//! usage = type1
//! ```

mod parser;

pub use parser::Manifest;

/// Section names that repeat; each header starts a new entry
pub const REPEATED_SECTIONS: &[&str] = &["texture"];

/// Lookup interface the compiler reads its configuration through
pub trait ManifestSource {
    /// Value of `key` in a single section
    fn value(&self, section: &str, key: &str) -> Option<&str>;

    /// Value of `key` in entry `index` of a repeated section
    fn indexed_value(&self, section: &str, index: usize, key: &str) -> Option<&str>;

    /// Number of entries of a repeated section (0 when absent)
    fn count(&self, section: &str) -> usize;
}
