//! Utility functions

pub mod hash;
pub mod path;

pub use hash::tpk_hash;
pub use path::{normalize_path, resolve_relative};
