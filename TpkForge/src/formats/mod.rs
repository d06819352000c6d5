//! File format implementations
//!
//! - [`dds`] - the minimal DDS header reader/writer used for source textures
//! - [`tpk`] - the TPK chunk container, its records and texture blobs

pub mod common;
pub mod dds;
pub mod tpk;
