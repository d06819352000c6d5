//! Texture package compiler
//!
//! Turns a [`PackageConfig`] (usually loaded from a manifest) into a finished
//! TPK file.
//!
//! # Example
//!
//! ```no_run
//! use tpkforge::compiler::TpkCompiler;
//!
//! let result = TpkCompiler::from_manifest("cars/textures.txt")?
//!     .parallel(true)
//!     .build()?;
//! println!("wrote {} textures to {}", result.texture_count, result.output.display());
//! # Ok::<(), tpkforge::error::Error>(())
//! ```

pub mod config;
pub mod layout;
pub mod texture;

pub use config::{DEFAULT_OUTPUT, PackageConfig, TextureEntry, TextureUsage};
pub use layout::{LayoutPlan, TextureLayoutRecord};
pub use texture::{CompiledTexture, assign_memory_offsets, compile_entry, compile_image};

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::formats::tpk::{
    CHUNK_HEADER_SIZE, Chunk, ChunkId, Container, DataRaw, FileInfo, HashList, HeadLink, NullChunk,
    TpkFile,
};
use self::layout::{DATA_NULL_SIZE, ROOT_NULL_SIZE, sort_by_hash};

/// Compile progress phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilePhase {
    /// Reading and converting source textures
    CompilingTextures,
    /// Sorting by hash and assigning offsets
    Layout,
    /// Building and serializing the chunk tree
    Assembling,
    /// Writing the output file
    Writing,
    /// Compilation complete
    Complete,
}

impl CompilePhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::CompilingTextures => "Compiling textures",
            Self::Layout => "Computing layout",
            Self::Assembling => "Assembling package",
            Self::Writing => "Writing package",
            Self::Complete => "Complete",
        }
    }
}

/// Progress information during compilation
#[derive(Debug, Clone)]
pub struct CompileProgress {
    /// Current phase
    pub phase: CompilePhase,
    /// Current item index (0-based)
    pub current: usize,
    /// Total items in this phase
    pub total: usize,
    /// Optional message with details
    pub message: Option<String>,
}

impl CompileProgress {
    #[must_use]
    pub fn new(phase: CompilePhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(phase: CompilePhase, current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            message: Some(message.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// An in-memory package
#[derive(Debug, Clone)]
pub struct CompiledPackage {
    /// The serialized file
    pub bytes: Vec<u8>,
    pub plan: LayoutPlan,
    /// The chunk tree `bytes` was serialized from
    pub tpk: TpkFile,
}

/// Result of writing a package
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub output: PathBuf,
    pub texture_count: usize,
    pub size_bytes: u64,
}

/// Builder-style package compiler
#[derive(Debug, Clone)]
pub struct TpkCompiler {
    config: PackageConfig,
    parallel: bool,
}

impl TpkCompiler {
    #[must_use]
    pub fn new(config: PackageConfig) -> Self {
        Self {
            config,
            parallel: false,
        }
    }

    /// Load a manifest file and create a compiler for it
    pub fn from_manifest<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(PackageConfig::load(path)?))
    }

    /// Compile source textures on the rayon pool
    #[must_use]
    pub fn parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }

    /// Override the output path
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Compile to memory
    pub fn compile(&self) -> Result<CompiledPackage> {
        self.compile_with_progress(|_| {})
    }

    /// Compile to memory with progress reporting
    pub fn compile_with_progress<F>(&self, progress: F) -> Result<CompiledPackage>
    where
        F: Fn(&CompileProgress) + Send + Sync,
    {
        self.config.validate()?;
        let entries = &self.config.textures;
        let total = entries.len();
        tracing::info!(
            "Compiling {} textures for '{}' ({})",
            total,
            self.config.identifier,
            self.config.pipeline_path
        );

        // Phase: per-texture synthesis
        progress(&CompileProgress::new(CompilePhase::CompilingTextures, 0, total));
        let processed = AtomicUsize::new(0);
        let compile_one = |entry: &TextureEntry| {
            let result = compile_entry(entry);
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(&CompileProgress::with_message(
                CompilePhase::CompilingTextures,
                done,
                total,
                entry.name.clone(),
            ));
            result
        };
        let results: Vec<Result<CompiledTexture>> = if self.parallel {
            entries.par_iter().map(compile_one).collect()
        } else {
            entries.iter().map(compile_one).collect()
        };
        // First failure in manifest order wins
        let mut textures = results.into_iter().collect::<Result<Vec<_>>>()?;
        assign_memory_offsets(&mut textures)?;
        for t in &textures {
            let info = &t.blob.info;
            tracing::debug!("{} {:08x} {}x{} {}", t.name(), t.hash(), info.width, info.height, t.format.as_str());
        }

        // Phase: layout
        progress(&CompileProgress::new(CompilePhase::Layout, 0, 1));
        let mut records = textures
            .iter()
            .map(|t| TextureLayoutRecord::new(t.hash(), t.name(), t.blob.to_bytes()?))
            .collect::<Result<Vec<_>>>()?;
        sort_by_hash(&mut records)?;
        let plan = LayoutPlan::assign(&mut records)?;
        tracing::debug!(
            "layout: header {:#x}, pad {:#x}, data {:#x}..{:#x}",
            plan.header_bytes,
            plan.pad_to_data,
            plan.data_base,
            plan.data_end
        );

        // Phase: assemble and serialize
        progress(&CompileProgress::new(CompilePhase::Assembling, 0, 1));
        let tpk = assemble(self.config.file_info(), &plan, &records)?;
        let bytes = tpk.to_bytes()?;

        progress(&CompileProgress::new(CompilePhase::Complete, 1, 1));
        Ok(CompiledPackage { bytes, plan, tpk })
    }

    /// Compile and write the package to the configured output
    pub fn build(&self) -> Result<CompileResult> {
        self.build_with_progress(|_| {})
    }

    /// Compile and write the package with progress reporting.
    ///
    /// Nothing is written unless the whole compilation succeeds.
    pub fn build_with_progress<F>(&self, progress: F) -> Result<CompileResult>
    where
        F: Fn(&CompileProgress) + Send + Sync,
    {
        let package = self.compile_with_progress(|p| {
            if p.phase != CompilePhase::Complete {
                progress(p);
            }
        })?;

        let output = &self.config.output;
        progress(&CompileProgress::with_message(
            CompilePhase::Writing,
            0,
            1,
            output.display().to_string(),
        ));
        write_atomic(output, &package.bytes)?;
        tracing::info!("Wrote {} ({} bytes)", output.display(), package.bytes.len());

        progress(&CompileProgress::new(CompilePhase::Complete, 1, 1));
        Ok(CompileResult {
            output: output.clone(),
            texture_count: package.plan.count,
            size_bytes: package.bytes.len() as u64,
        })
    }
}

/// Build the chunk tree for hash-sorted, offset-assigned records
pub fn assemble(file_info: FileInfo, plan: &LayoutPlan, records: &[TextureLayoutRecord]) -> Result<TpkFile> {
    let table = LayoutPlan::offset_table(records)?;
    let hashes = HashList::new(table.hashes().collect());
    let link = HeadLink::new(file_info.file_hash);

    let head = Container::new(ChunkId::HEAD)
        .with(file_info)
        .with(hashes)
        .with(table);
    let data = Container::new(ChunkId::DATA)
        .with(link)
        .with(NullChunk::new(DATA_NULL_SIZE))
        .with(DataRaw::at_position(plan.build_raw(records)?, plan.raw_position()));
    let root = Container::new(ChunkId::TEXTURE_ROOT)
        .with(NullChunk::new(ROOT_NULL_SIZE))
        .with(head)
        .with(NullChunk::new(plan.pad_to_data))
        .with(data);

    check_tree_positions(&root, plan)?;
    Ok(TpkFile::new(vec![root.into()]))
}

/// The serialized tree must place the head end and raw body where the plan
/// computed them
fn check_tree_positions(root: &Container, plan: &LayoutPlan) -> Result<()> {
    let header = u64::from(CHUNK_HEADER_SIZE);
    let [leading, head, padding, Chunk::Container(data)] = root.children.as_slice() else {
        return Err(Error::LayoutInvariant {
            message: "unexpected root layout".to_string(),
        });
    };

    let head_end = header + leading.encoded_len() + head.encoded_len();
    if head_end != plan.header_bytes {
        return Err(Error::LayoutInvariant {
            message: format!("head ends at {head_end:#x}, expected {:#x}", plan.header_bytes),
        });
    }

    let before_raw: u64 = data
        .children
        .iter()
        .take_while(|c| c.id() != ChunkId::DATA_RAW)
        .map(Chunk::encoded_len)
        .sum();
    let raw_body = head_end + padding.encoded_len() + header + before_raw + header;
    if raw_body != plan.raw_position() {
        return Err(Error::LayoutInvariant {
            message: format!("raw data starts at {raw_body:#x}, expected {:#x}", plan.raw_position()),
        });
    }
    Ok(())
}

/// Write `bytes` to a temporary file next to `path`, then move it into place
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::PersistFailed {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;
    Ok(())
}
