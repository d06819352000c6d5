use clap::Subcommand;
use std::path::PathBuf;

pub mod build;
pub mod execute;
pub mod extract;
pub mod hash;
pub mod inspect;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a texture manifest into a TPK package
    Build {
        /// Manifest file
        manifest: PathBuf,

        /// Output file (overrides the manifest's `output` value)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read and convert source textures in parallel
        #[arg(long)]
        parallel: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the contents of a TPK package
    Inspect {
        /// TPK file
        tpk: PathBuf,

        /// Show per-texture metadata and layout details
        #[arg(short, long)]
        detailed: bool,

        /// Print the texture list as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,
    },

    /// Extract textures from a TPK package as DDS files
    Extract {
        /// TPK file
        tpk: PathBuf,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,

        /// Only extract the texture with this name
        #[arg(long, conflicts_with = "hash")]
        name: Option<String>,

        /// Only extract the texture with this hash (hex, with or without 0x)
        #[arg(long, conflicts_with = "name")]
        hash: Option<String>,
    },

    /// Print the TPK hash of one or more strings
    Hash {
        /// Strings to hash
        #[arg(required = true)]
        values: Vec<String>,
    },
}
