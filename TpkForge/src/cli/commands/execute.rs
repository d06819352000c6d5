//! Command execution implementations

use super::Commands;
use super::{build, extract, hash, inspect};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Build {
                manifest,
                output,
                parallel,
                quiet,
            } => build::execute(manifest, output.as_deref(), *parallel, *quiet),
            Commands::Inspect {
                tpk,
                detailed,
                json,
            } => inspect::execute(tpk, *detailed, *json),
            Commands::Extract {
                tpk,
                destination,
                name,
                hash,
            } => extract::execute(tpk, destination, name.as_deref(), hash.as_deref()),
            Commands::Hash { values } => {
                hash::execute(values);
                Ok(())
            }
        }
    }
}
