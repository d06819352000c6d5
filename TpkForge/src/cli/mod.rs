//! `TpkForge` CLI - build, inspect and unpack TPK texture packages

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tpkforge", version)]
#[command(about = "TpkForge: TPK texture package compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the `TpkForge` CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}

/// `RUST_LOG` directives, or warnings only when unset or malformed
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(Some("tpkforge=debug")).to_string(), "tpkforge=debug");
        assert_eq!(log_filter(None).to_string(), "warn");
    }
}
