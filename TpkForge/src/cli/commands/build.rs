//! CLI command for compiling a manifest

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::cli::progress::{DISK, LOOKING_GLASS, PACKAGE, print_done, print_step, simple_bar};
use crate::compiler::{CompilePhase, TpkCompiler};

pub fn execute(manifest: &Path, output: Option<&Path>, parallel: bool, quiet: bool) -> anyhow::Result<()> {
    let started = Instant::now();

    if !quiet {
        print_step(1, 3, LOOKING_GLASS, &format!("Reading {}", manifest.display()));
    }
    let mut compiler = TpkCompiler::from_manifest(manifest)
        .with_context(|| format!("failed to load manifest {}", manifest.display()))?
        .parallel(parallel);
    if let Some(path) = output {
        compiler = compiler.output(path);
    }

    let total = compiler.config().textures.len();
    if !quiet {
        print_step(2, 3, PACKAGE, &format!("Compiling {total} textures"));
    }

    let pb = if quiet {
        None
    } else {
        Some(simple_bar(total as u64, "Compiling"))
    };
    let result = compiler.build_with_progress(|p| {
        tracing::trace!("{}: {:.0}%", p.phase.description(), p.percentage() * 100.0);
        let Some(pb) = &pb else { return };
        match p.phase {
            CompilePhase::CompilingTextures => {
                pb.set_position(p.current as u64);
                if let Some(name) = &p.message {
                    pb.set_message(name.clone());
                }
            }
            CompilePhase::Writing => {
                pb.finish_and_clear();
                print_step(3, 3, DISK, &format!("Writing {}", p.message.as_deref().unwrap_or("package")));
            }
            _ => pb.set_message(p.phase.description()),
        }
    });
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let result = result.context("build failed")?;

    if quiet {
        return Ok(());
    }
    println!(
        "Packaged {} textures into {} ({} bytes)",
        result.texture_count,
        result.output.display(),
        result.size_bytes
    );
    print_done(started.elapsed());
    Ok(())
}
