//! TPK package inspection

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::formats::tpk::{Chunk, PackagedTexture, TpkFile};

#[derive(Serialize)]
struct PackageSummary<'a> {
    name: &'a str,
    path: &'a str,
    file_hash: u32,
    size_bytes: u64,
    textures: &'a [PackagedTexture],
    warnings: &'a [String],
}

pub fn execute(path: &Path, detailed: bool, json: bool) -> anyhow::Result<()> {
    let tpk = TpkFile::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let size_bytes = std::fs::metadata(path)?.len();

    let info = tpk.file_info()?;
    let textures = tpk.textures()?;
    let warnings = tpk.consistency_warnings()?;

    if json {
        let summary = PackageSummary {
            name: &info.name,
            path: &info.path,
            file_hash: info.file_hash,
            size_bytes,
            textures: &textures,
            warnings: &warnings,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== TPK Package ===\n");
    println!("File: {} ({} bytes)", path.display(), size_bytes);
    println!("Name: {}", info.name);
    println!("Pipeline path: {}", info.path);
    println!("File hash: {:#010X}\n", info.file_hash);

    println!("=== Textures ({}) ===", textures.len());
    for tex in &textures {
        println!(
            "{:08X}  {:<24} {:>5}x{:<5} {}{}",
            tex.hash,
            tex.name,
            tex.width,
            tex.height,
            tex.format,
            if tex.has_alpha { " alpha" } else { "" }
        );
        if detailed {
            println!(
                "          offset {:#x}  length {:#x}  pitch {:#x}  memory {:#x}  usage {:#010x}",
                tex.offset, tex.length, tex.pitch, tex.memory_offset, tex.usage
            );
        }
    }

    if detailed {
        println!("\n=== Chunks ===");
        for chunk in &tpk.chunks {
            print_chunk(chunk, 0);
        }
    }

    if !warnings.is_empty() {
        println!("\n=== Warnings ===");
        for warning in &warnings {
            println!("  {warning}");
        }
    }

    Ok(())
}

fn print_chunk(chunk: &Chunk, depth: usize) {
    println!("{:indent$}{} {} bytes", "", chunk.id(), chunk.body_len(), indent = depth * 2);
    for child in chunk.children() {
        print_chunk(child, depth + 1);
    }
}
