use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tpkforge::formats::tpk::{Container, UnknownChunk};
use tpkforge::prelude::*;

fn write_dds(dir: &Path, file: &str, width: u32, height: u32, format: TextureFormat) {
    let pitch = match format {
        TextureFormat::Dxt1 => width * height / 2,
        TextureFormat::Dxt3 => width * height,
    };
    let image = DdsImage::new_compressed(width, height, format, vec![0xA5; pitch as usize]);
    std::fs::write(dir.join(file), image.to_bytes().unwrap()).unwrap();
}

fn write_manifest(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("textures.ini");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_single_texture_package() {
    let dir = tempdir().unwrap();
    write_dds(dir.path(), "foo.dds", 256, 128, TextureFormat::Dxt1);
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = FOO\npipelinepath = GLOBAL\\FOO.BIN\noutput = FOO.BIN\n\n[texture]\nfile = foo.dds\nname = foo\n",
    );

    let result = TpkCompiler::from_manifest(&manifest).unwrap().build().unwrap();
    assert_eq!(result.output, dir.path().join("FOO.BIN"));
    assert_eq!(result.texture_count, 1);

    let tpk = TpkFile::read(&result.output).unwrap();
    let info = tpk.file_info().unwrap();
    assert_eq!(info.name, "FOO");
    assert_eq!(info.path, "GLOBAL\\FOO.BIN");
    assert_eq!(info.file_hash, tpk_hash("GLOBAL\\FOO.BIN"));
    assert_eq!(tpk.head_link().unwrap().file_hash, info.file_hash);

    let hash = tpk_hash("foo");
    assert_eq!(tpk.hash_list().unwrap().hashes, vec![hash]);

    let pitch = 256 * 128 / 2;
    let entry = tpk.entry(hash).unwrap();
    assert_eq!(entry.offset, 0x280);
    assert_eq!(entry.length, pitch + 0xAC);
    assert_eq!(entry.real_length, entry.length - 0x10);

    let blob = tpk.texture(hash).unwrap();
    assert_eq!(blob.info.name, "foo");
    assert_eq!(blob.info.width, 256);
    assert_eq!(blob.info.height, 128);
    assert_eq!(blob.info.pitch, pitch);
    assert_eq!(blob.info.d1, 0x220708);
    assert_eq!(blob.info.d4, 0x0100_0000);
    assert_eq!(blob.info.alpha, 0);
    assert_eq!(blob.info.d3d_format, TextureFormat::Dxt1.fourcc());
    assert_eq!(blob.pixels.len(), pitch as usize);
    assert!(tpk.consistency_warnings().unwrap().is_empty());
}

#[test]
fn test_offsets_ascend_by_hash_and_align() {
    let dir = tempdir().unwrap();
    let names = ["alpha", "bravo", "charlie", "delta"];
    let mut manifest = String::from("[tpk]\nidentifier = MULTI\npipelinepath = MULTI.BIN\n");
    for (i, name) in names.iter().enumerate() {
        let format = if i % 2 == 0 { TextureFormat::Dxt1 } else { TextureFormat::Dxt3 };
        write_dds(dir.path(), &format!("{name}.dds"), 8 << i, 8, format);
        manifest.push_str(&format!("\n[texture]\nfile = {name}.dds\nname = {name}\n"));
    }
    let manifest = write_manifest(dir.path(), &manifest);

    let result = TpkCompiler::from_manifest(&manifest).unwrap().build().unwrap();
    let tpk = TpkFile::read(&result.output).unwrap();

    let textures = tpk.textures().unwrap();
    assert_eq!(textures.len(), names.len());

    let hashes: Vec<u32> = textures.iter().map(|t| t.hash).collect();
    let mut sorted = hashes.clone();
    sorted.sort_unstable();
    assert_eq!(hashes, sorted);
    assert_eq!(tpk.hash_list().unwrap().hashes, sorted);

    for pair in textures.windows(2) {
        assert!(pair[0].offset + pair[0].length <= pair[1].offset);
    }
    for tex in &textures {
        assert_eq!(tex.offset % 0x40, 0);
        assert_eq!(tex.has_alpha, tex.format == "DXT3");
    }
}

#[test]
fn test_duplicate_name_writes_nothing() {
    let dir = tempdir().unwrap();
    write_dds(dir.path(), "a.dds", 8, 8, TextureFormat::Dxt1);
    write_dds(dir.path(), "b.dds", 8, 8, TextureFormat::Dxt1);
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = DUP\npipelinepath = DUP.BIN\n\n[texture]\nfile = a.dds\nname = same\n\n[texture]\nfile = b.dds\nname = same\n",
    );

    let err = TpkCompiler::from_manifest(&manifest).unwrap().build().unwrap_err();
    assert!(matches!(err.root(), Error::DuplicateHash { .. }));
    assert!(!dir.path().join("TEXTURES.BIN").exists());
}

#[test]
fn test_unsupported_format_writes_nothing() {
    let dir = tempdir().unwrap();
    let image = DdsImage::new_compressed(8, 8, TextureFormat::Dxt1, vec![0; 32]);
    let mut bytes = image.to_bytes().unwrap();
    bytes[84..88].copy_from_slice(&0x3554_5844u32.to_le_bytes()); // 'DXT5'
    std::fs::write(dir.path().join("bad.dds"), bytes).unwrap();
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = BAD\npipelinepath = BAD.BIN\noutput = BAD.BIN\n\n[texture]\nfile = bad.dds\nname = bad\n",
    );

    let err = TpkCompiler::from_manifest(&manifest).unwrap().build().unwrap_err();
    assert!(matches!(err, Error::Texture { index: 0, .. }));
    assert!(matches!(err.root(), Error::UnsupportedFormat { fourcc: 0x3554_5844, .. }));
    assert!(!dir.path().join("BAD.BIN").exists());
}

#[test]
fn test_xname_prefix_and_relative_paths() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("art")).unwrap();
    write_dds(&dir.path().join("art"), "skin.dds", 16, 16, TextureFormat::Dxt3);
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = CAR\npipelinepath = CARS\\CAR.BIN\nxname = CAR\noutput = out\\CAR.BIN\n\n[texture]\nfile = art\\skin.dds\nname = SKIN\nusage = type1\nflaga = 1\n",
    );

    let result = TpkCompiler::from_manifest(&manifest).unwrap().build().unwrap();
    assert_eq!(result.output, dir.path().join("out").join("CAR.BIN"));

    let tpk = TpkFile::read(&result.output).unwrap();
    let blob = tpk.texture_by_name("CAR_SKIN").unwrap();
    assert_eq!(blob.info.hash, tpk_hash("CAR_SKIN"));
    assert_eq!(blob.info.usage, TextureUsage::Type1.value());
    assert_eq!(blob.info.d3, 0x500);
    assert_eq!(blob.info.d4, 0x10200);
    assert!(matches!(tpk.texture_by_name("SKIN"), Err(Error::TextureNotFound(_))));
}

#[test]
fn test_unknown_chunks_are_preserved() {
    let dir = tempdir().unwrap();
    write_dds(dir.path(), "x.dds", 32, 32, TextureFormat::Dxt1);
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = X\npipelinepath = X.BIN\n\n[texture]\nfile = x.dds\nname = x\n",
    );
    let package = TpkCompiler::from_manifest(&manifest).unwrap().compile().unwrap();

    let mut tpk = package.tpk;
    let Chunk::Container(root) = &mut tpk.chunks[0] else {
        panic!("root is not a container");
    };
    root.push(Container::new(ChunkId(0x8000_1234)).with(UnknownChunk {
        id: ChunkId(0x1234_5678),
        data: vec![1, 2, 3, 4],
    }));
    let bytes = tpk.to_bytes().unwrap();

    let reread = TpkFile::from_bytes(&bytes).unwrap();
    assert_eq!(reread, tpk);
    let unknown = reread.find(ChunkId(0x1234_5678)).unwrap();
    assert_eq!(unknown.body_len(), 4);
    assert_eq!(reread.texture_by_name("x").unwrap().info.width, 32);
}

#[test]
fn test_truncated_package_is_rejected() {
    let dir = tempdir().unwrap();
    write_dds(dir.path(), "t.dds", 8, 8, TextureFormat::Dxt1);
    let manifest = write_manifest(
        dir.path(),
        "[tpk]\nidentifier = T\npipelinepath = T.BIN\n\n[texture]\nfile = t.dds\nname = t\n",
    );
    let package = TpkCompiler::from_manifest(&manifest).unwrap().compile().unwrap();

    let truncated = &package.bytes[..package.bytes.len() - 16];
    assert!(matches!(TpkFile::from_bytes(truncated), Err(Error::InvalidChunk { .. })));
}
