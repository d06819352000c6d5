//! Path utilities

use std::path::{Path, PathBuf};

/// Normalize path separators to forward slashes (for display and manifests)
pub fn normalize_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Resolve a manifest path against the manifest's own directory.
///
/// Absolute paths are returned unchanged. Backslashes are accepted as
/// separators since manifests are usually authored on Windows.
pub fn resolve_relative<P: AsRef<Path>>(base_dir: P, path: &str) -> PathBuf {
    let normalized = normalize_path(path);
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.as_ref().join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_joins_base() {
        let resolved = resolve_relative("/mods/car", "textures\\body.dds");
        assert_eq!(normalize_path(&resolved), "/mods/car/textures/body.dds");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_absolute_unchanged() {
        let resolved = resolve_relative("/mods/car", "/abs/body.dds");
        assert_eq!(resolved, PathBuf::from("/abs/body.dds"));
    }
}
