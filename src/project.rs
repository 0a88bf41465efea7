//! Source tree scanning and target-side layout.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never scanned for source artifacts.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".angular",
    "dist",
    "build",
    "ext",
    "extjs",
];

/// Recursively enumerate migratable `.js` sources under `source_dir`,
/// sorted for deterministic batch order. Minified vendor files are
/// excluded.
pub fn scan_sources(source_dir: &Path) -> Result<Vec<PathBuf>> {
    if !source_dir.is_dir() {
        bail!("Source directory not found: {}", source_dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(source_dir)
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                !SKIPPED_DIRS.contains(&name.as_ref())
            } else {
                true
            }
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "js")
                && !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with(".min.js"))
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Target-side directory layout for migrated output.
#[derive(Debug, Clone)]
pub struct TargetLayout {
    root: PathBuf,
}

impl TargetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one component inside its feature area.
    pub fn feature_dir(&self, category: &str, component: &str) -> PathBuf {
        self.root.join("features").join(category).join(component)
    }

    /// Directory for shared utilities of the given kind.
    pub fn shared_dir(&self, kind: &str) -> PathBuf {
        self.root.join("shared").join(kind)
    }

    /// Create the base layout if it does not exist yet. Idempotent.
    pub fn ensure_scaffold(&self) -> Result<()> {
        for dir in [self.root.join("features"), self.root.join("shared")] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create target directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_finds_js_files_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/view")).unwrap();
        fs::write(dir.path().join("app/view/Grid.js"), "").unwrap();
        fs::write(dir.path().join("app/App.js"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let files = scan_sources(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("app/App.js"));
        assert!(files[1].ends_with("app/view/Grid.js"));
    }

    #[test]
    fn test_scan_skips_vendor_dirs_and_minified_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "").unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/vendor.min.js"), "").unwrap();
        fs::write(dir.path().join("app/Main.js"), "").unwrap();

        let files = scan_sources(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app/Main.js"));
    }

    #[test]
    fn test_scan_missing_dir_errors() {
        let dir = tempdir().unwrap();
        assert!(scan_sources(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_layout_paths_and_scaffold() {
        let dir = tempdir().unwrap();
        let layout = TargetLayout::new(dir.path().join("out"));

        assert!(
            layout
                .feature_dir("users", "user-grid")
                .ends_with("out/features/users/user-grid")
        );
        assert!(layout.shared_dir("services").ends_with("out/shared/services"));

        layout.ensure_scaffold().unwrap();
        layout.ensure_scaffold().unwrap();
        assert!(dir.path().join("out/features").is_dir());
        assert!(dir.path().join("out/shared").is_dir());
    }
}
