//! Source artifact identity and content access.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single source unit to be migrated, identified by a stable path.
///
/// Identity never changes within a run; content is read on demand and may
/// be re-read, but the id an artifact was discovered under is the id it
/// keeps in the tracker and the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Stable identifier used as the tracker key.
    pub fn id(&self) -> String {
        self.path.display().to_string()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component, or the full id when the path has no file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id())
    }

    /// File stem used as the component name by the built-in phases.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id())
    }

    /// Read the artifact content from disk.
    pub fn read_content(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Hex sha256 of artifact content, used as the resolver cache key.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_identity() {
        let artifact = Artifact::new("/src/app/UserGrid.js");
        assert_eq!(artifact.id(), "/src/app/UserGrid.js");
        assert_eq!(artifact.file_name(), "UserGrid.js");
        assert_eq!(artifact.stem(), "UserGrid");
    }

    #[test]
    fn test_read_content_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Grid.js");
        fs::write(&path, "Ext.define('App.Grid', {});").unwrap();

        let artifact = Artifact::new(&path);
        assert_eq!(artifact.read_content().unwrap(), "Ext.define('App.Grid', {});");
    }

    #[test]
    fn test_read_content_missing_file_errors() {
        let artifact = Artifact::new("/nonexistent/Grid.js");
        assert!(artifact.read_content().is_err());
    }

    #[test]
    fn test_content_hash_deterministic() {
        let a = content_hash("same content");
        let b = content_hash("same content");
        let c = content_hash("different content");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
