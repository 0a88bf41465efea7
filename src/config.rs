use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::settings::MigrationConfig;

/// Runtime configuration for a migration run.
///
/// Bridges the validated `MigrationConfig` settings with the filesystem
/// layout of one run: where sources come from, where migrated output
/// goes, and where the tracker and reports live.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source artifact file, or directory for batch runs.
    pub source: PathBuf,
    /// Root of the migrated output tree.
    pub target_root: PathBuf,
    /// Base directory for dependency resolution.
    pub base_dir: PathBuf,
    /// Run state directory (`<target>/.crucible`).
    pub state_dir: PathBuf,
    pub tracker_file: PathBuf,
    pub report_dir: PathBuf,
    pub settings: MigrationConfig,
    pub verbose: bool,
}

impl Config {
    pub fn new(
        source: PathBuf,
        target_root: PathBuf,
        settings_file: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self> {
        let source = source
            .canonicalize()
            .with_context(|| format!("Failed to resolve source path {}", source.display()))?;

        let base_dir = if source.is_dir() {
            source.clone()
        } else {
            source
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| source.clone())
        };

        let settings_file = settings_file.or_else(|| {
            let default = PathBuf::from("crucible.toml");
            default.exists().then_some(default)
        });
        let settings =
            MigrationConfig::load(settings_file.as_deref()).context("Invalid migration settings")?;

        let state_dir = target_root.join(".crucible");
        let tracker_file = state_dir.join("tracker.json");
        let report_dir = state_dir.join("reports");

        Ok(Self {
            source,
            target_root,
            base_dir,
            state_dir,
            tracker_file,
            report_dir,
            settings,
            verbose,
        })
    }

    /// Batch mode processes every source under a directory.
    pub fn is_batch(&self) -> bool {
        self.source.is_dir()
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).context("Failed to create state directory")?;
        std::fs::create_dir_all(&self.report_dir).context("Failed to create report directory")?;
        Ok(())
    }
}
