use anyhow::{Context, Result, bail};
use std::path::PathBuf;

pub fn execute(target: PathBuf, force: bool) -> Result<()> {
    let tracker_path = target.join(".crucible/tracker.json");

    if !tracker_path.exists() {
        println!("Nothing to reset at {}", tracker_path.display());
        return Ok(());
    }

    if !force {
        bail!(
            "Reset discards all migration progress at {}. Re-run with --force to confirm.",
            tracker_path.display()
        );
    }

    std::fs::remove_file(&tracker_path)
        .with_context(|| format!("Failed to remove {}", tracker_path.display()))?;
    println!("Tracker state cleared: {}", tracker_path.display());
    Ok(())
}
