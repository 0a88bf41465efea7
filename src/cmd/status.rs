use anyhow::{Context, Result, bail};
use crucible::tracker::read_tracker_file;
use std::path::PathBuf;

pub fn execute(target: PathBuf) -> Result<()> {
    let tracker_path = target.join(".crucible/tracker.json");
    if !tracker_path.exists() {
        bail!(
            "No tracker state at {} - nothing has been migrated yet",
            tracker_path.display()
        );
    }

    let file = read_tracker_file(&tracker_path)
        .with_context(|| format!("Failed to read tracker at {}", tracker_path.display()))?;

    println!("Tracker: {}", tracker_path.display());
    println!("  Started:      {}", file.start_time);
    println!("  Last updated: {}", file.last_updated);
    println!("  Processed:    {}", file.processed.len());
    println!("  Failed:       {}", file.failed.len());
    println!("  Skipped:      {}", file.skipped.len());
    println!("  Queued:       {}", file.queue.len());
    println!("  Success rate: {:.1}%", file.statistics.success_rate);

    if !file.failed.is_empty() {
        println!();
        println!("Failed artifacts:");
        for record in file.failed.values() {
            println!("  {}: {}", record.file_name, record.reason);
        }
    }

    Ok(())
}
