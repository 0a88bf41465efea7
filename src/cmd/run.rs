use anyhow::Result;
use crucible::config::Config;
use crucible::orchestrator::Orchestrator;
use crucible::ui::{self, MigrationUi};
use std::path::PathBuf;

pub fn execute(
    source: PathBuf,
    target: PathBuf,
    settings_file: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let config = Config::new(source, target, settings_file, verbose)?;
    let mut orchestrator = Orchestrator::new(config)?;
    orchestrator.attach_ui(MigrationUi::new(verbose));

    let report = orchestrator.run()?;
    let failed = orchestrator.tracker().failed_records();
    let skipped = orchestrator.tracker().skipped_records();
    let report_path = orchestrator.save_report(&report)?;

    ui::print_run_summary(&report, &failed, &skipped);
    println!("Report written to {}", report_path.display());

    Ok(())
}
