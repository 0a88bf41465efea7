//! Terminal output for migration runs, rendered via `indicatif` and
//! `console`.

use crate::orchestrator::ExecutionReport;
use crate::tracker::{FailedRecord, SkippedRecord};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Single progress bar over the artifact queue.
pub struct MigrationUi {
    bar: ProgressBar,
    verbose: bool,
}

impl MigrationUi {
    pub fn new(verbose: bool) -> Self {
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new(0);
        bar.set_style(bar_style);
        bar.set_prefix("Artifacts");

        Self { bar, verbose }
    }

    pub fn set_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    pub fn artifact_started(&self, id: &str) {
        let name = std::path::Path::new(id)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        self.bar.set_message(name);
    }

    pub fn artifact_finished(&self, id: &str, passed: bool) {
        self.bar.inc(1);
        if self.verbose {
            let name = std::path::Path::new(id)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.to_string());
            let marker = if passed {
                style("ok").green()
            } else {
                style("failed").red()
            };
            self.bar.println(format!("  {marker} {name}"));
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Print the end-of-run summary.
pub fn print_run_summary(
    report: &ExecutionReport,
    failed: &[FailedRecord],
    skipped: &[SkippedRecord],
) {
    let stats = &report.statistics;

    println!();
    println!("{}", style("Migration summary").bold());
    println!(
        "  {} processed, {} failed, {} skipped, {} remaining",
        style(stats.total_processed).green(),
        style(stats.total_failed).red(),
        style(stats.total_skipped).yellow(),
        stats.remaining_in_queue,
    );
    println!(
        "  Success rate: {:.1}%  |  Dependencies resolved: {}  |  Elapsed: {:.1}s",
        stats.success_rate, stats.total_dependencies_resolved, stats.elapsed_seconds,
    );
    println!(
        "  Validations: {} total, {} passed, {} needed refinement, average success factor {:.2}%",
        report.validation.total_validations,
        report.validation.passed,
        report.validation.needs_refinement,
        report.validation.average_success_factor,
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed artifacts").red().bold());
        for record in failed {
            println!("  {} {}: {}", style("✗").red(), record.file_name, record.reason);
        }
    }

    if !skipped.is_empty() {
        println!();
        println!("{}", style("Skipped artifacts").yellow().bold());
        for record in skipped {
            println!("  {} {}: {}", style("-").yellow(), record.file_name, record.reason);
        }
    }
}
