use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "crucible")]
#[command(version, about = "Quality-gated batch migration orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file. Defaults to ./crucible.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate a source file or directory into the target tree
    Run {
        /// Source artifact file, or directory for batch mode
        source: PathBuf,

        /// Root of the migrated output tree
        #[arg(short, long)]
        target: PathBuf,
    },
    /// Show tracker statistics for a target tree
    Status {
        /// Root of the migrated output tree
        #[arg(short, long)]
        target: PathBuf,
    },
    /// Print dependency statistics for one artifact
    Graph {
        /// Source artifact to analyze
        source: PathBuf,

        /// Base directory for reference resolution (defaults to the
        /// artifact's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Maximum traversal depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Clear tracker state so artifacts can be reprocessed
    Reset {
        /// Root of the migrated output tree
        #[arg(short, long)]
        target: PathBuf,

        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "crucible=debug"
    } else {
        "crucible=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { source, target } => {
            cmd::run::execute(source, target, cli.config, cli.verbose)
        }
        Commands::Status { target } => cmd::status::execute(target),
        Commands::Graph {
            source,
            base_dir,
            max_depth,
            json,
        } => cmd::graph::execute(source, base_dir, max_depth, json),
        Commands::Reset { target, force } => cmd::reset::execute(target, force),
    }
}
