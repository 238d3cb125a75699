mod backend;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, schedule::ScheduleSubcommand, sequence::SequenceSubcommand,
    task::TaskSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipeline",
    about = "Sequence-driven task scheduling and assignment for sales pipelines",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .pipeline/)
    #[arg(long, global = true, env = "PIPELINE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "7070")]
        port: u16,

        /// Keep everything in memory instead of .pipeline/pipeline.redb
        #[arg(long)]
        memory: bool,

        /// Fixtures to load before serving
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Load accounts, components and sequences from a YAML file
    Seed { file: PathBuf },

    /// Manage tasks on a component
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Evaluate or commit a sequence for a component
    Schedule {
        #[command(subcommand)]
        subcommand: ScheduleSubcommand,
    },

    /// Inspect sequences
    Sequence {
        #[command(subcommand)]
        subcommand: SequenceSubcommand,
    },

    /// Show or initialize .pipeline/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Serve { port, memory, seed } => {
            cmd::serve::run(&root, port, memory, seed.as_deref())
        }
        Commands::Seed { file } => cmd::seed::run(&root, &file, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Schedule { subcommand } => cmd::schedule::run(&root, subcommand, cli.json),
        Commands::Sequence { subcommand } => cmd::sequence::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
