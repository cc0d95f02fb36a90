mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ozycal_core::{DateRange, Orchestrator, OzycalConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ozycal")]
#[command(about = "Read and write event datalinks in your ozycal data directory")]
struct Cli {
    /// Config file (defaults to ~/.config/ozycal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print datalink specs with all field options loaded
    Specs,
    /// Create missing datalink logs
    Init,
    /// Print datalinks of events starting in a time range
    Pull {
        /// Events from this date (YYYY-MM-DD or ISO timestamp)
        #[arg(long, conflicts_with = "week")]
        from: Option<String>,

        /// Events until this date (YYYY-MM-DD or ISO timestamp)
        #[arg(long, conflicts_with = "week")]
        to: Option<String>,

        /// Monday to Sunday of the week containing this date (default: this week)
        #[arg(long)]
        week: Option<Option<String>>,

        /// IANA time zone for plain dates and weeks (default: system zone)
        #[arg(long)]
        tz: Option<String>,
    },
    /// Push datalink records read as JSON from a file or stdin
    Push {
        /// JSON file with a list of records (reads stdin if omitted)
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let orchestrator = Orchestrator::from_config(&config);

    match cli.command {
        Commands::Specs => commands::specs::run(&orchestrator),
        Commands::Init => commands::init::run(&orchestrator, &config),
        Commands::Pull { from, to, week, tz } => {
            let tz = commands::pull::resolve_timezone(tz.as_deref())?;
            let range = match week {
                Some(date) => commands::pull::week_range(date.as_deref(), tz)?,
                None => DateRange::from_args(from.as_deref(), to.as_deref(), tz)
                    .map_err(|e| anyhow::anyhow!(e))?,
            };
            commands::pull::run(&orchestrator, &range)
        }
        Commands::Push { file } => commands::push::run(&orchestrator, file.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ozycal=debug,ozycal_core=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<OzycalConfig> {
    match path {
        Some(path) => OzycalConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => OzycalConfig::load().context("Failed to load ozycal config"),
    }
}
