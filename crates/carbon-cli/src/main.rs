mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{catalog::CatalogSubcommand, config::ConfigSubcommand, optimize::OptimizeArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "carbon",
    about = "Carbon footprint optimizer: clean emission data, summarize it, and pick the cheapest mitigation plan",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .carbon/ or .git/)
    #[arg(long, global = true, env = "CARBON_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the project: config, seed action catalog, data directories
    Init,

    /// Clean a raw emission-factor CSV into the processed dataset
    Etl {
        /// Raw CSV (default: data.raw_input from config)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Cleaned CSV destination
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Total emissions by scope and industry
    Summarize {
        /// Cleaned CSV (default: data/processed/cleaned_co2e_data.csv)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Number of industries to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Select the minimum-cost set of actions that meets the reduction target
    Optimize(OptimizeArgs),

    /// Manage the mitigation action catalog
    Catalog {
        #[command(subcommand)]
        subcommand: CatalogSubcommand,
    },

    /// Inspect and validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Etl { input, output } => {
            cmd::etl::run(&root, input.as_deref(), output.as_deref(), cli.json)
        }
        Commands::Summarize { input, top } => {
            cmd::summarize::run(&root, input.as_deref(), top, cli.json)
        }
        Commands::Optimize(args) => cmd::optimize::run(&root, args, cli.json),
        Commands::Catalog { subcommand } => cmd::catalog::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        if e.downcast_ref::<cmd::optimize::Infeasible>().is_some() {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
