//! Vega - skills, personas and profiles for agent teams
//!
//! Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod population_cli;

use population_cli::PopulationCommand;

/// Trace modules for detailed logging
#[derive(Debug, Clone, ValueEnum)]
enum TraceModule {
    Fetch,
    Cache,
    Install,
    All,
}

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "vega",
    about = "Manage skills, personas and profiles for Vega agents",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Enable trace logging for modules (comma-separated: fetch,cache,install,all)
    #[clap(long, value_delimiter = ',', global = true)]
    trace: Vec<TraceModule>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Population config file (default: ~/.vega/population.yaml)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage skills, personas, and profiles
    #[clap(alias = "pop")]
    Population(PopulationCommand),

    /// Print version information
    Version,
}

fn initialize_tracing(log_level: &LogLevel, trace_modules: &[TraceModule]) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());

    for module in trace_modules {
        let directive = match module {
            TraceModule::Fetch => "vega_core::population::source=trace",
            TraceModule::Cache => "vega_core::population::cache=trace",
            TraceModule::Install => "vega_core::population::installer=trace",
            TraceModule::All => "vega_core=trace",
        };

        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(!trace_modules.is_empty())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, &cli.trace);

    match cli.command {
        Command::Population(command) => command.execute(cli.config.as_deref()).await,
        Command::Version => {
            println!("vega {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
