//! fsmkit - Command-line interface for the fsmkit engine
//!
//! Inspects and drives the built-in workflows plus any machines loaded from
//! definition files, either one command at a time or from a REPL.

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsmkit")]
#[command(about = "Inspect and drive finite state machines")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "FSMKIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered machines
    List,

    /// Show states and transitions of a machine
    Describe {
        /// Machine name
        machine: String,
    },

    /// Print a machine as a definition document
    Export {
        /// Machine name
        machine: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Load and validate a definition file
    Validate {
        /// JSON or YAML definition file
        file: PathBuf,
    },

    /// Apply events in order, starting from a state
    Run {
        /// Machine name
        machine: String,

        /// Starting state (id or label)
        #[arg(short, long)]
        from: String,

        /// Events to apply
        #[arg(required = true)]
        events: Vec<String>,
    },

    /// Start an interactive session on a machine
    Repl {
        /// Machine name
        machine: String,

        /// Starting state (id or label); defaults to the machine's start state
        #[arg(short, long)]
        from: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Validation does not need the registry
    if let Commands::Validate { file } = &cli.command {
        match commands::validate(file) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Invalid".red(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let registry = commands::build_registry(&config)?;

    match cli.command {
        Commands::Repl { machine, from } => {
            let machine = registry.get(&machine)?;
            repl::run(machine, from.as_deref())?;
        }
        cmd => match commands::execute(&registry, cmd) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
