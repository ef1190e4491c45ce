#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

mod commands;
mod logging;
mod presenter;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dalkey")]
#[command(author, version, about = "A fast package manager client for the npm registry", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install packages, or everything in package.json when no specs given
    #[command(visible_aliases = ["i", "add"])]
    Install {
        /// Package specs (e.g., "react", "lodash@^4.17.0", "@types/node")
        specs: Vec<String>,

        /// Install as devDependencies
        #[arg(short = 'D', long = "save-dev")]
        save_dev: bool,
    },

    /// Remove installed packages
    #[command(visible_aliases = ["uninstall", "rm"])]
    Remove {
        /// Package names to remove (e.g., "react", "lodash")
        packages: Vec<String>,
    },

    /// Upgrade installed packages to the registry's latest versions
    #[command(visible_alias = "update")]
    Upgrade {
        /// Specific packages to upgrade (empty = all dependencies)
        packages: Vec<String>,
    },

    /// Manage the package cache
    Cache {
        #[command(subcommand)]
        cache_cmd: CacheCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// Show cache location, size, and package count
    Info,

    /// Remove the entire cache
    Clear,

    /// List cached packages
    #[command(visible_alias = "list")]
    Ls,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Install { specs, save_dev } => {
            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            runtime.block_on(commands::install::run(&cwd, &specs, save_dev))
        }
        Commands::Remove { packages } => commands::remove::run(&cwd, &packages),
        Commands::Upgrade { packages } => {
            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            runtime.block_on(commands::upgrade::run(&cwd, &packages))
        }
        Commands::Cache { cache_cmd } => match cache_cmd {
            CacheCommands::Info => commands::cache::info(),
            CacheCommands::Clear => commands::cache::clear(),
            CacheCommands::Ls => commands::cache::ls(),
        },
    }
}
