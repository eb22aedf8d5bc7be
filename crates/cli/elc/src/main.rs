//! Elementary compiler CLI
//!
//! Lowers syntax trees to three-address code and moves TAC in and out of
//! the block file format

use anyhow::Result;
use clap::{Parser, Subcommand};
use el_driver::{ElcConfig, OutputFormat};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod compiler;
mod export;
mod import;
mod lower;
mod symbols;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "ELC_LOG";

#[derive(Parser)]
#[command(name = "elc")]
#[command(about = "Elementary language middle end", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./elc.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Name of the entry block
    #[arg(long, global = true)]
    entry: Option<String>,

    /// Output format (text or json)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Byte limit for one serialized operand
    #[arg(long, global = true)]
    max_field_len: Option<usize>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a syntax tree and print its TAC
    Lower {
        /// Syntax tree in JSON form
        ast: PathBuf,
    },

    /// Print the symbol table of a syntax tree
    Symbols {
        /// Syntax tree in JSON form
        ast: PathBuf,
    },

    /// Lower a syntax tree and write the TAC block file
    Export {
        /// Syntax tree in JSON form
        ast: PathBuf,

        /// Destination file (defaults to `output.tac_file`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read a TAC block file and print it
    Import {
        /// TAC block file
        tac: PathBuf,
    },
}

impl Cli {
    /// Discovers the config file from `dir`, then applies flag overrides
    fn load_config(&self, dir: &Path) -> Result<ElcConfig> {
        let mut config = ElcConfig::discover(self.config.as_deref(), dir)?;

        if let Some(entry) = &self.entry {
            config.entry.clone_from(entry);
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(limit) = self.max_field_len {
            config.max_field_len = limit;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config(&std::env::current_dir()?)?;
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Lower { ast } => {
            lower::lower(&ast, config)?;
        }
        Commands::Symbols { ast } => {
            symbols::symbols(&ast, config)?;
        }
        Commands::Export { ast, output } => {
            export::export(&ast, output, config)?;
        }
        Commands::Import { tac } => {
            import::import(&tac, &config)?;
        }
    }

    Ok(())
}
