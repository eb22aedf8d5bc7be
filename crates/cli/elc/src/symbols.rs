//! Symbols command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use el_driver::{ElcConfig, OutputFormat};
use std::path::Path;

pub fn symbols(path: &Path, config: ElcConfig) -> Result<()> {
    let session = crate::compiler::compile(path, config)?;
    let table = session.symbols();

    match session.config().output.format {
        OutputFormat::Text => print!("{}", table.dump()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(table).context("Failed to serialize symbol table")?
        ),
    }

    if let Some(dump_path) = &session.config().output.symbols_file {
        std::fs::write(dump_path, table.dump())
            .with_context(|| format!("Failed to write symbol dump: {}", dump_path.display()))?;
        eprintln!("{} symbols to {}", "Wrote".green().bold(), dump_path.display());
    }
    Ok(())
}
