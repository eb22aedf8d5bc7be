//! Import command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use el_driver::{ElcConfig, OutputFormat};
use el_tac::{Instr, PartialRead};
use std::path::Path;

pub fn import(path: &Path, config: &ElcConfig) -> Result<()> {
    eprintln!("{} {}", "Importing".green().bold(), path.display());

    match el_driver::import_tac(path, config) {
        Ok(instrs) => {
            print_instrs(&instrs, config.output.format)?;
            eprintln!("    {} {} instructions", "✓".green(), instrs.len());
            Ok(())
        }
        Err(PartialRead { parsed, error }) => {
            print_instrs(&parsed, config.output.format)?;
            eprintln!("    {} {}", "✗".red(), error);
            eprintln!(
                "{} recovered {} instructions before the error",
                "Failed:".red().bold(),
                parsed.len()
            );
            anyhow::bail!("import of {} failed", path.display());
        }
    }
}

fn print_instrs(instrs: &[Instr], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", el_tac::render(instrs)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(instrs).context("Failed to serialize instructions")?
        ),
    }
    Ok(())
}
