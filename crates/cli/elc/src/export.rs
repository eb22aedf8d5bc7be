//! Export command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use el_driver::ElcConfig;
use std::path::{Path, PathBuf};

pub fn export(path: &Path, output: Option<PathBuf>, config: ElcConfig) -> Result<()> {
    let Some(destination) = output.or_else(|| config.output.tac_file.clone()) else {
        anyhow::bail!("no output file: pass `-o <file>` or set `output.tac_file`");
    };

    let session = crate::compiler::compile(path, config)?;
    session
        .export_tac(&destination)
        .with_context(|| format!("Failed to export TAC to {}", destination.display()))?;

    eprintln!(
        "{} {} instructions to {}",
        "Exported".green().bold(),
        session.tac().count(),
        destination.display()
    );
    Ok(())
}
