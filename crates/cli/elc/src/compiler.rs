//! Shared compile step for the subcommands

use anyhow::Result;
use colored::Colorize;
use el_driver::{ElcConfig, Session};
use std::path::Path;

/// Loads and compiles `path`, printing a rendered diagnostic on failure
pub fn compile(path: &Path, config: ElcConfig) -> Result<Session> {
    eprintln!("{} {}", "Compiling".green().bold(), path.display());

    let root = el_driver::load_ast(path)?;
    let mut session = Session::new(config);

    if let Err(error) = session.compile(&root) {
        eprintln!("{:?}", miette::Report::new(error));
        eprintln!("{} {}", "Failed:".red().bold(), path.display());
        anyhow::bail!("compilation of {} failed", path.display());
    }

    eprintln!(
        "    {} {} symbols, {} instructions",
        "✓".green(),
        session.symbols().variable_count(),
        session.tac().count()
    );
    Ok(session)
}
