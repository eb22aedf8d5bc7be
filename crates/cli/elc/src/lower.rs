//! Lower command implementation

use anyhow::Result;
use el_driver::{ElcConfig, OutputFormat};
use std::path::Path;

pub fn lower(path: &Path, config: ElcConfig) -> Result<()> {
    let session = crate::compiler::compile(path, config)?;

    match session.config().output.format {
        OutputFormat::Text => print!("{}", session.render_tac()),
        OutputFormat::Json => println!("{}", session.to_json()?),
    }
    Ok(())
}
