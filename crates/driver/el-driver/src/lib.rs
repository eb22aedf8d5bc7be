//! Compilation driver
//!
//! Owns the per-run state (symbol table and instruction emitter) and the
//! file boundary: syntax trees come in as JSON, TAC goes out as text,
//! JSON or the four-line block format.

#![allow(unused_assignments)]

pub mod config;

pub use config::{CONFIG_FILE, ElcConfig, OutputConfig, OutputFormat};

use anyhow::{Context, Result};
use el_symbols::{SymbolError, SymbolTable};
use el_syntax::SyntaxNode;
use el_tac::{Instr, PartialRead, TacEmitter, TacFormat, TacFormatError};
use el_tac_lower::{LowerError, LoweringContext};
use miette::Diagnostic;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// A failed compile run
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// Symbol table could not be built
    #[error(transparent)]
    #[diagnostic(code(symbols::build))]
    Symbols(#[from] SymbolError),

    /// Lowering stopped
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lower(#[from] LowerError),
}

/// One compilation session.
///
/// Every [`Session::compile`] starts from an empty table and emitter. A
/// failed run leaves both empty so no partial output can be observed.
#[derive(Debug, Default)]
pub struct Session {
    config: ElcConfig,
    symbols: SymbolTable,
    emitter: TacEmitter,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    symbols: &'a SymbolTable,
    tac: Vec<&'a Instr>,
}

impl Session {
    /// Create a session with the given configuration
    pub fn new(config: ElcConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            emitter: TacEmitter::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ElcConfig {
        &self.config
    }

    /// Builds the symbol table for `root` and lowers it
    pub fn compile(&mut self, root: &SyntaxNode) -> Result<(), CompileError> {
        let _span = tracing::info_span!("compile", entry = %self.config.entry).entered();
        self.emitter.reset();

        let result = self.run(root);
        match &result {
            Ok(()) => tracing::info!(
                symbols = self.symbols.variable_count(),
                instructions = self.emitter.len(),
                "compiled"
            ),
            Err(error) => {
                tracing::info!(%error, "compile failed, discarding partial output");
                self.symbols.reset();
                self.emitter.reset();
            }
        }
        result
    }

    fn run(&mut self, root: &SyntaxNode) -> Result<(), CompileError> {
        self.symbols.rebuild(root, &self.config.entry)?;
        LoweringContext::new(&self.symbols, &mut self.emitter, &self.config.entry)
            .lower_program(root)?;
        Ok(())
    }

    /// Symbol table of the last successful run
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Instructions of the last successful run
    pub fn tac(&self) -> impl Iterator<Item = &Instr> {
        self.emitter.instrs()
    }

    /// Human-readable listing, one instruction per line
    pub fn render_tac(&self) -> String {
        el_tac::render(self.emitter.instrs())
    }

    /// Symbols and instructions as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        let report = JsonReport {
            symbols: &self.symbols,
            tac: self.emitter.instrs().collect(),
        };
        serde_json::to_string_pretty(&report).context("Failed to serialize compile output")
    }

    /// Block format settings derived from the configuration
    pub fn tac_format(&self) -> TacFormat {
        TacFormat::new(self.config.max_field_len)
    }

    /// Writes the instructions to `path` in block format
    pub fn export_tac(&self, path: &Path) -> Result<(), TacFormatError> {
        tracing::debug!(
            path = %path.display(),
            instructions = self.emitter.len(),
            "exporting TAC"
        );
        self.tac_format().export_file(self.emitter.instrs(), path)
    }
}

/// Reads a syntax tree from a JSON file
pub fn load_ast(path: &Path) -> Result<SyntaxNode> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read syntax tree: {}", path.display()))?;

    let root: SyntaxNode = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse syntax tree: {}", path.display()))?;
    tracing::debug!(path = %path.display(), nodes = root.node_count(), "loaded syntax tree");
    Ok(root)
}

/// Reads a block-format TAC file using the configured field limit
pub fn import_tac(path: &Path, config: &ElcConfig) -> Result<Vec<Instr>, PartialRead> {
    TacFormat::new(config.max_field_len).import_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use el_syntax::NodeKind;
    use expect_test::expect;
    use tempfile::TempDir;

    fn program(target: &str) -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![
                SyntaxNode::leaf(NodeKind::VarDecl, "a"),
                SyntaxNode::assign(target, SyntaxNode::number(7)),
            ],
        )
    }

    #[test]
    fn test_compile_and_render() {
        let mut session = Session::default();
        session.compile(&program("a")).unwrap();

        expect![[r#"
            main:
            t0 = LOAD 7
            a.g = t0
            RETURN
            L0:
        "#]]
        .assert_eq(&session.render_tac());
        assert_eq!(session.symbols().variable_count(), 1);
    }

    #[test]
    fn test_runs_are_independent() {
        let mut session = Session::default();
        session.compile(&program("a")).unwrap();
        session.compile(&program("a")).unwrap();
        assert_eq!(session.tac().count(), 5);
        assert_eq!(session.tac().nth(1).unwrap().result.as_deref(), Some("t0"));
    }

    #[test]
    fn test_failed_run_discards_output() {
        let mut session = Session::default();
        session.compile(&program("a")).unwrap();

        let err = session.compile(&program("b")).unwrap_err();
        assert!(matches!(err, CompileError::Lower(LowerError::UndefinedSymbol { .. })));
        assert_eq!(session.tac().count(), 0);
        assert!(session.symbols().is_empty());
        assert_eq!(
            err.code().map(|code| code.to_string()).as_deref(),
            Some("lower::undefined_symbol")
        );
    }

    #[test]
    fn test_symbol_errors_surface() {
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![
                SyntaxNode::leaf(NodeKind::VarDecl, "a"),
                SyntaxNode::leaf(NodeKind::VarDecl, "a"),
            ],
        );
        let err = Session::default().compile(&tree).unwrap_err();
        assert!(matches!(err, CompileError::Symbols(SymbolError::DuplicateDefinition { .. })));
    }

    #[test]
    fn test_configured_entry() {
        let config = ElcConfig {
            entry: "start".to_string(),
            ..ElcConfig::default()
        };
        let mut session = Session::new(config);
        session.compile(&program("a")).unwrap();
        // `main` is now an ordinary block: no entry label or trailer.
        assert_eq!(session.tac().count(), 2);
    }

    #[test]
    fn test_reserved_procedure_names() {
        for name in ["main", "L0"] {
            let tree = SyntaxNode::new(
                NodeKind::Block,
                "main",
                vec![SyntaxNode::new(
                    NodeKind::ProcDecl,
                    name,
                    vec![SyntaxNode::new(NodeKind::Block, name, vec![])],
                )],
            );
            let err = Session::default().compile(&tree).unwrap_err();
            assert!(
                matches!(
                    err,
                    CompileError::Symbols(SymbolError::ReservedName { name: ref reserved, .. })
                        if reserved == name
                ),
                "{name}: {err:?}"
            );
        }

        // `main` is only reserved while it names the entry block.
        let config = ElcConfig {
            entry: "start".to_string(),
            ..ElcConfig::default()
        };
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "start",
            vec![SyntaxNode::new(
                NodeKind::ProcDecl,
                "main",
                vec![SyntaxNode::new(NodeKind::Block, "main", vec![])],
            )],
        );
        Session::new(config).compile(&tree).unwrap();
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let ast_path = dir.path().join("prog.json");
        std::fs::write(&ast_path, serde_json::to_string(&program("a")).unwrap()).unwrap();

        let mut session = Session::default();
        session.compile(&load_ast(&ast_path).unwrap()).unwrap();
        let tac_path = dir.path().join("prog.tac");
        session.export_tac(&tac_path).unwrap();

        let imported = import_tac(&tac_path, session.config()).unwrap();
        assert_eq!(imported, session.tac().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn test_json_report() {
        let mut session = Session::default();
        session.compile(&program("a")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();
        assert_eq!(value["tac"].as_array().unwrap().len(), 5);
        assert_eq!(value["symbols"]["globals"]["a"]["kind"], "variable");
    }

    #[test]
    fn test_load_ast_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ \"kind\": ").unwrap();
        let err = load_ast(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse syntax tree"));
    }
}
