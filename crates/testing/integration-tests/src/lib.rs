//! Integration test utilities for the elementary compiler

use anyhow::{Context, Result};
use el_driver::{CompileError, ElcConfig, Session};
use el_syntax::SyntaxNode;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the JSON syntax tree fixtures
#[must_use]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// A syntax tree loaded from a fixture file
#[derive(Debug, Clone)]
pub struct TestFixture {
    /// File stem, used in assertion messages
    pub name: String,
    /// Location on disk
    pub path: PathBuf,
    /// Parsed tree
    pub root: SyntaxNode,
}

impl TestFixture {
    /// Loads a fixture by path relative to [`fixtures_dir`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a valid tree
    pub fn load(relative: &str) -> Result<Self> {
        Self::from_path(&fixtures_dir().join(relative))
    }

    /// Loads every `.json` fixture in a directory, sorted by name
    ///
    /// # Errors
    ///
    /// Returns an error if directory traversal or any load fails
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Vec<Self>> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::from_path(path)).collect()
    }

    fn from_path(path: &Path) -> Result<Self> {
        let root = el_driver::load_ast(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            name,
            path: path.to_path_buf(),
            root,
        })
    }

    /// Compiles the fixture with default configuration
    ///
    /// # Errors
    ///
    /// Returns the symbol or lowering error that stopped the run
    pub fn compile(&self) -> Result<Session, CompileError> {
        self.compile_with(ElcConfig::default())
    }

    /// Compiles the fixture with `config`
    ///
    /// # Errors
    ///
    /// Returns the symbol or lowering error that stopped the run
    pub fn compile_with(&self, config: ElcConfig) -> Result<Session, CompileError> {
        let mut session = Session::new(config);
        session.compile(&self.root)?;
        Ok(session)
    }
}
