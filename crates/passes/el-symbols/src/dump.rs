//! Textual dump of a symbol table
//!
//! One declaration per line, globals first, then each procedure followed
//! by its locals:
//!
//! ```text
//! global 0 const n
//! global 1 var x
//! procedure 2 p
//! local 3 var x
//! ```

use crate::error::SymbolError;
use crate::table::{ProcId, SymbolTable, VarId, VarKind};
use rustc_hash::FxHashSet;
use std::fmt::Write;

impl SymbolTable {
    /// Renders the table in dump layout
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for var in self.globals() {
            let _ = writeln!(out, "global {} {} {}", var.id.0, var.kind.keyword(), var.name);
        }
        for procedure in self.procedures() {
            let _ = writeln!(out, "procedure {} {}", procedure.id.0, procedure.name);
            for var in procedure.locals() {
                let _ = writeln!(out, "local {} {} {}", var.id.0, var.kind.keyword(), var.name);
            }
        }
        out
    }

    /// Reconstructs a table from [`SymbolTable::dump`] output.
    ///
    /// Blank lines are ignored. Ids must be unique across the dump.
    pub fn parse_dump(text: &str) -> Result<Self, SymbolError> {
        let mut table = Self::new();
        let mut seen = FxHashSet::default();
        let mut current: Option<usize> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let fields: Vec<&str> = raw.split_whitespace().collect();
            let err = |message: String| SymbolError::DumpFormat { line, message };

            let id = match fields.as_slice() {
                [] => continue,
                ["global", id, kind, name] => {
                    let id = parse_id(id).map_err(err)?;
                    let kind = parse_kind(kind).map_err(err)?;
                    if current.is_some() {
                        return Err(err("global listed after a procedure".to_string()));
                    }
                    table.insert_variable(None, VarId(id), name, kind)?;
                    id
                }
                ["procedure", id, name] => {
                    let id = parse_id(id).map_err(err)?;
                    current = Some(table.insert_procedure(ProcId(id), name)?);
                    id
                }
                ["local", id, kind, name] => {
                    let id = parse_id(id).map_err(err)?;
                    let kind = parse_kind(kind).map_err(err)?;
                    let Some(procedure) = current else {
                        return Err(err("local listed before any procedure".to_string()));
                    };
                    table.insert_variable(Some(procedure), VarId(id), name, kind)?;
                    id
                }
                _ => return Err(err(format!("unrecognised record {raw:?}"))),
            };

            if !seen.insert(id) {
                return Err(err(format!("id {id} appears more than once")));
            }
        }

        Ok(table)
    }
}

fn parse_id(text: &str) -> Result<u32, String> {
    text.parse()
        .map_err(|_| format!("expected a numeric id, found {text:?}"))
}

fn parse_kind(text: &str) -> Result<VarKind, String> {
    match text {
        "var" => Ok(VarKind::Variable),
        "const" => Ok(VarKind::Constant),
        other => Err(format!("expected `var` or `const`, found {other:?}")),
    }
}
