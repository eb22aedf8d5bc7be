//! Symbol table for the elementary compiler
//!
//! Two scopes exist: the global scope and, for each procedure, that
//! procedure's locals. Procedures nested inside procedures still only see
//! their own locals and the globals.
//!
//! # Usage
//!
//! ```rust,ignore
//! use el_symbols::SymbolTable;
//!
//! let table = SymbolTable::build(&ast)?;
//! let resolved = table.lookup(Some("p"), "x")?;
//! assert_eq!(resolved.decorated_name(), "p.x.l");
//! ```
//!
//! The table is built in one pass and only queried afterwards; nothing in
//! the lowering pipeline mutates it.

pub mod build;
pub mod dump;
pub mod error;
pub mod table;

pub use error::SymbolError;
pub use table::{ProcId, Procedure, Resolved, Scope, SymbolTable, VarId, VarKind, Variable};
