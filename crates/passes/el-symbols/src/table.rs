//! Scoped registry of variables and procedures

use crate::error::SymbolError;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use std::fmt;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Unique identifier for a variable
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct VarId(pub u32);

/// Unique identifier for a procedure
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct ProcId(pub u32);

/// Distinguishes `var` from `const` declarations
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    /// Declared with `var`
    Variable,
    /// Declared with `const`
    Constant,
}

impl VarKind {
    /// Keyword used in the dump format
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Variable => "var",
            Self::Constant => "const",
        }
    }
}

/// A declared variable or constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    /// Variable ID
    pub id: VarId,
    /// Declared name
    pub name: String,
    /// `var` or `const`
    pub kind: VarKind,
}

/// A declared procedure and its locals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Procedure {
    /// Procedure ID
    pub id: ProcId,
    /// Declared name
    pub name: String,
    locals: FxIndexMap<String, Variable>,
}

impl Procedure {
    fn new(id: ProcId, name: String) -> Self {
        Self {
            id,
            name,
            locals: FxIndexMap::default(),
        }
    }

    /// Locals in declaration order
    pub fn locals(&self) -> impl Iterator<Item = &Variable> {
        self.locals.values()
    }

    /// Local named `name`, if declared in this procedure
    #[must_use]
    pub fn local(&self, name: &str) -> Option<&Variable> {
        self.locals.get(name)
    }
}

/// Scope a lookup was satisfied from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Global scope
    Global,
    /// Locals of a procedure
    Local(&'a Procedure),
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// The declaration that was found
    pub variable: &'a Variable,
    /// Where it was found
    pub scope: Scope<'a>,
}

impl Resolved<'_> {
    /// Name used in generated code.
    ///
    /// Globals become `<name>.g` and locals `<proc>.<name>.l`. The `.`
    /// keeps decorated names apart from temporaries and labels.
    #[must_use]
    pub fn decorated_name(&self) -> String {
        match self.scope {
            Scope::Global => format!("{}.g", self.variable.name),
            Scope::Local(procedure) => format!("{}.{}.l", procedure.name, self.variable.name),
        }
    }

    /// Whether the declaration is a local
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.scope, Scope::Local(_))
    }
}

/// Globals plus procedures with their locals.
///
/// Variable and procedure ids come from one counter, so every id handed
/// out during a build is distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    globals: FxIndexMap<String, Variable>,
    procedures: FxIndexMap<String, Procedure>,
    #[serde(skip)]
    next_id: u32,
}

impl SymbolTable {
    /// Creates an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every declaration and rewinds the id counter
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Globals in declaration order
    pub fn globals(&self) -> impl Iterator<Item = &Variable> {
        self.globals.values()
    }

    /// Global named `name`
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Variable> {
        self.globals.get(name)
    }

    /// Procedures in declaration order
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    /// Procedure named `name`
    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    /// Number of variables in all scopes
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.globals.len()
            + self
                .procedures
                .values()
                .map(|procedure| procedure.locals.len())
                .sum::<usize>()
    }

    /// Whether nothing has been declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.globals.is_empty() && self.procedures.is_empty()
    }

    /// Resolves `name` as seen from inside `procedure`.
    ///
    /// The procedure's locals are searched first, then the globals. A
    /// context that names no procedure (such as the entry block) only
    /// sees globals.
    pub fn lookup(
        &self,
        procedure: Option<&str>,
        name: &str,
    ) -> Result<Resolved<'_>, SymbolError> {
        let enclosing = procedure.and_then(|proc_name| self.procedures.get(proc_name));

        if let Some(procedure) = enclosing {
            if let Some(variable) = procedure.locals.get(name) {
                return Ok(Resolved {
                    variable,
                    scope: Scope::Local(procedure),
                });
            }
        }

        if let Some(variable) = self.globals.get(name) {
            return Ok(Resolved {
                variable,
                scope: Scope::Global,
            });
        }

        let locals = enclosing
            .into_iter()
            .flat_map(|procedure| procedure.locals.keys());
        let globals = self.globals.keys().filter(|global| {
            enclosing.is_none_or(|procedure| !procedure.locals.contains_key(*global))
        });
        let visible = locals.chain(globals).map(String::as_str);

        Err(SymbolError::Undefined {
            name: name.to_string(),
            procedure: procedure.map(str::to_string),
            suggestions: SymbolError::compute_suggestions(name, visible),
        })
    }

    /// Registers a procedure and returns its index in declaration order
    pub(crate) fn declare_procedure(&mut self, name: &str) -> Result<usize, SymbolError> {
        self.insert_procedure(ProcId(self.next_id), name)
    }

    /// Registers a variable globally (`None`) or under the procedure at
    /// `procedure` (an index returned by [`Self::declare_procedure`])
    pub(crate) fn declare_variable(
        &mut self,
        procedure: Option<usize>,
        name: &str,
        kind: VarKind,
    ) -> Result<VarId, SymbolError> {
        let id = VarId(self.next_id);
        self.insert_variable(procedure, id, name, kind)?;
        Ok(id)
    }

    pub(crate) fn insert_procedure(
        &mut self,
        id: ProcId,
        name: &str,
    ) -> Result<usize, SymbolError> {
        if self.procedures.contains_key(name) {
            return Err(SymbolError::DuplicateProcedure {
                name: name.to_string(),
            });
        }
        self.next_id = self.next_id.max(successor(id.0)?);
        let (index, _) = self
            .procedures
            .insert_full(name.to_string(), Procedure::new(id, name.to_string()));
        Ok(index)
    }

    pub(crate) fn insert_variable(
        &mut self,
        procedure: Option<usize>,
        id: VarId,
        name: &str,
        kind: VarKind,
    ) -> Result<(), SymbolError> {
        let next = successor(id.0)?;
        let enclosing = procedure.and_then(|index| self.procedures.get_index_mut(index));
        let (scope, registry) = match enclosing {
            Some((proc_name, procedure)) => {
                (format!("procedure `{proc_name}`"), &mut procedure.locals)
            }
            None => ("global scope".to_string(), &mut self.globals),
        };

        if registry.contains_key(name) {
            return Err(SymbolError::DuplicateDefinition {
                name: name.to_string(),
                scope,
            });
        }
        registry.insert(
            name.to_string(),
            Variable {
                id,
                name: name.to_string(),
                kind,
            },
        );
        self.next_id = self.next_id.max(next);
        Ok(())
    }
}

fn successor(id: u32) -> Result<u32, SymbolError> {
    id.checked_add(1).ok_or(SymbolError::IdExhausted { id })
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.declare_variable(None, "x", VarKind::Variable).unwrap();
        table.declare_variable(None, "n", VarKind::Constant).unwrap();
        let proc_p = table.declare_procedure("p").unwrap();
        table.declare_variable(Some(proc_p), "x", VarKind::Variable).unwrap();
        table.declare_variable(Some(proc_p), "y", VarKind::Variable).unwrap();
        table
    }

    #[test]
    fn test_local_shadows_global() {
        let table = table();

        let inside = table.lookup(Some("p"), "x").unwrap();
        assert!(inside.is_local());
        assert_eq!(inside.variable.id, VarId(3));
        assert_eq!(inside.decorated_name(), "p.x.l");

        let outside = table.lookup(None, "x").unwrap();
        assert_eq!(outside.scope, Scope::Global);
        assert_eq!(outside.decorated_name(), "x.g");
    }

    #[test]
    fn test_local_miss_falls_back_to_global() {
        let table = table();
        let resolved = table.lookup(Some("p"), "n").unwrap();
        assert_eq!(resolved.scope, Scope::Global);
        assert_eq!(resolved.variable.kind, VarKind::Constant);
    }

    #[test]
    fn test_unknown_context_sees_globals_only() {
        let table = table();
        assert_eq!(table.lookup(Some("main"), "x").unwrap().decorated_name(), "x.g");
        assert!(table.lookup(Some("main"), "y").is_err());
    }

    #[test]
    fn test_undefined_carries_context_and_suggestions() {
        let table = table();
        let err = table.lookup(Some("p"), "yy").unwrap_err();
        assert_eq!(
            err,
            SymbolError::Undefined {
                name: "yy".to_string(),
                procedure: Some("p".to_string()),
                suggestions: vec!["y".to_string(), "x".to_string(), "n".to_string()],
            }
        );
    }

    #[test]
    fn test_duplicates_rejected_per_scope() {
        let mut table = table();
        assert!(matches!(
            table.declare_variable(None, "x", VarKind::Variable),
            Err(SymbolError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            table.declare_procedure("p"),
            Err(SymbolError::DuplicateProcedure { .. })
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        let table = table();
        let mut ids: Vec<u32> = table.globals().map(|var| var.id.0).collect();
        for procedure in table.procedures() {
            ids.push(procedure.id.0);
            ids.extend(procedure.locals().map(|var| var.id.0));
        }
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(table.variable_count(), 4);
    }

    #[test]
    fn test_last_id_is_rejected() {
        let mut table = SymbolTable::new();
        assert_eq!(
            table.insert_variable(None, VarId(u32::MAX), "a", VarKind::Variable),
            Err(SymbolError::IdExhausted { id: u32::MAX })
        );
        assert!(table.is_empty());

        table.insert_procedure(ProcId(u32::MAX - 1), "p").unwrap();
        assert_eq!(
            table.declare_variable(None, "b", VarKind::Variable),
            Err(SymbolError::IdExhausted { id: u32::MAX })
        );
    }

    #[test]
    fn test_reset() {
        let mut table = table();
        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.declare_procedure("q").unwrap(), 0);
        assert_eq!(table.procedure("q").unwrap().id, ProcId(0));
    }
}
