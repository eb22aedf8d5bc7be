//! Declaration pass over the syntax tree

use crate::error::SymbolError;
use crate::table::{SymbolTable, VarKind};
use el_syntax::{NodeKind, SyntaxNode};

impl SymbolTable {
    /// Builds a table from every declaration in `root`.
    ///
    /// One pre-order walk; the enclosing procedure is passed down by
    /// value, so a procedure's context ends with its subtree. Procedure
    /// names shaped like generated temporaries or labels are rejected.
    pub fn build(root: &SyntaxNode) -> Result<Self, SymbolError> {
        let mut table = Self::new();
        table.populate(root, None)?;
        Ok(table)
    }

    /// Like [`SymbolTable::build`], also reserving the entry block's name
    pub fn build_with_entry(root: &SyntaxNode, entry: &str) -> Result<Self, SymbolError> {
        let mut table = Self::new();
        table.populate(root, Some(entry))?;
        Ok(table)
    }

    /// Clears the table, then builds it from `root` with `entry` reserved
    pub fn rebuild(&mut self, root: &SyntaxNode, entry: &str) -> Result<(), SymbolError> {
        self.reset();
        self.populate(root, Some(entry))
    }

    fn populate(&mut self, root: &SyntaxNode, entry: Option<&str>) -> Result<(), SymbolError> {
        let mut builder = TableBuilder {
            table: &mut *self,
            entry,
        };
        builder.visit(root, None)?;
        tracing::debug!(
            globals = self.globals().count(),
            procedures = self.procedures().count(),
            variables = self.variable_count(),
            "built symbol table"
        );
        Ok(())
    }
}

struct TableBuilder<'t> {
    table: &'t mut SymbolTable,
    entry: Option<&'t str>,
}

impl TableBuilder<'_> {
    /// `procedure` is the declaration index of the enclosing procedure
    fn visit(&mut self, node: &SyntaxNode, procedure: Option<usize>) -> Result<(), SymbolError> {
        let inner = match node.kind {
            NodeKind::VarDecl | NodeKind::ConstDecl => {
                let kind = if node.kind == NodeKind::ConstDecl {
                    VarKind::Constant
                } else {
                    VarKind::Variable
                };
                let name = declared_name(node)?;
                let id = self.table.declare_variable(procedure, name, kind)?;
                tracing::trace!(
                    name,
                    id = id.0,
                    ?kind,
                    local = procedure.is_some(),
                    "declared variable"
                );
                procedure
            }
            NodeKind::ProcDecl => {
                let name = declared_name(node)?;
                self.check_procedure_name(name)?;
                let index = self.table.declare_procedure(name)?;
                tracing::trace!(name, index, "declared procedure");
                Some(index)
            }
            NodeKind::Program
            | NodeKind::Block
            | NodeKind::Sequence
            | NodeKind::Assignment
            | NodeKind::Call
            | NodeKind::If
            | NodeKind::While
            | NodeKind::Condition
            | NodeKind::Expression
            | NodeKind::Operator
            | NodeKind::Term
            | NodeKind::Factor
            | NodeKind::Identifier
            | NodeKind::Number => procedure,
        };

        for child in &node.children {
            self.visit(child, inner)?;
        }
        Ok(())
    }

    /// Procedure names become labels, so they must not look like `t<N>`,
    /// `L<N>` or the entry block's label
    fn check_procedure_name(&self, name: &str) -> Result<(), SymbolError> {
        let reason = if el_tac::is_generated_name(name) {
            "it has the shape of a generated temporary or label"
        } else if self.entry == Some(name) {
            "it is the entry block's label"
        } else {
            return Ok(());
        };
        Err(SymbolError::ReservedName {
            name: name.to_string(),
            reason,
        })
    }
}

fn declared_name(node: &SyntaxNode) -> Result<&str, SymbolError> {
    if node.text.is_empty() {
        return Err(SymbolError::UnnamedDeclaration { kind: node.kind });
    }
    if node.text.contains(char::is_whitespace) {
        return Err(SymbolError::InvalidName {
            name: node.text.clone(),
            kind: node.kind,
        });
    }
    Ok(&node.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Scope, VarId};

    fn var(name: &str) -> SyntaxNode {
        SyntaxNode::leaf(NodeKind::VarDecl, name)
    }

    fn constant(name: &str, value: i64) -> SyntaxNode {
        SyntaxNode::new(NodeKind::ConstDecl, name, vec![SyntaxNode::number(value)])
    }

    fn procedure(name: &str, body: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::ProcDecl,
            name,
            vec![SyntaxNode::new(NodeKind::Block, name, body)],
        )
    }

    fn program() -> SyntaxNode {
        SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![
                constant("n", 10),
                var("x"),
                procedure("p", vec![var("x"), procedure("q", vec![var("z")])]),
                var("y"),
                SyntaxNode::assign("x", SyntaxNode::number(1)),
            ],
        )
    }

    #[test]
    fn test_scopes_follow_nesting() {
        let table = SymbolTable::build(&program()).unwrap();

        let globals: Vec<_> = table.globals().map(|var| var.name.as_str()).collect();
        assert_eq!(globals, vec!["n", "x", "y"]);

        let p = table.procedure("p").unwrap();
        let p_locals: Vec<_> = p.locals().map(|var| var.name.as_str()).collect();
        assert_eq!(p_locals, vec!["x"]);

        let q = table.procedure("q").unwrap();
        let q_locals: Vec<_> = q.locals().map(|var| var.name.as_str()).collect();
        assert_eq!(q_locals, vec!["z"]);
    }

    #[test]
    fn test_context_reverts_after_procedure() {
        let table = SymbolTable::build(&program()).unwrap();
        // `y` follows `p` in the main block and must stay global.
        assert_eq!(table.lookup(None, "y").unwrap().scope, Scope::Global);
        assert!(table.procedure("p").unwrap().local("y").is_none());
    }

    #[test]
    fn test_ids_follow_pre_order() {
        let table = SymbolTable::build(&program()).unwrap();
        assert_eq!(table.global("n").unwrap().id, VarId(0));
        assert_eq!(table.global("x").unwrap().id, VarId(1));
        assert_eq!(table.procedure("p").unwrap().id.0, 2);
        assert_eq!(table.procedure("q").unwrap().id.0, 4);
        assert_eq!(table.global("y").unwrap().id, VarId(6));
        assert_eq!(table.global("n").unwrap().kind, VarKind::Constant);
    }

    #[test]
    fn test_duplicate_global() {
        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![var("a"), constant("a", 1)]);
        assert_eq!(
            SymbolTable::build(&tree),
            Err(SymbolError::DuplicateDefinition {
                name: "a".to_string(),
                scope: "global scope".to_string(),
            })
        );
    }

    #[test]
    fn test_same_name_in_different_procedures() {
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![procedure("p", vec![var("i")]), procedure("q", vec![var("i")])],
        );
        let table = SymbolTable::build(&tree).unwrap();
        assert_eq!(table.lookup(Some("p"), "i").unwrap().decorated_name(), "p.i.l");
        assert_eq!(table.lookup(Some("q"), "i").unwrap().decorated_name(), "q.i.l");
    }

    #[test]
    fn test_unnamed_declaration() {
        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![var("")]);
        assert_eq!(
            SymbolTable::build(&tree),
            Err(SymbolError::UnnamedDeclaration {
                kind: NodeKind::VarDecl,
            })
        );
    }

    #[test]
    fn test_rebuild_starts_fresh() {
        let mut table = SymbolTable::build(&program()).unwrap();
        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![var("k")]);
        table.rebuild(&tree, "main").unwrap();

        assert!(table.global("x").is_none());
        assert_eq!(table.global("k").unwrap().id, VarId(0));
    }

    #[test]
    fn test_generated_shape_procedure_rejected() {
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![var("b"), procedure("L0", Vec::new())],
        );
        assert!(matches!(
            SymbolTable::build(&tree),
            Err(SymbolError::ReservedName { ref name, .. }) if name == "L0"
        ));

        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![procedure("t12", Vec::new())]);
        assert!(matches!(
            SymbolTable::build(&tree),
            Err(SymbolError::ReservedName { .. })
        ));

        // Only the exact `t<N>`/`L<N>` shape is reserved.
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![procedure("L0a", Vec::new()), procedure("total", Vec::new())],
        );
        assert!(SymbolTable::build(&tree).is_ok());
    }

    #[test]
    fn test_entry_name_reserved_for_procedures() {
        let tree = SyntaxNode::new(
            NodeKind::Block,
            "main",
            vec![procedure("main", vec![var("secret")])],
        );
        assert!(SymbolTable::build(&tree).is_ok());
        assert_eq!(
            SymbolTable::build_with_entry(&tree, "main"),
            Err(SymbolError::ReservedName {
                name: "main".to_string(),
                reason: "it is the entry block's label",
            })
        );

        let mut table = SymbolTable::new();
        assert!(table.rebuild(&tree, "main").is_err());
        assert!(table.rebuild(&tree, "start").is_ok());
    }

    #[test]
    fn test_whitespace_in_names_rejected() {
        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![var("a b")]);
        assert_eq!(
            SymbolTable::build(&tree),
            Err(SymbolError::InvalidName {
                name: "a b".to_string(),
                kind: NodeKind::VarDecl,
            })
        );

        let tree = SyntaxNode::new(NodeKind::Block, "main", vec![procedure("do\tit", Vec::new())]);
        assert!(matches!(
            SymbolTable::build(&tree),
            Err(SymbolError::InvalidName { kind: NodeKind::ProcDecl, .. })
        ));
    }
}
