//! Syntax tree consumed by the Elementary middle end
//!
//! The tree is produced by an external PL/0-style parser and handed to the
//! driver as JSON. Every node owns its children; there is no sharing and
//! no parent pointers.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Generic syntax tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// The kind of this node
    pub kind: NodeKind,
    /// Payload text (names, operators, literals); empty when unused
    #[serde(default)]
    pub text: String,
    /// Child nodes, in source order
    #[serde(default)]
    pub children: Vec<SyntaxNode>,
}

/// Node kinds of the elementary grammar
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Whole program
    #[display("program")]
    Program,
    /// Block (declarations followed by a statement)
    #[display("block")]
    Block,
    /// `const name = value`
    #[display("const_decl")]
    ConstDecl,
    /// `var name`
    #[display("var_decl")]
    VarDecl,
    /// `procedure name; block`
    #[display("proc_decl")]
    ProcDecl,
    /// `begin ... end` statement list
    #[display("sequence")]
    Sequence,
    /// `name := expression`
    #[display("assignment")]
    Assignment,
    /// `call name`
    #[display("call")]
    Call,
    /// `if condition then statement`
    #[display("if")]
    If,
    /// `while condition do statement`
    #[display("while")]
    While,
    /// Relational comparison
    #[display("condition")]
    Condition,
    /// Expression wrapper
    #[display("expression")]
    Expression,
    /// Additive operator
    #[display("operator")]
    Operator,
    /// Multiplicative operator
    #[display("term")]
    Term,
    /// Factor (parenthesised or negated operand)
    #[display("factor")]
    Factor,
    /// Identifier reference
    #[display("identifier")]
    Identifier,
    /// Number literal
    #[display("number")]
    Number,
}

impl SyntaxNode {
    /// Creates a node with payload text and children
    #[must_use]
    pub fn new(kind: NodeKind, text: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            kind,
            text: text.into(),
            children,
        }
    }

    /// Creates a childless node
    #[must_use]
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Self::new(kind, text, Vec::new())
    }

    /// Creates an identifier reference
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Identifier, name)
    }

    /// Creates a number literal
    #[must_use]
    pub fn number(value: i64) -> Self {
        Self::leaf(NodeKind::Number, value.to_string())
    }

    /// Creates a binary node (`Operator`, `Term` or `Condition`)
    #[must_use]
    pub fn binary(kind: NodeKind, op: impl Into<String>, left: Self, right: Self) -> Self {
        Self::new(kind, op, vec![left, right])
    }

    /// Creates an assignment of `value` to `target`
    #[must_use]
    pub fn assign(target: impl Into<String>, value: Self) -> Self {
        Self::new(NodeKind::Assignment, target, vec![value])
    }

    /// Visits this node and all descendants in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Counts this node and all descendants
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}
