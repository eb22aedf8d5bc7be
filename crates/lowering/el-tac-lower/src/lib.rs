//! Syntax tree → TAC lowering
//!
//! One rule per node kind. Expression-like nodes return the name holding
//! their value; statement-like nodes return `None`. The only state carried
//! through the recursion is the name of the enclosing procedure, passed by
//! value, so leaving a procedure's subtree restores the caller's context.

pub mod error;

pub use error::LowerError;

use el_symbols::{SymbolError, SymbolTable};
use el_syntax::{NodeKind, SyntaxNode};
use el_tac::{BinOp, Instr, TacEmitter};

/// Name of the entry block when none is configured
pub const DEFAULT_ENTRY: &str = "main";

/// Context for lowering one program
pub struct LoweringContext<'ctx> {
    /// Completed symbol table (read only)
    symbols: &'ctx SymbolTable,
    /// Instruction sink
    emitter: &'ctx mut TacEmitter,
    /// Name of the designated entry block
    entry: &'ctx str,
}

impl<'ctx> LoweringContext<'ctx> {
    /// Create a new lowering context
    pub fn new(
        symbols: &'ctx SymbolTable,
        emitter: &'ctx mut TacEmitter,
        entry: &'ctx str,
    ) -> Self {
        Self {
            symbols,
            emitter,
            entry,
        }
    }

    /// Lowers a whole program, starting in the entry block's context
    pub fn lower_program(&mut self, root: &SyntaxNode) -> Result<(), LowerError> {
        self.lower(root, self.entry)?;
        tracing::debug!(
            instructions = self.emitter.len(),
            temps = self.emitter.temps_issued(),
            labels = self.emitter.labels_issued(),
            "lowered program"
        );
        Ok(())
    }

    /// Lowers `node` inside `procedure`, returning the name holding its
    /// value for expression-like nodes
    pub fn lower(
        &mut self,
        node: &SyntaxNode,
        procedure: &str,
    ) -> Result<Option<String>, LowerError> {
        match node.kind {
            NodeKind::Block => {
                self.lower_block(node, procedure)?;
                Ok(None)
            }

            NodeKind::ProcDecl => {
                let [body] = self.children::<1>(node, procedure)?;
                if node.text.is_empty() {
                    return Err(malformed(node, procedure, "procedure has no name"));
                }
                let _span = tracing::debug_span!("procedure", name = %node.text).entered();

                self.emitter.emit(Instr::label(&node.text));
                self.lower(body, &node.text)?;
                self.emitter.emit(Instr::ret());
                Ok(None)
            }

            NodeKind::While => {
                let [condition, body] = self.children::<2>(node, procedure)?;
                let start = self.emitter.new_label()?;
                let end = self.emitter.new_label()?;

                self.emitter.emit(Instr::label(&start));
                let cond = self.lower_value(condition, procedure)?;
                self.emitter.emit(Instr::if_not(cond, &end));
                self.lower(body, procedure)?;
                self.emitter.emit(Instr::goto(start));
                self.emitter.emit(Instr::label(end));
                Ok(None)
            }

            NodeKind::If => {
                let [condition, body] = self.children::<2>(node, procedure)?;
                let cond = self.lower_value(condition, procedure)?;
                let skip = self.emitter.new_label()?;

                self.emitter.emit(Instr::if_not(cond, &skip));
                self.lower(body, procedure)?;
                self.emitter.emit(Instr::label(skip));
                Ok(None)
            }

            NodeKind::Condition => {
                let op = self.operator(node, procedure, true)?;
                self.lower_binary(node, op, procedure).map(Some)
            }

            NodeKind::Operator | NodeKind::Term => {
                let op = self.operator(node, procedure, false)?;
                self.lower_binary(node, op, procedure).map(Some)
            }

            NodeKind::Assignment => {
                let [value] = self.children::<1>(node, procedure)?;
                let temp = self.lower_value(value, procedure)?;
                let target = self.resolve(node, procedure)?;
                self.emitter.emit(Instr::assign(temp, target));
                Ok(None)
            }

            NodeKind::ConstDecl => {
                let [value] = self.children::<1>(node, procedure)?;
                let temp = self.lower_value(value, procedure)?;
                let target = self.resolve(node, procedure)?;
                self.emitter.emit(Instr::assign(temp, target));
                Ok(None)
            }

            NodeKind::Factor => match node.children.as_slice() {
                [operand] => self.lower(operand, procedure),
                // The first child is the sign itself; the operand follows it.
                [_, operand] if node.text == "-" => {
                    let value = self.lower_value(operand, procedure)?;
                    let result = self.emitter.new_temp()?;
                    self.emitter.emit(Instr::neg(value, &result));
                    Ok(Some(result))
                }
                _ => Err(malformed(
                    node,
                    procedure,
                    "expected one child, or two children with a unary `-`",
                )),
            },

            NodeKind::Expression => {
                let [inner] = self.children::<1>(node, procedure)?;
                self.lower(inner, procedure)
            }

            NodeKind::Identifier => {
                let name = self.resolve(node, procedure)?;
                let temp = self.emitter.new_temp()?;
                self.emitter.emit(Instr::load(name, &temp));
                Ok(Some(temp))
            }

            NodeKind::Number => {
                if node.text.is_empty() {
                    return Err(malformed(node, procedure, "number has no literal text"));
                }
                let temp = self.emitter.new_temp()?;
                self.emitter.emit(Instr::load(&node.text, &temp));
                Ok(Some(temp))
            }

            NodeKind::Call => {
                if self.symbols.procedure(&node.text).is_none() {
                    let suggestions = SymbolError::compute_suggestions(
                        &node.text,
                        self.symbols.procedures().map(|declared| declared.name.as_str()),
                    );
                    return Err(LowerError::undefined(
                        &node.text,
                        node.kind,
                        procedure,
                        &suggestions,
                    ));
                }
                self.emitter.emit(Instr::call(&node.text));
                Ok(None)
            }

            NodeKind::Program | NodeKind::Sequence | NodeKind::VarDecl => {
                for child in &node.children {
                    self.lower(child, procedure)?;
                }
                Ok(None)
            }
        }
    }

    fn lower_block(&mut self, node: &SyntaxNode, procedure: &str) -> Result<(), LowerError> {
        let is_entry = node.text == self.entry;
        if is_entry {
            self.emitter.emit(Instr::label(self.entry));
        }

        for child in &node.children {
            self.lower(child, procedure)?;
        }

        if is_entry {
            self.emitter.emit(Instr::ret());
            let end = self.emitter.new_label()?;
            self.emitter.emit(Instr::label(end));
        }
        Ok(())
    }

    fn lower_binary(
        &mut self,
        node: &SyntaxNode,
        op: BinOp,
        procedure: &str,
    ) -> Result<String, LowerError> {
        let [left, right] = self.children::<2>(node, procedure)?;
        let left = self.lower_value(left, procedure)?;
        let right = self.lower_value(right, procedure)?;
        let result = self.emitter.new_temp()?;
        self.emitter.emit(Instr::binary(op, left, right, &result));
        Ok(result)
    }

    /// Lowers a node that must produce a value
    fn lower_value(&mut self, node: &SyntaxNode, procedure: &str) -> Result<String, LowerError> {
        self.lower(node, procedure)?
            .ok_or_else(|| malformed(node, procedure, "statement used where a value is required"))
    }

    /// Scope-decorated name of the variable `node` names
    fn resolve(&self, node: &SyntaxNode, procedure: &str) -> Result<String, LowerError> {
        match self.symbols.lookup(Some(procedure), &node.text) {
            Ok(resolved) => Ok(resolved.decorated_name()),
            Err(SymbolError::Undefined { suggestions, .. }) => {
                tracing::debug!(name = %node.text, procedure, "unresolved symbol");
                Err(LowerError::undefined(&node.text, node.kind, procedure, &suggestions))
            }
            Err(other) => Err(malformed(node, procedure, &other.to_string())),
        }
    }

    fn operator(
        &self,
        node: &SyntaxNode,
        procedure: &str,
        relational: bool,
    ) -> Result<BinOp, LowerError> {
        match BinOp::from_operator(&node.text) {
            Some(op) if op.is_relational() == relational => Ok(op),
            _ if relational => Err(malformed(node, procedure, "expected a relational operator")),
            _ => Err(malformed(node, procedure, "expected an arithmetic operator")),
        }
    }

    fn children<'n, const N: usize>(
        &self,
        node: &'n SyntaxNode,
        procedure: &str,
    ) -> Result<[&'n SyntaxNode; N], LowerError> {
        let children: Vec<&SyntaxNode> = node.children.iter().collect();
        children.try_into().map_err(|_| {
            malformed(
                node,
                procedure,
                &format!("expected {N} children, found {}", node.children.len()),
            )
        })
    }
}

fn malformed(node: &SyntaxNode, procedure: &str, reason: &str) -> LowerError {
    LowerError::MalformedNode {
        kind: node.kind,
        text: node.text.clone(),
        procedure: procedure.to_string(),
        reason: reason.to_string(),
    }
}

/// Lowers `root` into a fresh emitter.
///
/// `symbols` must have been built from the same tree. On error the
/// partially filled emitter is dropped.
pub fn lower_program(
    root: &SyntaxNode,
    symbols: &SymbolTable,
    entry: &str,
) -> Result<TacEmitter, LowerError> {
    let mut emitter = TacEmitter::new();
    LoweringContext::new(symbols, &mut emitter, entry).lower_program(root)?;
    Ok(emitter)
}
