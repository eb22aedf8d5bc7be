//! Three-address code (TAC)
//!
//! TAC is the linear representation produced by lowering the syntax tree.
//! Every instruction has at most two source operands and one result, and
//! program order is the only order that matters: instructions are appended
//! to a [`TacEmitter`] and never removed or reordered.
//!
//! Operands are kept as text. A name is either a scope-decorated user
//! variable (`x.g`, `p.x.l`), a temporary (`t0`), a label (`L0`), a
//! procedure name or a literal.

pub mod emitter;
pub mod format;

pub use emitter::{InstrId, NameExhausted, NameKind, TacEmitter, is_generated_name};
pub use format::{
    DEFAULT_MAX_FIELD_LEN, NULL_MARKER, PartialRead, TacFormat, TacFormatError, TacReader,
    deserialize, serialize,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary arithmetic and relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Equality
    Eq,
    /// Inequality
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl BinOp {
    const ALL: [Self; 10] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
    ];

    /// Maps operator text from the syntax tree to an operator.
    ///
    /// `#` is the source spelling of inequality and `=` is equality inside
    /// a condition; both are normalised here.
    #[must_use]
    pub fn from_operator(text: &str) -> Option<Self> {
        match text {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "=" | "==" => Some(Self::Eq),
            "#" | "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    /// Canonical mnemonic
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether the operator yields a boolean
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// Operation code of a TAC instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Opcode {
    /// Jump target; the label name is the result operand
    Label,
    /// Unconditional jump to `arg1`
    Goto,
    /// Jump to `arg2` when `arg1` is false
    IfNot,
    /// Call the procedure named by `arg1`
    Call,
    /// Return from the current procedure
    Return,
    /// Copy `arg1` into `result`
    Assign,
    /// Load a variable or literal `arg1` into `result`
    Load,
    /// Negate `arg1` into `result`
    Neg,
    /// `result = arg1 op arg2`
    Binary(BinOp),
}

impl Opcode {
    /// Textual mnemonic, shared by the printer and the serialized format
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Label => "LABEL",
            Self::Goto => "GOTO",
            Self::IfNot => "IF_NOT",
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::Assign => "=",
            Self::Load => "LOAD",
            Self::Neg => "NEG",
            Self::Binary(op) => op.mnemonic(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.mnemonic())
    }
}

/// Error for a mnemonic that names no opcode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown opcode `{0}`")]
pub struct UnknownOpcode(pub String);

impl FromStr for Opcode {
    type Err = UnknownOpcode;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let op = match text {
            "LABEL" => Self::Label,
            "GOTO" => Self::Goto,
            "IF_NOT" => Self::IfNot,
            "CALL" => Self::Call,
            "RETURN" => Self::Return,
            "=" => Self::Assign,
            "LOAD" => Self::Load,
            "NEG" => Self::Neg,
            other => BinOp::ALL
                .into_iter()
                .find(|op| op.mnemonic() == other)
                .map(Self::Binary)
                .ok_or_else(|| UnknownOpcode(other.to_string()))?,
        };
        Ok(op)
    }
}

impl From<Opcode> for String {
    fn from(op: Opcode) -> Self {
        op.mnemonic().to_string()
    }
}

impl TryFrom<String> for Opcode {
    type Error = UnknownOpcode;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

/// A single three-address instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instr {
    /// Operation
    pub op: Opcode,
    /// First source operand
    pub arg1: Option<String>,
    /// Second source operand
    pub arg2: Option<String>,
    /// Result operand
    pub result: Option<String>,
}

impl Instr {
    /// Creates an instruction from raw parts
    #[must_use]
    pub fn new(
        op: Opcode,
        arg1: Option<String>,
        arg2: Option<String>,
        result: Option<String>,
    ) -> Self {
        Self {
            op,
            arg1,
            arg2,
            result,
        }
    }

    /// `name:`
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Self::new(Opcode::Label, None, None, Some(name.into()))
    }

    /// `GOTO target`
    #[must_use]
    pub fn goto(target: impl Into<String>) -> Self {
        Self::new(Opcode::Goto, Some(target.into()), None, None)
    }

    /// `IF_NOT cond GOTO target`
    #[must_use]
    pub fn if_not(cond: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(Opcode::IfNot, Some(cond.into()), Some(target.into()), None)
    }

    /// `CALL proc`
    #[must_use]
    pub fn call(procedure: impl Into<String>) -> Self {
        Self::new(Opcode::Call, Some(procedure.into()), None, None)
    }

    /// `RETURN`
    #[must_use]
    pub fn ret() -> Self {
        Self::new(Opcode::Return, None, None, None)
    }

    /// `dest = src`
    #[must_use]
    pub fn assign(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::new(Opcode::Assign, Some(src.into()), None, Some(dest.into()))
    }

    /// `dest = LOAD src`
    #[must_use]
    pub fn load(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::new(Opcode::Load, Some(src.into()), None, Some(dest.into()))
    }

    /// `dest = NEG src`
    #[must_use]
    pub fn neg(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::new(Opcode::Neg, Some(src.into()), None, Some(dest.into()))
    }

    /// `dest = op left right`
    #[must_use]
    pub fn binary(
        op: BinOp,
        left: impl Into<String>,
        right: impl Into<String>,
        dest: impl Into<String>,
    ) -> Self {
        Self::new(
            Opcode::Binary(op),
            Some(left.into()),
            Some(right.into()),
            Some(dest.into()),
        )
    }
}

fn operand(field: Option<&String>) -> &str {
    field.map_or(NULL_MARKER, String::as_str)
}

impl fmt::Display for Instr {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arg1 = operand(self.arg1.as_ref());
        let arg2 = operand(self.arg2.as_ref());
        let result = operand(self.result.as_ref());

        match self.op {
            Opcode::Label => write!(formatter, "{result}:"),
            Opcode::IfNot => write!(formatter, "IF_NOT {arg1} GOTO {arg2}"),
            Opcode::Goto => write!(formatter, "GOTO {arg1}"),
            Opcode::Call => write!(formatter, "CALL {arg1}"),
            Opcode::Load => write!(formatter, "{result} = LOAD {arg1}"),
            Opcode::Return => write!(formatter, "RETURN"),
            Opcode::Assign => write!(formatter, "{result} = {arg1}"),
            Opcode::Neg => write!(formatter, "{result} = NEG {arg1}"),
            Opcode::Binary(op) => {
                write!(formatter, "{result} = {op} {arg1} {arg2}", op = op.mnemonic())
            }
        }
    }
}

/// Renders instructions one per line
pub fn render<'a>(instrs: impl IntoIterator<Item = &'a Instr>) -> String {
    let mut out = String::new();
    for instr in instrs {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_operator_text_normalisation() {
        assert_eq!(BinOp::from_operator("#"), Some(BinOp::Ne));
        assert_eq!(BinOp::from_operator("!="), Some(BinOp::Ne));
        assert_eq!(BinOp::from_operator("="), Some(BinOp::Eq));
        assert_eq!(BinOp::from_operator(">="), Some(BinOp::Ge));
        assert_eq!(BinOp::from_operator("%"), None);
        assert!(BinOp::Lt.is_relational());
        assert!(!BinOp::Mul.is_relational());
    }

    #[test]
    fn test_mnemonics_parse_back() {
        let ops = [
            Opcode::Label,
            Opcode::Goto,
            Opcode::IfNot,
            Opcode::Call,
            Opcode::Return,
            Opcode::Assign,
            Opcode::Load,
            Opcode::Neg,
        ]
        .into_iter()
        .chain(BinOp::ALL.into_iter().map(Opcode::Binary));

        for op in ops {
            assert_eq!(op.mnemonic().parse::<Opcode>(), Ok(op));
        }
        assert_eq!(
            "HALT".parse::<Opcode>(),
            Err(UnknownOpcode("HALT".to_string()))
        );
    }

    #[test]
    fn test_equality_never_reads_as_assignment() {
        assert_ne!(Opcode::Binary(BinOp::Eq).mnemonic(), Opcode::Assign.mnemonic());
    }

    #[test]
    fn test_render_templates() {
        let instrs = vec![
            Instr::label("L0"),
            Instr::load("b.g", "t0"),
            Instr::load("0", "t1"),
            Instr::binary(BinOp::Ne, "t0", "t1", "t2"),
            Instr::if_not("t2", "L1"),
            Instr::neg("t2", "t3"),
            Instr::assign("t3", "b.g"),
            Instr::call("p"),
            Instr::goto("L0"),
            Instr::label("L1"),
            Instr::ret(),
        ];

        expect![[r#"
            L0:
            t0 = LOAD b.g
            t1 = LOAD 0
            t2 = != t0 t1
            IF_NOT t2 GOTO L1
            t3 = NEG t2
            b.g = t3
            CALL p
            GOTO L0
            L1:
            RETURN
        "#]]
        .assert_eq(&render(&instrs));
    }

    #[test]
    fn test_json_uses_mnemonics() {
        let json = serde_json::to_string(&Instr::binary(BinOp::Le, "t0", "t1", "t2")).unwrap();
        assert_eq!(
            json,
            r#"{"op":"<=","arg1":"t0","arg2":"t1","result":"t2"}"#
        );
        let back: Instr = serde_json::from_str(&json).unwrap();
        assert_eq!(back.op, Opcode::Binary(BinOp::Le));
    }
}
