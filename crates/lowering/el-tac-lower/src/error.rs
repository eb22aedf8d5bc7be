//! Lowering errors
//!
//! Every variant is fatal: the run stops at the first one and the partial
//! instruction sequence must not be used.

#![allow(unused_assignments)]

use el_syntax::NodeKind;
use el_tac::NameExhausted;
use miette::Diagnostic;
use thiserror::Error;

/// Error that aborts a lowering run
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LowerError {
    /// Identifier has no declaration visible from the current procedure
    #[error("undefined symbol `{name}` referenced by {node} node in `{procedure}`")]
    #[diagnostic(code(lower::undefined_symbol))]
    UndefinedSymbol {
        /// The unresolved name
        name: String,
        /// Kind of the referencing node
        node: NodeKind,
        /// Procedure context of the reference
        procedure: String,
        /// "did you mean" hint
        #[help]
        suggestion: Option<String>,
    },

    /// Node shape not supported by its lowering rule
    #[error("malformed {kind} node `{text}` in `{procedure}`: {reason}")]
    #[diagnostic(
        code(lower::malformed_node),
        help("the syntax tree does not match the elementary grammar")
    )]
    MalformedNode {
        /// Node kind
        kind: NodeKind,
        /// Node payload text
        text: String,
        /// Procedure context
        procedure: String,
        /// What was wrong
        reason: String,
    },

    /// A name generator ran out of names
    #[error("resource exhaustion: {0}")]
    #[diagnostic(code(lower::resource_exhaustion))]
    ResourceExhaustion(#[from] NameExhausted),
}

impl LowerError {
    pub(crate) fn undefined(
        name: &str,
        node: NodeKind,
        procedure: &str,
        suggestions: &[String],
    ) -> Self {
        let suggestion = (!suggestions.is_empty()).then(|| {
            let names: Vec<String> = suggestions.iter().map(|name| format!("`{name}`")).collect();
            format!("did you mean {}?", names.join(" or "))
        });
        Self::UndefinedSymbol {
            name: name.to_string(),
            node,
            procedure: procedure.to_string(),
            suggestion,
        }
    }
}
