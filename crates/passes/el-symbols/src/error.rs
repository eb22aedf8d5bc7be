//! Error types for the symbol table

use el_syntax::NodeKind;

/// Errors raised while building, querying or parsing a symbol table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Identifier is visible in neither the local nor the global scope
    #[error("undefined symbol `{name}`{}", in_procedure(.procedure.as_deref()))]
    Undefined {
        /// The name that was not found
        name: String,
        /// Enclosing procedure the lookup was made from
        procedure: Option<String>,
        /// Similar visible names (for "did you mean?" messages)
        suggestions: Vec<String>,
    },

    /// Name declared twice in the same scope
    #[error("`{name}` is already declared in {scope}")]
    DuplicateDefinition {
        /// The redeclared name
        name: String,
        /// `global scope` or `procedure <name>`
        scope: String,
    },

    /// Procedure name declared twice
    #[error("procedure `{name}` is already declared")]
    DuplicateProcedure {
        /// The redeclared procedure
        name: String,
    },

    /// Declaration node without a name
    #[error("{kind} node has no name")]
    UnnamedDeclaration {
        /// Declaration kind
        kind: NodeKind,
    },

    /// Declared name the dump layout cannot carry
    #[error("{kind} name `{name}` must not contain whitespace")]
    InvalidName {
        /// The offending name
        name: String,
        /// Declaration kind
        kind: NodeKind,
    },

    /// Procedure name that would clash with a generated or entry label
    #[error("procedure name `{name}` is reserved: {reason}")]
    ReservedName {
        /// The offending name
        name: String,
        /// Which label it would clash with
        reason: &'static str,
    },

    /// No id is left after `id`
    #[error("id {id} leaves no room for further declarations")]
    IdExhausted {
        /// The last id that was requested
        id: u32,
    },

    /// Line of a symbol dump that does not match the dump layout
    #[error("symbol dump line {line}: {message}")]
    DumpFormat {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
}

fn in_procedure(procedure: Option<&str>) -> String {
    procedure.map_or_else(String::new, |proc_name| format!(" in procedure `{proc_name}`"))
}

impl SymbolError {
    /// Picks up to three candidates within edit distance 3 of `name`, closest first
    pub fn compute_suggestions<'a>(
        name: &str,
        available_names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut suggestions: Vec<(&str, usize)> = available_names
            .into_iter()
            .map(|candidate| (candidate, levenshtein_distance(name, candidate)))
            .filter(|(_, distance)| *distance <= 3)
            .collect();

        suggestions.sort_by_key(|(_, distance)| *distance);
        suggestions
            .into_iter()
            .take(3)
            .map(|(candidate, _)| candidate.to_string())
            .collect()
    }
}

/// Compute Levenshtein distance between two strings
fn levenshtein_distance(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if source.is_empty() {
        return target.len();
    }
    if target.is_empty() {
        return source.len();
    }

    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];

    for (idx, source_char) in source.iter().enumerate() {
        current[0] = idx + 1;
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}
