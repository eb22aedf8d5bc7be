//! Append-only instruction log and name generators

use crate::Instr;
use la_arena::{Arena, Idx};
use std::fmt;

/// Index of an emitted instruction
pub type InstrId = Idx<Instr>;

/// Which generator ran out of names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Temporaries (`t<N>`)
    Temp,
    /// Labels (`L<N>`)
    Label,
}

impl fmt::Display for NameKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temp => write!(formatter, "temporary"),
            Self::Label => write!(formatter, "label"),
        }
    }
}

/// A name generator's counter overflowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} names exhausted after {issued} allocations")]
pub struct NameExhausted {
    /// Generator that overflowed
    pub kind: NameKind,
    /// Names issued before the overflow
    pub issued: u32,
}

/// Owns the instruction sequence of one lowering run.
///
/// Instructions live in an arena and are addressed by [`InstrId`]; arena
/// order is emission order. Temporaries are named `t<N>` and labels `L<N>`,
/// each with its own counter, so the two can never collide with each other
/// or with scope-decorated user names (which always contain a `.`).
#[derive(Debug, Clone, Default)]
pub struct TacEmitter {
    instrs: Arena<Instr>,
    next_temp: u32,
    next_label: u32,
}

impl TacEmitter {
    /// Creates an empty emitter with both counters at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh temporary name
    pub fn new_temp(&mut self) -> Result<String, NameExhausted> {
        let id = bump(&mut self.next_temp, NameKind::Temp)?;
        Ok(format!("t{id}"))
    }

    /// Returns a fresh label name
    pub fn new_label(&mut self) -> Result<String, NameExhausted> {
        let id = bump(&mut self.next_label, NameKind::Label)?;
        Ok(format!("L{id}"))
    }

    /// Appends an instruction at the tail of the sequence
    pub fn emit(&mut self, instr: Instr) -> InstrId {
        tracing::trace!(instr = %instr, "emit");
        self.instrs.alloc(instr)
    }

    /// Instruction at `id`
    #[must_use]
    pub fn get(&self, id: InstrId) -> &Instr {
        &self.instrs[id]
    }

    /// Instructions in program order
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instr)> {
        self.instrs.iter()
    }

    /// Instructions in program order, without ids
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.instrs.values()
    }

    /// Number of emitted instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether nothing has been emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Temporaries issued so far
    #[must_use]
    pub fn temps_issued(&self) -> u32 {
        self.next_temp
    }

    /// Labels issued so far
    #[must_use]
    pub fn labels_issued(&self) -> u32 {
        self.next_label
    }

    /// Discards all instructions and rewinds both counters
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[cfg(test)]
    fn with_counters(next_temp: u32, next_label: u32) -> Self {
        Self {
            instrs: Arena::new(),
            next_temp,
            next_label,
        }
    }
}

/// Whether `name` has the shape of a generated temporary or label
#[must_use]
pub fn is_generated_name(name: &str) -> bool {
    name.strip_prefix(['t', 'L'])
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn bump(counter: &mut u32, kind: NameKind) -> Result<u32, NameExhausted> {
    let id = *counter;
    *counter = id
        .checked_add(1)
        .ok_or(NameExhausted { kind, issued: id })?;
    Ok(id)
}
