//! Line-oriented persistence format for TAC
//!
//! Each instruction is written as a block of four fields followed by a
//! blank line:
//!
//! ```text
//! TYPE: LOAD
//! ARG1: a.g
//! ARG2: NULL
//! RESULT: t0
//!
//! ```
//!
//! Absent operands are written as [`NULL_MARKER`]. Operands may not be
//! empty, contain whitespace, equal the null marker, or exceed the
//! configured field length; such values are rejected on both write and
//! read rather than truncated.

use crate::{Instr, Opcode};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Placeholder for an absent operand
pub const NULL_MARKER: &str = "NULL";

/// Default field length limit in bytes
pub const DEFAULT_MAX_FIELD_LEN: usize = 31;

const FIELDS: [&str; 4] = ["TYPE", "ARG1", "ARG2", "RESULT"];
const LINES_PER_BLOCK: usize = FIELDS.len() + 1;

/// Errors reading or writing the block format
#[derive(Debug, thiserror::Error)]
pub enum TacFormatError {
    /// A line did not carry the expected field prefix
    #[error("line {line}: expected `{expected}:` field, found {found:?}")]
    MissingField {
        /// 1-based line number
        line: usize,
        /// Field name that was expected
        expected: &'static str,
        /// Offending line
        found: String,
    },

    /// Input ended in the middle of a block
    #[error("line {line}: input ended before `{expected}:` field")]
    UnexpectedEof {
        /// 1-based line number where the field was expected
        line: usize,
        /// Field name that was expected
        expected: &'static str,
    },

    /// Opcode mnemonic not recognised
    #[error("line {line}: unknown opcode `{mnemonic}`")]
    UnknownOpcode {
        /// 1-based line number
        line: usize,
        /// Unrecognised mnemonic
        mnemonic: String,
    },

    /// Field value longer than the limit
    #[error("line {line}: {field} value `{value}` is {len} bytes, limit is {limit}")]
    FieldTooLong {
        /// 1-based line number
        line: usize,
        /// Field name
        field: &'static str,
        /// Full value
        value: String,
        /// Value length in bytes
        len: usize,
        /// Configured limit
        limit: usize,
    },

    /// Field value is empty, contains whitespace or equals the null marker
    #[error("line {line}: {field} value {value:?} cannot be represented")]
    InvalidValue {
        /// 1-based line number
        line: usize,
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A read that stopped at a format error.
///
/// Blocks are independent, so everything parsed before the error is kept.
#[derive(Debug, thiserror::Error)]
#[error("{error} (after {} parsed instructions)", .parsed.len())]
pub struct PartialRead {
    /// Instructions parsed before the error
    pub parsed: Vec<Instr>,
    /// The error that stopped parsing
    #[source]
    pub error: TacFormatError,
}

/// Reader/writer settings for the block format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TacFormat {
    max_field_len: usize,
}

impl Default for TacFormat {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FIELD_LEN)
    }
}

impl TacFormat {
    /// Creates a format with the given field length limit
    #[must_use]
    pub const fn new(max_field_len: usize) -> Self {
        Self { max_field_len }
    }

    /// Field length limit in bytes
    #[must_use]
    pub const fn max_field_len(&self) -> usize {
        self.max_field_len
    }

    /// Writes every instruction as a four-line block.
    ///
    /// Validation happens per block before anything of it is written, so
    /// on error the sink holds only whole blocks.
    pub fn write<'a, W: Write>(
        &self,
        instrs: impl IntoIterator<Item = &'a Instr>,
        mut sink: W,
    ) -> Result<(), TacFormatError> {
        for (index, instr) in instrs.into_iter().enumerate() {
            let first_line = index * LINES_PER_BLOCK + 1;
            let values = [
                Some(instr.op.mnemonic()),
                instr.arg1.as_deref(),
                instr.arg2.as_deref(),
                instr.result.as_deref(),
            ];

            for (offset, (field, value)) in FIELDS.into_iter().zip(values).enumerate() {
                if let Some(value) = value {
                    self.check_value(first_line + offset, field, value)?;
                }
            }

            for (field, value) in FIELDS.into_iter().zip(values) {
                writeln!(sink, "{field}: {}", value.unwrap_or(NULL_MARKER))?;
            }
            writeln!(sink)?;
        }
        sink.flush()?;
        Ok(())
    }

    /// Streams instructions back out of `source`
    pub fn reader<R: BufRead>(&self, source: R) -> TacReader<R> {
        TacReader {
            lines: source.lines(),
            line_no: 0,
            format: *self,
            done: false,
        }
    }

    /// Reads every block from `source`
    pub fn read<R: BufRead>(&self, source: R) -> Result<Vec<Instr>, PartialRead> {
        let mut parsed = Vec::new();
        for item in self.reader(source) {
            match item {
                Ok(instr) => parsed.push(instr),
                Err(error) => return Err(PartialRead { parsed, error }),
            }
        }
        Ok(parsed)
    }

    /// Writes the sequence to a file, creating or truncating it
    pub fn export_file<'a>(
        &self,
        instrs: impl IntoIterator<Item = &'a Instr>,
        path: impl AsRef<Path>,
    ) -> Result<(), TacFormatError> {
        let file = File::create(path)?;
        self.write(instrs, BufWriter::new(file))
    }

    /// Reads a sequence from a file
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<Vec<Instr>, PartialRead> {
        let file = File::open(path).map_err(|error| PartialRead {
            parsed: Vec::new(),
            error: error.into(),
        })?;
        self.read(BufReader::new(file))
    }

    fn check_value(
        &self,
        line: usize,
        field: &'static str,
        value: &str,
    ) -> Result<(), TacFormatError> {
        if value.is_empty() || value == NULL_MARKER || value.contains(char::is_whitespace) {
            return Err(TacFormatError::InvalidValue {
                line,
                field,
                value: value.to_string(),
            });
        }
        if value.len() > self.max_field_len {
            return Err(TacFormatError::FieldTooLong {
                line,
                field,
                value: value.to_string(),
                len: value.len(),
                limit: self.max_field_len,
            });
        }
        Ok(())
    }
}

/// Streaming block parser.
///
/// Yields one instruction per block and stops for good after the first
/// error.
pub struct TacReader<R> {
    lines: io::Lines<R>,
    line_no: usize,
    format: TacFormat,
    done: bool,
}

impl<R: BufRead> TacReader<R> {
    fn next_line(&mut self) -> Result<Option<String>, TacFormatError> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// Reads one `FIELD: value` line; `None` means the null marker
    fn field(&mut self, expected: &'static str) -> Result<Option<String>, TacFormatError> {
        let Some(line) = self.next_line()? else {
            return Err(TacFormatError::UnexpectedEof {
                line: self.line_no + 1,
                expected,
            });
        };
        self.parse_field(&line, expected)
    }

    fn parse_field(
        &self,
        line: &str,
        expected: &'static str,
    ) -> Result<Option<String>, TacFormatError> {
        let line = line.trim_end_matches('\r');
        let rest = line
            .strip_prefix(expected)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| TacFormatError::MissingField {
                line: self.line_no,
                expected,
                found: line.to_string(),
            })?;

        let value = rest.trim();
        if value == NULL_MARKER {
            return Ok(None);
        }
        self.format.check_value(self.line_no, expected, value)?;
        Ok(Some(value.to_string()))
    }

    fn block(&mut self) -> Result<Option<Instr>, TacFormatError> {
        let type_line = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => {}
                Some(line) => break line,
            }
        };

        let mnemonic = self
            .parse_field(&type_line, FIELDS[0])?
            .ok_or_else(|| TacFormatError::InvalidValue {
                line: self.line_no,
                field: FIELDS[0],
                value: NULL_MARKER.to_string(),
            })?;
        let op: Opcode = mnemonic.parse().map_err(|_| TacFormatError::UnknownOpcode {
            line: self.line_no,
            mnemonic,
        })?;

        let arg1 = self.field(FIELDS[1])?;
        let arg2 = self.field(FIELDS[2])?;
        let result = self.field(FIELDS[3])?;
        Ok(Some(Instr::new(op, arg1, arg2, result)))
    }
}

impl<R: BufRead> Iterator for TacReader<R> {
    type Item = Result<Instr, TacFormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.block() {
            Ok(Some(instr)) => Some(Ok(instr)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                tracing::debug!(line = self.line_no, %error, "stopped reading TAC");
                Some(Err(error))
            }
        }
    }
}

/// Writes `instrs` with the default field limit
pub fn serialize<'a, W: Write>(
    instrs: impl IntoIterator<Item = &'a Instr>,
    sink: W,
) -> Result<(), TacFormatError> {
    TacFormat::default().write(instrs, sink)
}

/// Reads instructions with the default field limit
pub fn deserialize<R: BufRead>(source: R) -> Result<Vec<Instr>, PartialRead> {
    TacFormat::default().read(source)
}
