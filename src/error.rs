use std::fmt;

use crate::ast::Instruction;
use crate::printer;

/// Cause of a fatal diagnostic. There is no warning or partial-success mode;
/// the first error aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Syntax(String),
    #[error("label `{0}` already defined")]
    DuplicateLabel(String),
    #[error("unknown label `{0}`")]
    UnknownLabel(String),
    #[error("unknown label `{label}` {side} instruction")]
    UnknownRelativeLabel { label: String, side: &'static str },
    #[error("org directive address {requested:#06X} is behind current address {current:#06X}")]
    OrgBackward { requested: u16, current: u16 },
    #[error("org directive address {0} is outside the 16-bit address space")]
    OrgRange(i64),
    #[error("address counter overflowed the 16-bit address space")]
    AddressOverflow,
    #[error("immediate value {value} is out of bounds; expected {lower} <= value < {upper}")]
    ImmediateRange { value: i64, lower: i64, upper: i64 },
    #[error("expected {expected} operand; got {got}")]
    OperandMismatch {
        expected: &'static str,
        got: String,
    },
    #[error("offset `{0}` was never resolved")]
    UnresolvedOffset(String),
    #[error("instruction encoding violates nibble coverage: {0}")]
    EncodingInvariant(String),
    #[error("binary size {size} exceeds configured output size {limit}")]
    OutputSize { size: usize, limit: usize },
}

/// A fatal diagnostic, optionally carrying enough context to locate the
/// offending input: a source position block with a caret for parse errors,
/// the pretty-printed instruction for later-pass errors.
#[derive(Debug)]
pub struct AsmError {
    pub kind: ErrorKind,
    pub context: Option<String>,
}

impl AsmError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context(kind: ErrorKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: Some(context.into()),
        }
    }

    /// Attach the pretty-printed form of `inst` as context.
    pub fn with_instruction(kind: ErrorKind, inst: &Instruction) -> Self {
        let pretty = printer::print_instruction(inst);
        Self::with_context(kind, pretty.trim_end_matches('\n'))
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(context) = &self.context {
            write!(f, "\n{context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AsmError {}

impl From<ErrorKind> for AsmError {
    fn from(kind: ErrorKind) -> Self {
        AsmError::new(kind)
    }
}
