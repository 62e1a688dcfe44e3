use std::fmt;

use crate::isa::{Condition, OpcodeSpec};

/// A jump/branch target awaiting resolution.
///
/// `binding` is an index into the owning program's instruction sequence (the
/// defining label directive), filled in by the resolver; `disp` is the signed
/// byte displacement, filled in by the evaluator once addresses are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offset {
    pub name: String,
    pub binding: Option<usize>,
    pub disp: Option<i64>,
}

impl Offset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: None,
            disp: None,
        }
    }
}

/// A single instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Integer literal; range-checked only at encode time.
    Imm(i64),
    /// Register index 0..=6.
    Reg(u8),
    /// Register pair, stored as the low index 0..=5 of the pair {low, low+1}.
    Pair(u8),
    Cond(Condition),
    /// Name being defined by a label directive.
    Label(String),
    /// Reference to a label used as a jump/branch target.
    Offset(Offset),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "immediate {value}"),
            Operand::Reg(index) => write!(f, "register r{index}"),
            Operand::Pair(low) => write!(f, "register pair r{}r{}", low + 1, low),
            Operand::Cond(cond) => write!(f, "condition {}", cond.name()),
            Operand::Label(name) => write!(f, "label {name}"),
            Operand::Offset(offset) => write!(f, "offset {}", offset.name),
        }
    }
}

/// Instruction opcode: a real table entry, or one of the two directive
/// pseudo-opcodes that exist outside the instruction set.
#[derive(Debug, Clone, Copy)]
pub enum Opcode {
    Spec(&'static OpcodeSpec),
    /// `.org <addr>`: set the address counter.
    Org,
    /// `name:`: mark the current address, zero width.
    Label,
}

/// One parsed statement. Created by the parser; the later passes fill in
/// `address` and `encoding` in place without ever reordering the program.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub address: Option<u16>,
    pub encoding: Option<u16>,
}

impl Instruction {
    pub fn new(spec: &'static OpcodeSpec, operands: Vec<Operand>) -> Self {
        Self {
            opcode: Opcode::Spec(spec),
            operands,
            address: None,
            encoding: None,
        }
    }

    pub fn org(address: i64) -> Self {
        Self {
            opcode: Opcode::Org,
            operands: vec![Operand::Imm(address)],
            address: None,
            encoding: None,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self {
            opcode: Opcode::Label,
            operands: vec![Operand::Label(name.into())],
            address: None,
            encoding: None,
        }
    }

    /// The label name if this is a label directive.
    pub fn label_name(&self) -> Option<&str> {
        match (&self.opcode, self.operands.first()) {
            (Opcode::Label, Some(Operand::Label(name))) => Some(name),
            _ => None,
        }
    }
}

/// An ordered program; order is significant both for relative-label
/// resolution and for address layout.
pub type Program = Vec<Instruction>;
