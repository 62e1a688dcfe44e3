use crate::ast::{Instruction, Opcode, Operand, Program};
use crate::error::{AsmError, ErrorKind};
use crate::isa::{CondMode, Condition, OpcodeSpec, RdMode, RsMode};

/// A 16-bit word under construction. Every bit must be claimed by exactly one
/// writer (an operand field or a func constant); the claim mask turns a bad
/// opcode spec into an encoding-invariant error instead of a silent overlap.
#[derive(Debug, Default)]
struct Word {
    bits: u16,
    claimed: u16,
}

impl Word {
    fn set(&mut self, offset: u16, length: u16, value: u16) -> Result<(), ErrorKind> {
        debug_assert!(offset + length <= 16);
        let mask = (((1u32 << length) - 1) as u16) << offset;
        if self.claimed & mask != 0 {
            return Err(ErrorKind::EncodingInvariant(format!(
                "bits {}..{} written twice",
                offset,
                offset + length
            )));
        }
        self.claimed |= mask;
        self.bits |= (value << offset) & mask;
        Ok(())
    }

    fn is_claimed(&self, offset: u16, length: u16) -> bool {
        let mask = (((1u32 << length) - 1) as u16) << offset;
        self.claimed & mask != 0
    }

    fn finish(self) -> Result<u16, ErrorKind> {
        if self.claimed != 0xFFFF {
            return Err(ErrorKind::EncodingInvariant(format!(
                "claim mask {:#06X} leaves bits uncovered",
                self.claimed
            )));
        }
        Ok(self.bits)
    }
}

/// Compute the binary encoding of every instruction in the program.
/// Directives are left without an encoding.
pub fn encode_program(program: &mut Program) -> Result<(), AsmError> {
    for index in 0..program.len() {
        let encoding = encode_instruction(&program[index])
            .map_err(|kind| AsmError::with_instruction(kind, &program[index]))?;
        program[index].encoding = encoding;
    }
    Ok(())
}

/// Encode a single instruction, driven entirely by its opcode spec.
pub fn encode_instruction(inst: &Instruction) -> Result<Option<u16>, ErrorKind> {
    let spec = match inst.opcode {
        Opcode::Spec(spec) => spec,
        Opcode::Org | Opcode::Label => return Ok(None),
    };
    let mut word = Word::default();
    let mut operands = inst.operands.iter();

    word.set(0, 4, u16::from(spec.func0))?;

    match spec.cond {
        CondMode::Unused => {}
        CondMode::DestField => {
            let cond = expect_cond(operands.next())?;
            word.set(4, 4, u16::from(cond.encoding()))?;
        }
        CondMode::TopField => {
            let cond = expect_cond(operands.next())?;
            word.set(12, 4, u16::from(cond.encoding()))?;
        }
    }

    // Destination register, biased by +1; field value 0 means "no register".
    if spec.rd != RdMode::Unused {
        let reg = expect_reg(operands.next(), "rd register")?;
        word.set(4, 4, u16::from(reg) + 1)?;
    } else if spec.cond != CondMode::DestField {
        word.set(4, 4, require_func(spec, spec.func2, "bits 4..8")?)?;
    }

    // Source operand.
    match spec.rs {
        RsMode::Reg8 => {
            let reg = expect_reg(operands.next(), "rs register")?;
            word.set(8, 4, u16::from(reg) + 1)?;
        }
        RsMode::Pair16 => {
            let pair = expect_pair(operands.next())?;
            word.set(8, 4, u16::from(pair) + 1)?;
        }
        RsMode::Imm8 => {
            let value = check_imm(operands.next(), -128, 256)?;
            word.set(8, 8, (value as u16) & 0xFF)?;
        }
        RsMode::JumpImm8 => {
            let value = check_imm(operands.next(), -128, 128)?;
            word.set(8, 8, (value as u16) & 0xFF)?;
        }
        RsMode::SimmImm4 => {
            let value = check_imm(operands.next(), -8, 8)?;
            word.set(8, 4, (value as u16) & 0xF)?;
        }
        RsMode::Unused => {
            word.set(8, 4, require_func(spec, spec.func3, "bits 8..12")?)?;
        }
    }

    // Top nibble, unless an 8-bit immediate or the condition claimed it.
    if !word.is_claimed(12, 4) {
        word.set(12, 4, require_func(spec, spec.func1, "bits 12..16")?)?;
    }

    word.finish().map(Some)
}

fn require_func(spec: &OpcodeSpec, func: Option<u8>, slot: &str) -> Result<u16, ErrorKind> {
    func.map(u16::from).ok_or_else(|| {
        ErrorKind::EncodingInvariant(format!("{}: {slot} have no writer", spec.mnemonic))
    })
}

fn expect_cond(operand: Option<&Operand>) -> Result<Condition, ErrorKind> {
    match operand {
        Some(&Operand::Cond(cond)) => Ok(cond),
        other => Err(mismatch("cond", other)),
    }
}

fn expect_reg(operand: Option<&Operand>, expected: &'static str) -> Result<u8, ErrorKind> {
    match operand {
        Some(&Operand::Reg(index)) if index <= 6 => Ok(index),
        other => Err(mismatch(expected, other)),
    }
}

fn expect_pair(operand: Option<&Operand>) -> Result<u8, ErrorKind> {
    match operand {
        Some(&Operand::Pair(low)) if low <= 5 => Ok(low),
        other => Err(mismatch("rs16 register", other)),
    }
}

/// Fetch an immediate (or resolved displacement) and require
/// `lower <= value < upper`.
fn check_imm(operand: Option<&Operand>, lower: i64, upper: i64) -> Result<i64, ErrorKind> {
    let value = match operand {
        Some(&Operand::Imm(value)) => value,
        Some(Operand::Offset(offset)) => offset
            .disp
            .ok_or_else(|| ErrorKind::UnresolvedOffset(offset.name.clone()))?,
        other => return Err(mismatch("immediate", other)),
    };
    if value < lower || value >= upper {
        return Err(ErrorKind::ImmediateRange {
            value,
            lower,
            upper,
        });
    }
    Ok(value)
}

fn mismatch(expected: &'static str, got: Option<&Operand>) -> ErrorKind {
    ErrorKind::OperandMismatch {
        expected,
        got: got.map_or_else(|| "missing operand".to_string(), ToString::to_string),
    }
}
