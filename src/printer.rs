use std::fmt::Write as _;

use crate::ast::{Instruction, Opcode, Operand};
use crate::isa::{CondMode, PairOrder, RdMode, RsMode, PAIR_ORDER};

/// Render a program back to text. Address and encoding columns appear when
/// any instruction in the program carries them — uniformly across the whole
/// dump, not per line.
pub fn print_program(program: &[Instruction]) -> String {
    Printer::new(program, true).print()
}

/// Render without the address/encoding columns, so the output re-parses.
pub fn print_program_bare(program: &[Instruction]) -> String {
    Printer::new(program, false).print()
}

/// Render a single instruction; used for diagnostics context.
pub fn print_instruction(inst: &Instruction) -> String {
    Printer::new(std::slice::from_ref(inst), true).print()
}

struct Printer<'a> {
    program: &'a [Instruction],
    emit_address: bool,
    emit_encoding: bool,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(program: &'a [Instruction], annotate: bool) -> Self {
        Self {
            program,
            emit_address: annotate && program.iter().any(|i| i.address.is_some()),
            emit_encoding: annotate && program.iter().any(|i| i.encoding.is_some()),
            out: String::new(),
        }
    }

    fn print(mut self) -> String {
        for inst in self.program {
            self.print_instruction(inst);
            self.out.push('\n');
        }
        self.out
    }

    fn print_instruction(&mut self, inst: &Instruction) {
        if self.emit_address {
            match inst.address {
                Some(addr) => {
                    let _ = write!(self.out, "{addr:04X}:  ");
                }
                None => self.out.push_str("????:  "),
            }
        }
        if self.emit_encoding {
            match inst.encoding {
                Some(encoding) => {
                    let _ = write!(self.out, "{encoding:04X}  ");
                }
                None => self.out.push_str("      "),
            }
        }

        let spec = match inst.opcode {
            Opcode::Label => {
                if let Some(name) = inst.label_name() {
                    self.out.push_str(name);
                }
                self.out.push(':');
                return;
            }
            Opcode::Org => {
                self.out.push_str(".org ");
                if let Some(&Operand::Imm(value)) = inst.operands.first() {
                    let _ = write!(self.out, "0x{value:04X}");
                }
                return;
            }
            Opcode::Spec(spec) => spec,
        };

        // Operand rendering is driven by the same metadata the parser uses,
        // so a printed instruction always round-trips.
        let mut operands = inst.operands.iter();
        let mut head = spec.mnemonic.to_string();
        if spec.cond != CondMode::Unused {
            if let Some(Operand::Cond(cond)) = operands.next() {
                head.push('.');
                head.push_str(cond.name());
            }
        }
        let has_operands = spec.rd != RdMode::Unused || spec.rs != RsMode::Unused;
        if has_operands {
            head.push(' ');
        }
        let _ = write!(self.out, "    {head:<9}");

        let mut wrote_rd = false;
        if spec.rd != RdMode::Unused {
            match operands.next() {
                Some(&Operand::Reg(index)) => {
                    let _ = write!(self.out, "r{index}");
                }
                Some(other) => {
                    let _ = write!(self.out, "<{other}>");
                }
                None => {}
            }
            wrote_rd = true;
        }
        if spec.rs != RsMode::Unused {
            if wrote_rd {
                self.out.push_str(", ");
            }
            match (spec.rs, operands.next()) {
                (RsMode::Reg8, Some(&Operand::Reg(index))) => {
                    let _ = write!(self.out, "r{index}");
                }
                (RsMode::Pair16, Some(&Operand::Pair(low))) => {
                    let (first, second) = match PAIR_ORDER {
                        PairOrder::HighFirst => (low + 1, low),
                        PairOrder::LowFirst => (low, low + 1),
                    };
                    let _ = write!(self.out, "r{first}r{second}");
                }
                (RsMode::Imm8 | RsMode::SimmImm4, Some(&Operand::Imm(value))) => {
                    let _ = write!(self.out, "{value}");
                }
                (RsMode::JumpImm8, Some(operand)) => {
                    self.print_target(operand);
                    self.print_target_comment(inst, operand);
                }
                (_, Some(other)) => {
                    let _ = write!(self.out, "<{other}>");
                }
                (_, None) => {}
            }
        }
    }

    /// Jump targets print with an explicit sign so a displacement reads as
    /// relative; label references print by name.
    fn print_target(&mut self, operand: &Operand) {
        match operand {
            Operand::Imm(value) if *value >= 0 => {
                let _ = write!(self.out, "+{value}");
            }
            Operand::Imm(value) => {
                let _ = write!(self.out, "{value}");
            }
            Operand::Offset(offset) => self.out.push_str(&offset.name),
            other => {
                let _ = write!(self.out, "<{other}>");
            }
        }
    }

    fn print_target_comment(&mut self, inst: &Instruction, operand: &Operand) {
        let disp = match operand {
            Operand::Offset(offset) => offset.disp,
            Operand::Imm(value) => Some(*value),
            _ => None,
        };
        if let (Some(addr), Some(disp)) = (inst.address, disp) {
            let target = (i64::from(addr) + disp) as u16;
            let _ = write!(self.out, "  # {target:04X}");
        }
    }
}
