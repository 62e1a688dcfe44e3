use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::isa::RdMode;

/// Hardware view of the source-operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsSignal {
    Reg8,
    Pair16,
    Imm8,
    Imm4,
}

impl RsSignal {
    pub fn bits(self) -> u8 {
        match self {
            RsSignal::Reg8 => 0b00,
            RsSignal::Pair16 => 0b01,
            RsSignal::Imm8 => 0b10,
            RsSignal::Imm4 => 0b11,
        }
    }
}

/// How the instruction uses the flags register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagsMode {
    Unused,
    Read,
    Write,
    ReadWrite,
}

impl FlagsMode {
    pub fn bits(self) -> u8 {
        match self {
            FlagsMode::ReadWrite => 0b00,
            FlagsMode::Write => 0b01,
            FlagsMode::Read => 0b10,
            FlagsMode::Unused => 0b11,
        }
    }
}

/// Program-counter behavior. Combinational: a pure function of the current
/// word, with no cross-cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcMode {
    Step,
    RelJump,
    AbsJump,
    /// Unrecognized bit pattern; the table is total, so illegal words decode
    /// to this mode instead of failing.
    Reserved,
}

impl PcMode {
    pub fn bits(self) -> u8 {
        match self {
            PcMode::Step => 0b00,
            PcMode::RelJump => 0b01,
            PcMode::AbsJump => 0b10,
            PcMode::Reserved => 0b11,
        }
    }
}

/// Functional unit selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fu {
    Move,
    Alu,
}

impl Fu {
    pub fn bits(self) -> u8 {
        match self {
            Fu::Move => 0b00,
            Fu::Alu => 0b01,
        }
    }
}

/// ALU operation selectors as wired into the functional unit. `Cmv` is a
/// base value; the condition code is or-ed into its low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AluOp {
    Add = 0b00000,
    Addc = 0b00001,
    Sub = 0b00010,
    Subc = 0b00011,
    Not = 0b00100,
    Neg = 0b00101,
    Shll = 0b00110,
    Shlc = 0b00111,
    Shrl = 0b01000,
    Shrc = 0b01001,
    Shra = 0b01010,
    Fswap = 0b01100,
    And = 0b01101,
    Or = 0b01110,
    Xor = 0b01111,
    Cmv = 0b10000,
}

/// Control signals recovered from one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlWord {
    pub rd: RdMode,
    pub rs: RsSignal,
    pub flags: FlagsMode,
    pub pc: PcMode,
    pub fu: Fu,
    pub fuop: u8,
}

impl Default for ControlWord {
    fn default() -> Self {
        Self {
            rd: RdMode::Unused,
            rs: RsSignal::Imm4,
            flags: FlagsMode::Unused,
            pc: PcMode::Step,
            fu: Fu::Move,
            fuop: 0,
        }
    }
}

impl ControlWord {
    /// Pack into the two parallel ROM bytes: the coarse mode bits and the
    /// functional-unit operation bits.
    pub fn rom_bytes(&self) -> (u8, u8) {
        let rom0 =
            self.rd.bits() | self.rs.bits() << 2 | self.flags.bits() << 4 | self.pc.bits() << 6;
        let rom1 = (self.fuop & 0x3F) | self.fu.bits() << 6;
        (rom0, rom1)
    }
}

fn field(word: u16, offset: u16, length: u16) -> u16 {
    (word >> offset) & ((1 << length) - 1)
}

fn alu_unary(op: AluOp, flags: FlagsMode, rd: RdMode) -> ControlWord {
    ControlWord {
        rd,
        flags,
        fu: Fu::Alu,
        fuop: op as u8,
        ..Default::default()
    }
}

fn alu_binary(fuop: u8, flags: FlagsMode, rd: RdMode, rs: RsSignal) -> ControlWord {
    ControlWord {
        rd,
        rs,
        flags,
        fu: Fu::Alu,
        fuop,
        ..Default::default()
    }
}

/// Decode one instruction word into control signals. Total over all 65536
/// inputs; words this hardware generation does not implement come back with
/// `PcMode::Reserved`.
pub fn decode(word: u16) -> ControlWord {
    use FlagsMode::{Read, ReadWrite as FlagsRw, Write};
    use RdMode::ReadWrite as RdRw;

    let func0 = field(word, 0, 4);
    let func1 = field(word, 12, 4);
    let func2 = field(word, 4, 4);
    let func3 = field(word, 8, 4);

    // Basic moves and jumps (func0 = 0)
    if func0 == 0 {
        if word == 0 {
            // nop
            return ControlWord::default();
        }
        if func1 == 1 {
            // mv
            return ControlWord {
                rd: RdMode::Write,
                rs: RsSignal::Reg8,
                fu: Fu::Move,
                ..Default::default()
            };
        }
        if func1 == 2 && func2 == 0 {
            // jro
            return ControlWord {
                rs: RsSignal::Reg8,
                pc: PcMode::RelJump,
                ..Default::default()
            };
        }
        if func1 == 3 && func2 == 0 {
            // jr
            return ControlWord {
                rs: RsSignal::Pair16,
                pc: PcMode::AbsJump,
                ..Default::default()
            };
        }
    }

    // ALU instructions (func0 = 1)
    if func0 == 1 {
        // Unary ops, selected by func3
        if func1 == 0 {
            match func3 {
                0 => return alu_unary(AluOp::Not, Write, RdRw),
                1 => return alu_unary(AluOp::Neg, Write, RdRw),
                2 => return alu_unary(AluOp::Shll, Write, RdRw),
                3 => return alu_unary(AluOp::Shlc, FlagsRw, RdRw),
                4 => return alu_unary(AluOp::Shrl, Write, RdRw),
                5 => return alu_unary(AluOp::Shrc, FlagsRw, RdRw),
                6 => return alu_unary(AluOp::Shra, Write, RdRw),
                7 => return alu_unary(AluOp::Fswap, FlagsRw, RdRw),
                8 => return alu_unary(AluOp::Fswap, Read, RdMode::Write),
                9 => return alu_unary(AluOp::Fswap, Write, RdMode::Read),
                _ => {}
            }
        }
        // Binary ops, selected by func1
        match func1 {
            1 => return alu_binary(AluOp::Add as u8, Write, RdRw, RsSignal::Reg8),
            2 => return alu_binary(AluOp::Addc as u8, FlagsRw, RdRw, RsSignal::Reg8),
            3 => return alu_binary(AluOp::Sub as u8, Write, RdRw, RsSignal::Reg8),
            4 => return alu_binary(AluOp::Subc as u8, FlagsRw, RdRw, RsSignal::Reg8),
            5 => return alu_binary(AluOp::And as u8, Write, RdRw, RsSignal::Reg8),
            6 => return alu_binary(AluOp::Or as u8, Write, RdRw, RsSignal::Reg8),
            7 => return alu_binary(AluOp::Xor as u8, Write, RdRw, RsSignal::Reg8),
            // cmp
            8 => return alu_binary(AluOp::Sub as u8, Write, RdMode::Read, RsSignal::Reg8),
            // test
            9 => return alu_binary(AluOp::And as u8, Write, RdMode::Read, RsSignal::Reg8),
            // addci
            10 => return alu_binary(AluOp::Addc as u8, FlagsRw, RdRw, RsSignal::Imm4),
            // xori
            11 => return alu_binary(AluOp::Xor as u8, Write, RdRw, RsSignal::Imm4),
            // cmpi
            12 => return alu_binary(AluOp::Sub as u8, Write, RdMode::Read, RsSignal::Imm4),
            _ => {}
        }
    }

    // Conditional moves: the condition rides in the functional-unit op
    if func0 == 2 {
        // cmv, condition in bits 12..16
        let cond = func1 as u8;
        return alu_binary(AluOp::Cmv as u8 | cond, Read, RdRw, RsSignal::Reg8);
    }
    if func0 == 3 {
        // cldi
        let cond = func1 as u8;
        return alu_binary(AluOp::Cmv as u8 | cond, Read, RdRw, RsSignal::Imm4);
    }

    // 8-bit immediate forms (func0 = 8..16)
    if func0 == 8 {
        // ldi
        return ControlWord {
            rd: RdMode::Write,
            rs: RsSignal::Imm8,
            fu: Fu::Move,
            ..Default::default()
        };
    }
    if func0 == 9 && func2 == 0 {
        // j
        return ControlWord {
            rs: RsSignal::Imm8,
            pc: PcMode::RelJump,
            ..Default::default()
        };
    }
    if func0 == 12 {
        // addi
        return alu_binary(AluOp::Add as u8, Write, RdRw, RsSignal::Imm8);
    }
    if func0 == 13 {
        // andi
        return alu_binary(AluOp::And as u8, Write, RdRw, RsSignal::Imm8);
    }
    if func0 == 14 {
        // ori
        return alu_binary(AluOp::Or as u8, Write, RdRw, RsSignal::Imm8);
    }
    if func0 == 15 {
        // testi
        return alu_binary(AluOp::And as u8, Write, RdMode::Read, RsSignal::Imm8);
    }

    // Unknown instruction. The table must stay total, so flag the word via
    // the reserved PC mode rather than failing.
    ControlWord {
        pc: PcMode::Reserved,
        ..Default::default()
    }
}

/// Run the decoder over every possible word, producing the two 64 KiB ROM
/// images addressable directly by the raw instruction word.
pub fn build_rom_images() -> (Vec<u8>, Vec<u8>) {
    let mut rom0 = vec![0u8; 1 << 16];
    let mut rom1 = vec![0u8; 1 << 16];
    for word in 0..=u16::MAX {
        let (b0, b1) = decode(word).rom_bytes();
        rom0[usize::from(word)] = b0;
        rom1[usize::from(word)] = b1;
    }
    tracing::debug!("decode table built");
    (rom0, rom1)
}

/// Write a ROM image unless the on-disk contents are already byte-identical.
/// Returns whether a write happened.
pub fn write_rom_if_changed(path: &Path, data: &[u8]) -> io::Result<bool> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == data {
            return Ok(false);
        }
    }
    std::fs::write(path, data)?;
    Ok(true)
}
