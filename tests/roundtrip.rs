use ember16_rs::decode::{decode, AluOp, FlagsMode, Fu, PcMode, RsSignal};
use ember16_rs::isa::{self, CondMode, OpcodeSpec, RdMode, RsMode};
use ember16_rs::parser::parse_source;
use ember16_rs::printer::print_program_bare;
use ember16_rs::{assemble, Program};
use pretty_assertions::assert_eq;

fn build(text: &str) -> Program {
    let mut program = Program::new();
    parse_source("test.s", text, &mut program).unwrap();
    assemble(&mut program).unwrap();
    program
}

fn encoding_of(text: &str) -> u16 {
    build(text).last().unwrap().encoding.unwrap()
}

#[test]
fn decode_recovers_the_encoded_control_signals() {
    use FlagsMode as F;
    use PcMode as P;
    use RdMode as D;
    use RsSignal as S;

    let cmv = AluOp::Cmv as u8;
    #[rustfmt::skip]
    let cases: &[(&str, D, S, F, P, Fu, u8)] = &[
        ("nop",             D::Unused,    S::Imm4,   F::Unused,    P::Step,    Fu::Move, 0),
        ("mv r0, r1",       D::Write,     S::Reg8,   F::Unused,    P::Step,    Fu::Move, 0),
        ("jro r2",          D::Unused,    S::Reg8,   F::Unused,    P::RelJump, Fu::Move, 0),
        ("jr r1r0",         D::Unused,    S::Pair16, F::Unused,    P::AbsJump, Fu::Move, 0),
        ("ldi r0, 5",       D::Write,     S::Imm8,   F::Unused,    P::Step,    Fu::Move, 0),
        ("j +2",            D::Unused,    S::Imm8,   F::Unused,    P::RelJump, Fu::Move, 0),
        ("halt",            D::Unused,    S::Imm8,   F::Unused,    P::RelJump, Fu::Move, 0),
        ("not r0",          D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Not as u8),
        ("neg r0",          D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Neg as u8),
        ("shll r0",         D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Shll as u8),
        ("shlc r0",         D::ReadWrite, S::Imm4,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Shlc as u8),
        ("shrl r0",         D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Shrl as u8),
        ("shrc r0",         D::ReadWrite, S::Imm4,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Shrc as u8),
        ("shra r0",         D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Shra as u8),
        ("fswap r0",        D::ReadWrite, S::Imm4,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Fswap as u8),
        ("fr r0",           D::Write,     S::Imm4,   F::Read,      P::Step,    Fu::Alu,  AluOp::Fswap as u8),
        ("fw r0",           D::Read,      S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Fswap as u8),
        ("add r0, r1",      D::ReadWrite, S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Add as u8),
        ("addc r0, r1",     D::ReadWrite, S::Reg8,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Addc as u8),
        ("sub r0, r1",      D::ReadWrite, S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Sub as u8),
        ("subc r0, r1",     D::ReadWrite, S::Reg8,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Subc as u8),
        ("and r0, r1",      D::ReadWrite, S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::And as u8),
        ("or r0, r1",       D::ReadWrite, S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Or as u8),
        ("xor r0, r1",      D::ReadWrite, S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Xor as u8),
        ("cmp r0, r1",      D::Read,      S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Sub as u8),
        ("test r0, r1",     D::Read,      S::Reg8,   F::Write,     P::Step,    Fu::Alu,  AluOp::And as u8),
        ("addci r0, 1",     D::ReadWrite, S::Imm4,   F::ReadWrite, P::Step,    Fu::Alu,  AluOp::Addc as u8),
        ("xori r0, -1",     D::ReadWrite, S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Xor as u8),
        ("cmpi r0, 3",      D::Read,      S::Imm4,   F::Write,     P::Step,    Fu::Alu,  AluOp::Sub as u8),
        ("addi r0, 200",    D::ReadWrite, S::Imm8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Add as u8),
        ("andi r0, 15",     D::ReadWrite, S::Imm8,   F::Write,     P::Step,    Fu::Alu,  AluOp::And as u8),
        ("ori r0, 1",       D::ReadWrite, S::Imm8,   F::Write,     P::Step,    Fu::Alu,  AluOp::Or as u8),
        ("testi r0, 7",     D::Read,      S::Imm8,   F::Write,     P::Step,    Fu::Alu,  AluOp::And as u8),
        ("cmv.eq r0, r1",   D::ReadWrite, S::Reg8,   F::Read,      P::Step,    Fu::Alu,  cmv | 0b0100),
        ("cldi.sgt r0, -1", D::ReadWrite, S::Imm4,   F::Read,      P::Step,    Fu::Alu,  cmv | 0b1111),
    ];

    for &(text, rd, rs, flags, pc, fu, fuop) in cases {
        let word = encoding_of(text);
        let cw = decode(word);
        assert_eq!(cw.rd, rd, "{text} ({word:#06X})");
        assert_eq!(cw.rs, rs, "{text} ({word:#06X})");
        assert_eq!(cw.flags, flags, "{text} ({word:#06X})");
        assert_eq!(cw.pc, pc, "{text} ({word:#06X})");
        assert_eq!(cw.fu, fu, "{text} ({word:#06X})");
        assert_eq!(cw.fuop, fuop, "{text} ({word:#06X})");
    }
}

#[test]
fn this_rom_generation_reserves_conditional_branches_and_lcd() {
    for text in ["b.eq +0", "br.c r1r0", "bro.nz r0", "lcdcw r0", "lcddr r6"] {
        let word = encoding_of(text);
        assert_eq!(decode(word).pc, PcMode::Reserved, "{text} ({word:#06X})");
    }
}

/// Can `spec` produce `word` for some choice of operand values? Field value
/// ranges matter: register fields carry 1..=7, pair fields 1..=6, condition
/// fields 2..=15, immediates anything.
fn spec_matches(spec: &OpcodeSpec, word: u16) -> bool {
    let nib = |offset: u16| (word >> offset) & 0xF;
    if nib(0) != u16::from(spec.func0) {
        return false;
    }
    let dest_ok = if spec.cond == CondMode::DestField {
        (2..=15).contains(&nib(4))
    } else if spec.rd != RdMode::Unused {
        (1..=7).contains(&nib(4))
    } else {
        spec.func2.map(u16::from) == Some(nib(4))
    };
    if !dest_ok {
        return false;
    }
    let src_ok = match spec.rs {
        RsMode::Reg8 => (1..=7).contains(&nib(8)),
        RsMode::Pair16 => (1..=6).contains(&nib(8)),
        RsMode::Imm8 | RsMode::JumpImm8 | RsMode::SimmImm4 => true,
        RsMode::Unused => spec.func3.map(u16::from) == Some(nib(8)),
    };
    if !src_ok {
        return false;
    }
    if matches!(spec.rs, RsMode::Imm8 | RsMode::JumpImm8) {
        true
    } else if spec.cond == CondMode::TopField {
        (2..=15).contains(&nib(12))
    } else {
        spec.func1.map(u16::from) == Some(nib(12))
    }
}

#[test]
fn no_two_specs_claim_the_same_word() {
    for word in 0..=u16::MAX {
        let matches: Vec<&str> = isa::TABLE
            .iter()
            .filter(|spec| spec_matches(spec, word))
            .map(|spec| spec.mnemonic)
            .collect();
        if word == 0x0009 {
            // The one documented overlap: halt is spelled as `j +0`.
            assert_eq!(matches, vec!["j", "halt"], "{word:#06X}");
        } else {
            assert!(matches.len() <= 1, "{word:#06X}: {matches:?}");
        }
    }
}

#[test]
fn printed_programs_reassemble_to_identical_words() {
    let source = "\
.org 0x10
start:
  ldi r0, 5
  addi r0, -1
1:
  cmv.ne r1, r0
  b.nz 1b
  j start
  j +4
  jr r1r0
  br.ult r3r2
  bro.c r4
  lcdcw r0
  halt
";
    let program = build(source);
    let rendered = print_program_bare(&program);
    let reparsed = build(&rendered);

    let original: Vec<Option<u16>> = program.iter().map(|i| i.encoding).collect();
    let roundtrip: Vec<Option<u16>> = reparsed.iter().map(|i| i.encoding).collect();
    assert_eq!(original, roundtrip, "rendered:\n{rendered}");
}
