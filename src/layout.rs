use crate::ast::{Opcode, Operand, Program};
use crate::error::{AsmError, ErrorKind};
use crate::isa::WORD_BYTES;

/// Assigns a byte address to every instruction in a single forward pass.
///
/// The address counter starts at 0; `.org` moves it forward (never backward),
/// label definitions are zero-width, and every real instruction occupies one
/// 16-bit word.
pub fn layout_program(program: &mut Program) -> Result<(), AsmError> {
    let mut cursor: u32 = 0;
    for inst in program.iter_mut() {
        match inst.opcode {
            Opcode::Org => {
                let Some(&Operand::Imm(requested)) = inst.operands.first() else {
                    return Err(AsmError::with_instruction(
                        ErrorKind::OperandMismatch {
                            expected: "immediate",
                            got: "missing operand".to_string(),
                        },
                        inst,
                    ));
                };
                if !(0..=0xFFFF).contains(&requested) {
                    return Err(AsmError::with_instruction(ErrorKind::OrgRange(requested), inst));
                }
                if cursor > 0xFFFF {
                    return Err(AsmError::with_instruction(ErrorKind::AddressOverflow, inst));
                }
                let requested = requested as u32;
                if cursor > requested {
                    return Err(AsmError::with_instruction(
                        ErrorKind::OrgBackward {
                            requested: requested as u16,
                            current: cursor as u16,
                        },
                        inst,
                    ));
                }
                cursor = requested;
                inst.address = Some(requested as u16);
            }
            Opcode::Label => {
                inst.address = Some(address(cursor, inst)?);
            }
            Opcode::Spec(_) => {
                inst.address = Some(address(cursor, inst)?);
                cursor += u32::from(WORD_BYTES);
            }
        }
    }
    Ok(())
}

fn address(cursor: u32, inst: &crate::ast::Instruction) -> Result<u16, AsmError> {
    u16::try_from(cursor)
        .map_err(|_| AsmError::with_instruction(ErrorKind::AddressOverflow, inst))
}

/// Converts every bound offset into a signed displacement relative to the
/// referencing instruction. Must run after resolution and layout.
pub fn evaluate_program(program: &mut Program) -> Result<(), AsmError> {
    for index in 0..program.len() {
        for slot in 0..program[index].operands.len() {
            let Operand::Offset(offset) = &program[index].operands[slot] else {
                continue;
            };
            let name = offset.name.clone();
            let (Some(binding), Some(from)) = (offset.binding, program[index].address) else {
                return Err(AsmError::with_instruction(
                    ErrorKind::UnresolvedOffset(name),
                    &program[index],
                ));
            };
            let Some(target) = program.get(binding).and_then(|def| def.address) else {
                return Err(AsmError::with_instruction(
                    ErrorKind::UnresolvedOffset(name),
                    &program[index],
                ));
            };
            let disp = i64::from(target) - i64::from(from);
            if let Operand::Offset(offset) = &mut program[index].operands[slot] {
                offset.disp = Some(disp);
            }
        }
    }
    Ok(())
}
