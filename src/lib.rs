pub mod ast;
pub mod binary;
pub mod decode;
pub mod encode;
pub mod error;
pub mod isa;
pub mod layout;
pub mod parser;
pub mod printer;
pub mod resolve;

pub use ast::{Instruction, Opcode, Operand, Program};
pub use error::{AsmError, ErrorKind};

/// Run the fixed pass sequence over a parsed program: resolve labels, lay
/// out addresses, evaluate displacements, encode words.
pub fn assemble(program: &mut Program) -> Result<(), AsmError> {
    resolve::resolve_program(program)?;
    layout::layout_program(program)?;
    layout::evaluate_program(program)?;
    encode::encode_program(program)?;
    tracing::debug!(instructions = program.len(), "assembly passes complete");
    Ok(())
}
