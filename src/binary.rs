use std::fmt::Write as _;

use crate::ast::Instruction;
use crate::error::{AsmError, ErrorKind};

/// Serialize an encoded program into a contiguous byte buffer indexed by
/// instruction address: low byte first, gaps from origin jumps zero-filled.
/// With a configured output size the buffer is zero-padded up to it, and
/// exceeding it is a hard error.
pub fn program_to_bytes(
    program: &[Instruction],
    output_size: Option<usize>,
) -> Result<Vec<u8>, AsmError> {
    let mut buffer = Vec::new();
    for inst in program {
        let (Some(encoding), Some(address)) = (inst.encoding, inst.address) else {
            continue;
        };
        let address = usize::from(address);
        if address > buffer.len() {
            buffer.resize(address, 0);
        }
        buffer.push((encoding & 0xFF) as u8);
        buffer.push((encoding >> 8) as u8);
    }
    if let Some(limit) = output_size {
        if buffer.len() > limit {
            return Err(AsmError::new(ErrorKind::OutputSize {
                size: buffer.len(),
                limit,
            }));
        }
        buffer.resize(limit, 0);
    }
    Ok(buffer)
}

/// Render a hex dump: offset column, hex byte pairs, printable-ASCII gloss.
/// Runs of all-zero rows collapse into a single `[zeros]` marker.
pub fn hexdump(binary: &[u8], bytes_per_line: usize) -> String {
    let offset_width = format!("{:x}", binary.len()).len();
    let mut out = String::new();
    let mut zeros = false;
    for (index, chunk) in binary.chunks(bytes_per_line).enumerate() {
        let offset = index * bytes_per_line;
        if chunk.iter().all(|&b| b == 0) {
            if !zeros {
                let _ = writeln!(out, "{}.  [zeros]", ".".repeat(offset_width));
            }
            zeros = true;
            continue;
        }
        zeros = false;
        let str_bytes = chunk
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        let str_chars: String = chunk
            .iter()
            .map(|&b| if (32..128).contains(&b) { b as char } else { '.' })
            .collect();
        let _ = writeln!(
            out,
            "{offset:0ow$X}:  {str_bytes:<bw$}  {str_chars}",
            ow = offset_width,
            bw = 3 * bytes_per_line - 1,
        );
    }
    let _ = writeln!(
        out,
        "{:0ow$X}:  [end of binary]",
        binary.len(),
        ow = offset_width,
    );
    out
}
