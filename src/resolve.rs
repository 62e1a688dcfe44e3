use std::collections::HashMap;

use crate::ast::{Operand, Program};
use crate::error::{AsmError, ErrorKind};

/// Binds every `Offset` operand to the index of its defining label directive.
///
/// Absolute labels live in a unique-name map. Labels spelled as pure digits
/// are relative labels: they may be defined any number of times, and a
/// reference like `2f`/`2b` picks the nearest definition at-or-after
/// (respectively at-or-before) the referencing instruction.
#[derive(Debug, Default)]
struct Resolver {
    labels: HashMap<String, usize>,
    relative_labels: HashMap<String, Vec<usize>>,
}

pub fn resolve_program(program: &mut Program) -> Result<(), AsmError> {
    let mut resolver = Resolver::default();

    // Register every label definition first; references may point forward.
    for (index, inst) in program.iter().enumerate() {
        let Some(name) = inst.label_name() else {
            continue;
        };
        if name.bytes().all(|b| b.is_ascii_digit()) {
            resolver
                .relative_labels
                .entry(name.to_string())
                .or_default()
                .push(index);
        } else if resolver.labels.insert(name.to_string(), index).is_some() {
            return Err(AsmError::with_instruction(
                ErrorKind::DuplicateLabel(name.to_string()),
                inst,
            ));
        }
    }

    // Bind every offset operand.
    for index in 0..program.len() {
        for slot in 0..program[index].operands.len() {
            let Operand::Offset(offset) = &program[index].operands[slot] else {
                continue;
            };
            let binding = resolver.resolve(offset.name.as_str(), index);
            let binding = match binding {
                Ok(binding) => binding,
                Err(kind) => return Err(AsmError::with_instruction(kind, &program[index])),
            };
            if let Operand::Offset(offset) = &mut program[index].operands[slot] {
                offset.binding = Some(binding);
            }
        }
    }
    Ok(())
}

impl Resolver {
    fn resolve(&self, name: &str, index: usize) -> Result<usize, ErrorKind> {
        // Relative references of the form `2f` or `1b`.
        if let Some((digits, forward)) = split_relative(name) {
            let definitions = self
                .relative_labels
                .get(digits)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let found = if forward {
                definitions.iter().copied().find(|&def| def >= index)
            } else {
                definitions.iter().rev().copied().find(|&def| def <= index)
            };
            return found.ok_or_else(|| ErrorKind::UnknownRelativeLabel {
                label: digits.to_string(),
                side: if forward { "after" } else { "before" },
            });
        }

        // Regular labels.
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| ErrorKind::UnknownLabel(name.to_string()))
    }
}

/// Split `123f`/`123b` into digits and direction; `None` for anything else.
fn split_relative(name: &str) -> Option<(&str, bool)> {
    let (digits, suffix) = name.split_at(name.len().checked_sub(1)?);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match suffix {
        "f" => Some((digits, true)),
        "b" => Some((digits, false)),
        _ => None,
    }
}
