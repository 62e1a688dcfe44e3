use crate::ast::{Instruction, Offset, Operand, Program};
use crate::error::{AsmError, ErrorKind};
use crate::isa::{self, CondMode, Condition, PairOrder, RdMode, RsMode, PAIR_ORDER};

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Converts assembly text into `Instruction`s appended to a program.
///
/// The parser exclusively owns the source cursor: `rest` is the yet-unparsed
/// tail of `input`, and error positions are derived from how much has been
/// consumed.
pub struct Parser<'a> {
    file: &'a str,
    input: &'a str,
    rest: &'a str,
}

/// Parse one source file into `program`.
pub fn parse_source(file: &str, text: &str, program: &mut Program) -> Result<(), AsmError> {
    Parser::new(file, text).parse_into(program)
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str, input: &'a str) -> Self {
        Self {
            file,
            input,
            rest: input,
        }
    }

    pub fn parse_into(&mut self, program: &mut Program) -> Result<(), AsmError> {
        self.skip();
        while !self.rest.is_empty() {
            let inst = self.parse_instruction()?;
            program.push(inst);
        }
        Ok(())
    }

    /// Build a syntax error pointing at the current cursor position.
    fn err(&self, message: impl Into<String>) -> AsmError {
        let consumed = &self.input[..self.input.len() - self.rest.len()];
        let line = consumed.matches('\n').count() + 1;
        let line_start = consumed.rfind('\n').map_or(0, |i| i + 1);
        let before = &consumed[line_start..];
        let column = before.chars().count();
        let after = self.rest.split('\n').next().unwrap_or("");
        let context = format!(
            "{}:{}:{}\n\n  {}{}\n  {}^",
            self.file,
            line,
            column + 1,
            before,
            after,
            " ".repeat(column),
        );
        AsmError::with_context(ErrorKind::Syntax(message.into()), context)
    }

    /// Skip whitespace, `#`/`//` line comments and `/*...*/` block comments.
    fn skip(&mut self) {
        loop {
            let trimmed = self.rest.trim_start();
            if trimmed.len() != self.rest.len() {
                self.rest = trimmed;
                continue;
            }
            if self.rest.starts_with('#') || self.rest.starts_with("//") {
                match self.rest.find('\n') {
                    Some(i) => self.rest = &self.rest[i + 1..],
                    None => self.rest = "",
                }
                continue;
            }
            if let Some(body) = self.rest.strip_prefix("/*") {
                if let Some(end) = body.find("*/") {
                    self.rest = &body[end + 2..];
                    continue;
                }
            }
            break;
        }
    }

    /// Consume `n` bytes plus any following insignificant input.
    fn advance(&mut self, n: usize) {
        self.rest = &self.rest[n..];
        self.skip();
    }

    /// The identifier (`[0-9a-zA-Z_]+`) at the cursor, possibly empty.
    fn peek_ident(&self) -> &'a str {
        let end = self
            .rest
            .find(|c| !is_ident_char(c))
            .unwrap_or(self.rest.len());
        &self.rest[..end]
    }

    /// Consume `keyword` if it appears at the cursor with a word boundary.
    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if let Some(after) = self.rest.strip_prefix(keyword) {
            if after.chars().next().map_or(true, |c| !is_ident_char(c)) {
                self.advance(keyword.len());
                return true;
            }
        }
        false
    }

    fn expect_char(&mut self, c: char, message: &str) -> Result<(), AsmError> {
        if self.rest.starts_with(c) {
            self.advance(c.len_utf8());
            Ok(())
        } else {
            Err(self.err(message))
        }
    }

    /// Parse one statement: a label definition, an origin directive, or an
    /// instruction whose operand shape is driven entirely by its opcode spec.
    fn parse_instruction(&mut self) -> Result<Instruction, AsmError> {
        // Label definitions: an identifier immediately followed by `:`.
        let ident = self.peek_ident();
        if !ident.is_empty() && self.rest[ident.len()..].starts_with(':') {
            let name = ident.to_string();
            self.advance(name.len() + 1);
            return Ok(Instruction::label(name));
        }

        // Origin directive.
        if self.consume_keyword(".org") {
            let value = self.parse_immediate()?;
            return Ok(Instruction::org(value));
        }

        // Real instructions.
        let Some(spec) = isa::lookup(ident) else {
            return Err(self.err("unknown instruction"));
        };
        self.advance(ident.len());

        let mut operands = Vec::new();
        if spec.cond != CondMode::Unused {
            self.expect_char('.', "expected '.'")?;
            operands.push(self.parse_condition()?);
        }
        if spec.rd != RdMode::Unused {
            operands.push(self.parse_register()?);
        }
        if spec.rs != RsMode::Unused {
            if spec.rd != RdMode::Unused {
                self.expect_char(',', "expected ','")?;
            }
            let operand = match spec.rs {
                RsMode::Reg8 => self.parse_register()?,
                RsMode::Pair16 => self.parse_register_pair()?,
                RsMode::Imm8 | RsMode::SimmImm4 => Operand::Imm(self.parse_immediate()?),
                RsMode::JumpImm8 => self.parse_offset()?,
                RsMode::Unused => unreachable!(),
            };
            operands.push(operand);
        }
        Ok(Instruction::new(spec, operands))
    }

    /// Parse a register operand like `r0`.
    fn parse_register(&mut self) -> Result<Operand, AsmError> {
        let b = self.rest.as_bytes();
        if b.len() >= 2 && b[0] == b'r' && (b'0'..=b'6').contains(&b[1]) {
            let boundary = b
                .get(2)
                .map_or(true, |&c| !is_ident_char(c as char));
            if boundary {
                let index = b[1] - b'0';
                self.advance(2);
                return Ok(Operand::Reg(index));
            }
        }
        Err(self.err("expected a register"))
    }

    /// Parse a register pair like `r1r0`.
    fn parse_register_pair(&mut self) -> Result<Operand, AsmError> {
        let b = self.rest.as_bytes();
        let shape_ok = b.len() >= 4
            && b[0] == b'r'
            && (b'0'..=b'6').contains(&b[1])
            && b[2] == b'r'
            && (b'0'..=b'6').contains(&b[3])
            && b.get(4).map_or(true, |&c| !is_ident_char(c as char));
        if !shape_ok {
            return Err(self.err("expected a 16 bit register pair"));
        }
        let first = b[1] - b'0';
        let second = b[3] - b'0';
        let low = match PAIR_ORDER {
            PairOrder::HighFirst if first == second + 1 => second,
            PairOrder::LowFirst if second == first + 1 => first,
            _ => {
                return Err(self.err(format!(
                    "registers in 16 bit register pair must be consecutive; got r{first}r{second}"
                )))
            }
        };
        self.advance(4);
        Ok(Operand::Pair(low))
    }

    /// Parse an immediate like `42`, `-3` or `0xbeef`.
    fn parse_immediate(&mut self) -> Result<i64, AsmError> {
        let mut negative = false;
        if let Some(after) = self.rest.strip_prefix(['+', '-']) {
            negative = self.rest.starts_with('-');
            self.rest = after;
        }
        let (base, base_name) = if let Some(after) = self.rest.strip_prefix("0x") {
            self.rest = after;
            (16, "base-16")
        } else if let Some(after) = self.rest.strip_prefix("0o") {
            self.rest = after;
            (8, "base-8")
        } else if let Some(after) = self.rest.strip_prefix("0b") {
            self.rest = after;
            (2, "base-2")
        } else {
            (10, "base-10")
        };

        let is_digit = |c: char| {
            c == '_'
                || match base {
                    16 => c.is_ascii_hexdigit(),
                    8 => ('0'..='7').contains(&c),
                    2 => c == '0' || c == '1',
                    _ => c.is_ascii_digit(),
                }
        };
        let end = self.rest.find(|c| !is_digit(c)).unwrap_or(self.rest.len());
        let boundary = self.rest[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident_char(c));
        let cleaned: String = self.rest[..end].chars().filter(|&c| c != '_').collect();
        if cleaned.is_empty() || !boundary {
            return Err(self.err(format!("expected {base_name} integer")));
        }
        let value = i64::from_str_radix(&cleaned, base)
            .map_err(|_| self.err(format!("expected {base_name} integer")))?;
        self.advance(end);
        Ok(if negative { -value } else { value })
    }

    /// Parse a jump target: a signed integer displacement if the token looks
    /// numeric, otherwise a label reference.
    fn parse_offset(&mut self) -> Result<Operand, AsmError> {
        let (sign, body) = match self.rest.strip_prefix(['+', '-']) {
            Some(after) => (self.rest.chars().next(), after),
            None => (None, self.rest),
        };
        let end = body.find(|c| !is_ident_char(c)).unwrap_or(body.len());
        let token = &body[..end];
        if token.is_empty() {
            return Err(self.err("expected integer or label"));
        }
        let consumed = end + sign.map_or(0, char::len_utf8);

        if let Some((base, digits)) = classify_integer(token) {
            let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
            let value = i64::from_str_radix(&cleaned, base)
                .map_err(|_| self.err("expected integer or label"))?;
            let value = if sign == Some('-') { -value } else { value };
            self.advance(consumed);
            return Ok(Operand::Imm(value));
        }
        if let Some(sign) = sign {
            return Err(self.err(format!("expected integer after `{sign}`")));
        }
        let name = token.to_string();
        self.advance(end);
        Ok(Operand::Offset(Offset::new(name)))
    }

    /// Parse a condition code like `c` or `ugt`.
    fn parse_condition(&mut self) -> Result<Operand, AsmError> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_lowercase())
            .unwrap_or(self.rest.len());
        if let Some(cond) = Condition::from_name(&self.rest[..end]) {
            self.advance(end);
            return Ok(Operand::Cond(cond));
        }
        Err(self.err("expected condition code"))
    }
}

/// Decide whether an offset token spells an integer, returning its base and
/// digit part.
fn classify_integer(token: &str) -> Option<(u32, &str)> {
    let all = |digits: &str, pred: fn(char) -> bool| {
        !digits.is_empty()
            && digits.chars().any(|c| c != '_')
            && digits.chars().all(|c| c == '_' || pred(c))
    };
    if all(token, |c| c.is_ascii_digit()) {
        return Some((10, token));
    }
    if let Some(digits) = token.strip_prefix("0x") {
        if all(digits, |c| c.is_ascii_hexdigit()) {
            return Some((16, digits));
        }
    }
    if let Some(digits) = token.strip_prefix("0o") {
        if all(digits, |c| ('0'..='7').contains(&c)) {
            return Some((8, digits));
        }
    }
    if let Some(digits) = token.strip_prefix("0b") {
        if all(digits, |c| c == '0' || c == '1') {
            return Some((2, digits));
        }
    }
    None
}
