//! The compact variable-value grammar accepted by `-v name value` on every
//! CLI subcommand, and used to render named-variable bindings back out into
//! DIMACS/PolyBoRi comment records.
//!
//! ```text
//! value      := "random:" uint | "compute" | "string:" text | element_seq
//! element_seq:= "{" element ("," element)* "}" | element
//! element    := hex | bin | var_ref | "*" | "{" element ("," element)* "}"
//! hex        := "0x" hexdigit+             (4 bits per digit, MSB first)
//! bin        := "0b" ('0'|'1')+
//! var_ref    := ["-"] digit+ ("/" count ("/" step)?)?
//! ```
//! A `var_ref` suffix replicates: `5/3` means variables `5, 6, 7`; `5/3/2`
//! means `5, 7, 9`. Bits are produced most-significant first, matching the
//! big-endian word convention the rest of the crate uses.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::literal::Literal;

/// A parsed `-v name value` right-hand side before it's bound to a specific
/// bit width.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit sequence of literals, most-significant bit first.
    Literals(Vec<Literal>),
    /// `random:N` — caller should draw `N` fresh random bits.
    Random(usize),
    /// `compute` — caller should derive the value via the concrete backend.
    Compute,
    /// `string:...` — the remainder of the value is ASCII text; each byte
    /// expands to eight bits, most-significant first.
    StringText(String),
}

pub fn parse(input: &str) -> Result<Value> {
    if let Some(rest) = input.strip_prefix("random:") {
        let n: usize = rest
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid random bit count: {rest:?}")))?;
        return Ok(Value::Random(n));
    }
    if input.trim() == "compute" {
        return Ok(Value::Compute);
    }
    if let Some(rest) = input.strip_prefix("string:") {
        return Ok(Value::StringText(rest.to_string()));
    }
    let mut p = Parser { bytes: input.as_bytes(), pos: 0 };
    let literals = p.parse_sequence()?;
    p.skip_space();
    if p.pos != p.bytes.len() {
        return Err(Error::Parse(format!("trailing input at byte {} in {input:?}", p.pos)));
    }
    Ok(Value::Literals(literals))
}

/// Expands a [`Value`] into exactly `width` literals, drawing random bits
/// from `rand_source` when the value is `random:N` and `width == N`.
pub fn resolve(value: &Value, width: usize, rand_source: &mut impl rand::Rng) -> Result<Vec<Literal>> {
    match value {
        Value::Literals(lits) => {
            if lits.len() != width {
                return Err(Error::Parse(format!(
                    "value supplies {} bits, expected {}",
                    lits.len(),
                    width
                )));
            }
            Ok(lits.clone())
        }
        Value::Random(n) => {
            if *n != width {
                return Err(Error::Parse(format!("random:{n} does not match expected width {width}")));
            }
            Ok((0..width).map(|_| Literal::constant(rand_source.gen())).collect())
        }
        Value::Compute => Err(Error::Parse("\"compute\" is only valid for the H binding".into())),
        Value::StringText(text) => {
            let bits: Vec<Literal> = text
                .bytes()
                .flat_map(|byte| (0..8).rev().map(move |i| Literal::constant((byte >> i) & 1 == 1)))
                .collect();
            if bits.len() != width {
                return Err(Error::Parse(format!(
                    "string value is {} bits, expected {}",
                    bits.len(),
                    width
                )));
            }
            Ok(bits)
        }
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_space(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: u8) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::Parse(format!("expected '{}' at byte {}", c as char, self.pos)))
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap()
    }

    /// Parses either a braced comma-separated list or a single bare element.
    fn parse_sequence(&mut self) -> Result<Vec<Literal>> {
        self.skip_space();
        if self.peek() == Some(b'{') {
            self.pos += 1;
            let mut out = Vec::new();
            loop {
                self.skip_space();
                out.extend(self.parse_element()?);
                self.skip_space();
                if self.peek() == Some(b',') {
                    self.pos += 1;
                    continue;
                }
                break;
            }
            self.skip_space();
            self.eat(b'}')?;
            Ok(out)
        } else {
            self.parse_element()
        }
    }

    fn parse_element(&mut self) -> Result<Vec<Literal>> {
        self.skip_space();
        match self.peek() {
            Some(b'{') => self.parse_sequence(),
            Some(b'*') => {
                self.pos += 1;
                Ok(vec![Literal::UNASSIGNED])
            }
            Some(b'0') if self.bytes.get(self.pos + 1) == Some(&b'x') => self.parse_hex(),
            Some(b'0') if self.bytes.get(self.pos + 1) == Some(&b'b') => self.parse_bin(),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_var_ref(),
            other => Err(Error::Parse(format!(
                "unexpected {:?} at byte {}",
                other.map(|c| c as char),
                self.pos
            ))),
        }
    }

    fn parse_hex(&mut self) -> Result<Vec<Literal>> {
        self.pos += 2; // "0x"
        let digits = self.take_while(|c| c.is_ascii_hexdigit());
        if digits.is_empty() {
            return Err(Error::Parse("empty hex literal".into()));
        }
        let mut out = Vec::with_capacity(digits.len() * 4);
        for ch in digits.chars() {
            let nibble = ch.to_digit(16).unwrap();
            for i in (0..4).rev() {
                out.push(Literal::constant((nibble >> i) & 1 == 1));
            }
        }
        Ok(out)
    }

    fn parse_bin(&mut self) -> Result<Vec<Literal>> {
        self.pos += 2; // "0b"
        let digits = self.take_while(|c| c == b'0' || c == b'1');
        if digits.is_empty() {
            return Err(Error::Parse("empty binary literal".into()));
        }
        Ok(digits.chars().map(|c| Literal::constant(c == '1')).collect())
    }

    fn parse_var_ref(&mut self) -> Result<Vec<Literal>> {
        let negate = if self.peek() == Some(b'-') {
            self.pos += 1;
            true
        } else {
            false
        };
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(Error::Parse(format!("expected a variable number at byte {}", self.pos)));
        }
        let base: u32 = u32::from_str(digits).map_err(|_| Error::Parse(format!("variable id too large: {digits}")))?;

        let mut count = 1usize;
        let mut step: i64 = 1;
        if self.peek() == Some(b'/') {
            self.pos += 1;
            let count_digits = self.take_while(|c| c.is_ascii_digit());
            count = count_digits
                .parse()
                .map_err(|_| Error::Parse(format!("invalid replication count: {count_digits:?}")))?;
            if self.peek() == Some(b'/') {
                self.pos += 1;
                let neg = self.peek() == Some(b'-');
                if neg {
                    self.pos += 1;
                }
                let step_digits = self.take_while(|c| c.is_ascii_digit());
                let magnitude: i64 = step_digits
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid replication step: {step_digits:?}")))?;
                step = if neg { -magnitude } else { magnitude };
            }
        }

        let mut out = Vec::with_capacity(count);
        for k in 0..count as i64 {
            let ordinal = base as i64 + k * step;
            if ordinal < 0 {
                return Err(Error::Parse("replicated variable id went negative".into()));
            }
            let lit = Literal::var(ordinal as u32);
            out.push(if negate { lit.negate() } else { lit });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_literal_expands_msb_first() {
        let v = parse("0xA").unwrap();
        assert_eq!(v, Value::Literals(vec![
            Literal::TRUE, Literal::FALSE, Literal::TRUE, Literal::FALSE,
        ]));
    }

    #[test]
    fn binary_literal_is_one_bit_per_char() {
        let v = parse("0b101").unwrap();
        assert_eq!(v, Value::Literals(vec![Literal::TRUE, Literal::FALSE, Literal::TRUE]));
    }

    #[test]
    fn unassigned_marker_parses() {
        assert_eq!(parse("*").unwrap(), Value::Literals(vec![Literal::UNASSIGNED]));
    }

    #[test]
    fn variable_reference_with_sign() {
        assert_eq!(parse("-7").unwrap(), Value::Literals(vec![Literal::var(7).negate()]));
    }

    #[test]
    fn replication_suffix_generates_a_run() {
        let v = parse("5/3").unwrap();
        assert_eq!(
            v,
            Value::Literals(vec![Literal::var(5), Literal::var(6), Literal::var(7)])
        );
    }

    #[test]
    fn replication_with_explicit_step() {
        let v = parse("5/3/2").unwrap();
        assert_eq!(
            v,
            Value::Literals(vec![Literal::var(5), Literal::var(7), Literal::var(9)])
        );
    }

    #[test]
    fn braced_group_concatenates_elements() {
        let v = parse("{0x1, *, 9}").unwrap();
        assert_eq!(
            v,
            Value::Literals(vec![
                Literal::FALSE, Literal::FALSE, Literal::FALSE, Literal::TRUE,
                Literal::UNASSIGNED,
                Literal::var(9),
            ])
        );
    }

    #[test]
    fn random_alternative_parses_count() {
        assert_eq!(parse("random:32").unwrap(), Value::Random(32));
    }

    #[test]
    fn compute_alternative_parses() {
        assert_eq!(parse("compute").unwrap(), Value::Compute);
    }

    #[test]
    fn string_alternative_expands_bytes_msb_first() {
        let v = parse("string:A").unwrap();
        // 'A' = 0x41 = 0100_0001
        assert_eq!(
            v,
            Value::StringText("A".to_string())
        );
    }
}
