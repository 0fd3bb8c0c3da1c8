//! PolyBoRi-like reader/writer for the ANF backend: one GF(2) equation per
//! line, `+`-separated `*`-products of `x<n>` tokens, an optional trailing
//! `+ 1` for the constant term. Comment records for named variables and the
//! metadata dictionary share `dimacs.rs`'s `c var ...` shape.

use std::io::{BufRead, Write};

use super::{parse_literals, render_bindings, render_parameters, Parameters};
use crate::backend::anf::{Equation, Term};
use crate::encoder::Bindings;
use crate::error::{Error, Result};

fn render_term(term: &Term) -> String {
    if term.is_empty() {
        "1".to_string()
    } else {
        term.iter().map(|v| format!("x{v}")).collect::<Vec<_>>().join("*")
    }
}

fn render_equation(eq: &Equation) -> String {
    if eq.terms.is_empty() {
        "0".to_string()
    } else {
        eq.terms.iter().map(render_term).collect::<Vec<_>>().join(" + ")
    }
}

fn parse_term(text: &str) -> Result<Term> {
    let text = text.trim();
    if text == "1" {
        return Ok(Vec::new());
    }
    let mut vars: Vec<u32> = Vec::new();
    for factor in text.split('*') {
        let factor = factor.trim();
        let digits = factor
            .strip_prefix('x')
            .ok_or_else(|| Error::Parse(format!("expected a variable factor like \"x3\", got {factor:?}")))?;
        vars.push(digits.parse().map_err(|_| Error::Parse(format!("invalid variable id: {digits:?}")))?);
    }
    vars.sort_unstable();
    Ok(vars)
}

fn parse_equation(text: &str) -> Result<Equation> {
    let text = text.trim();
    if text == "0" {
        return Ok(Equation { terms: Vec::new() });
    }
    let terms = text.split('+').map(parse_term).collect::<Result<Vec<_>>>()?;
    Ok(Equation { terms })
}

pub fn write(
    out: &mut impl Write,
    equations: &[Equation],
    variable_count: u32,
    bindings: &Bindings,
    parameters: &Parameters,
) -> Result<()> {
    writeln!(out, "c anf {} {}", variable_count, equations.len())?;
    for line in render_parameters(parameters) {
        writeln!(out, "{line}")?;
    }
    for line in render_bindings(bindings) {
        writeln!(out, "{line}")?;
    }
    for eq in equations {
        writeln!(out, "{}", render_equation(eq))?;
    }
    Ok(())
}

pub struct Parsed {
    pub equations: Vec<Equation>,
    pub bindings: Bindings,
    pub parameters: Parameters,
    pub variable_count: u32,
}

pub fn read(input: &mut impl BufRead) -> Result<Parsed> {
    let mut equations = Vec::new();
    let mut bindings = Bindings::default();
    let mut parameters = Parameters::new();
    let mut variable_count = 0u32;
    let mut header_seen = false;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("c anf ") {
            let mut parts = rest.split_whitespace();
            variable_count = parts
                .next()
                .ok_or_else(|| Error::Parse("missing variable count".into()))?
                .parse()
                .map_err(|_| Error::Parse("invalid variable count".into()))?;
            header_seen = true;
            continue;
        }
        if !header_seen {
            return Err(Error::Parse("expected PolyBoRi header \"c anf V E\" first".into()));
        }
        if let Some(rest) = line.strip_prefix("c var ") {
            if let Some(rest) = rest.strip_prefix('.') {
                let (key, value) = rest
                    .split_once('=')
                    .ok_or_else(|| Error::Parse(format!("malformed parameter comment: {line:?}")))?;
                let parsed: serde_json::Value = serde_json::from_str(value.trim())
                    .map_err(|e| Error::Parse(format!("malformed parameter JSON in {line:?}: {e}")))?;
                parameters.insert(key.trim().to_string(), parsed);
            } else {
                let (name, value) = rest
                    .split_once('=')
                    .ok_or_else(|| Error::Parse(format!("malformed named-variable comment: {line:?}")))?;
                bindings.set(name.trim(), parse_literals(value.trim())?);
            }
            continue;
        }
        if line.starts_with('c') {
            continue;
        }
        equations.push(parse_equation(line)?);
    }

    Ok(Parsed { equations, bindings, parameters, variable_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_small_system() {
        let equations = vec![
            Equation { terms: vec![vec![1, 2], vec![]] }, // x1*x2 + 1
            Equation { terms: vec![vec![3]] },
        ];
        let bindings = Bindings::default();
        let parameters = Parameters::new();

        let mut buf = Vec::new();
        write(&mut buf, &equations, 4, &bindings, &parameters).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read(&mut cursor).unwrap();
        assert_eq!(parsed.equations.len(), 2);
        assert_eq!(parsed.equations[0].terms, vec![vec![1, 2], vec![]]);
        assert_eq!(parsed.variable_count, 4);
    }
}
