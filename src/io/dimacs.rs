//! DIMACS CNF reader/writer, extended with `c var` comment records for
//! named-variable bindings and the metadata parameter dictionary.

use std::io::{BufRead, Write};

use super::{parse_literals, render_bindings, render_parameters, Parameters};
use crate::encoder::Bindings;
use crate::error::{Error, Result};
use crate::literal::Literal;
use crate::store::ClauseStore;

fn literal_to_dimacs(l: Literal) -> i64 {
    debug_assert!(l.is_variable(), "DIMACS cannot represent constants or unassigned literals directly");
    let n = l.variable() as i64 + 1;
    if l.is_direct() { n } else { -n }
}

fn dimacs_to_literal(n: i64) -> Literal {
    if n >= 0 {
        Literal::var(n as u32 - 1)
    } else {
        Literal::var((-n) as u32 - 1).negate()
    }
}

/// Writes `store`'s live clauses, `bindings`, and `parameters` as a DIMACS
/// file: header, parameter comments, named-variable comments, then clauses.
pub fn write(
    out: &mut impl Write,
    store: &ClauseStore,
    bindings: &Bindings,
    parameters: &Parameters,
) -> Result<()> {
    writeln!(out, "p cnf {} {}", store.variable_count(), store.live_clause_count())?;
    for line in render_parameters(parameters) {
        writeln!(out, "{line}")?;
    }
    for line in render_bindings(bindings) {
        writeln!(out, "{line}")?;
    }
    for clause in store.live_clauses() {
        let ints: Vec<String> = clause.iter().map(|&l| literal_to_dimacs(l).to_string()).collect();
        writeln!(out, "{} 0", ints.join(" "))?;
    }
    Ok(())
}

/// Parsed result of reading a DIMACS file back in.
pub struct Parsed {
    pub store: ClauseStore,
    pub bindings: Bindings,
    pub parameters: Parameters,
    pub variable_count: u32,
    pub clause_count: u32,
}

pub fn read(input: &mut impl BufRead) -> Result<Parsed> {
    let mut store = ClauseStore::new();
    let mut bindings = Bindings::default();
    let mut parameters = Parameters::new();
    let mut variable_count = 0u32;
    let mut clause_count = 0u32;
    let mut header_seen = false;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("p cnf ") {
            let mut parts = rest.split_whitespace();
            variable_count = parts
                .next()
                .ok_or_else(|| Error::Parse("missing variable count".into()))?
                .parse()
                .map_err(|_| Error::Parse("invalid variable count".into()))?;
            clause_count = parts
                .next()
                .ok_or_else(|| Error::Parse("missing clause count".into()))?
                .parse()
                .map_err(|_| Error::Parse("invalid clause count".into()))?;
            if variable_count > 0 {
                store.ensure_variable(variable_count - 1);
            }
            header_seen = true;
            continue;
        }
        if !header_seen {
            return Err(Error::Parse("expected DIMACS header \"p cnf V C\" first".into()));
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
            continue; // unrecognized comment, ignored
        }
        let mut literals = Vec::new();
        for token in line.split_whitespace() {
            let n: i64 = token
                .parse()
                .map_err(|_| Error::Parse(format!("invalid literal token: {token:?}")))?;
            if n == 0 {
                break;
            }
            literals.push(dimacs_to_literal(n));
        }
        store.add_clause(&literals)?;
    }

    Ok(Parsed { store, bindings, parameters, variable_count, clause_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_small_formula() {
        let mut store = ClauseStore::new();
        store.add_clause(&[Literal::var(0), Literal::var(1)]).unwrap();
        store.add_clause(&[Literal::var(0).negate(), Literal::var(2)]).unwrap();
        let mut bindings = Bindings::default();
        bindings.set("M", vec![Literal::var(0), Literal::var(1), Literal::var(2)]);
        let parameters = Parameters::new();

        let mut buf = Vec::new();
        write(&mut buf, &store, &bindings, &parameters).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read(&mut cursor).unwrap();
        assert_eq!(parsed.bindings.vars["M"], vec![Literal::var(0), Literal::var(1), Literal::var(2)]);
        assert_eq!(parsed.store.live_clause_count(), store.live_clause_count());
    }

    #[test]
    fn rejects_missing_header() {
        let mut cursor = Cursor::new(b"1 2 0\n".to_vec());
        assert!(read(&mut cursor).is_err());
    }
}
