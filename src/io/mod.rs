//! Textual file formats: DIMACS for the CNF backend, a PolyBoRi-like format
//! for the ANF backend. Both share the same comment-record shape for named
//! variables and the metadata parameter dictionary.

pub mod dimacs;
pub mod polybori;

use crate::encoder::Bindings;
use crate::error::{Error, Result};
use crate::grammar::{self, Value};
use crate::literal::Literal;

/// `serde_json`-backed metadata dictionary, written as `c var .key = {...}`
/// comment lines and read back the same way.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Renders a bit sequence (most-significant first) using the compact
/// grammar: runs of constants collapse into one hex/binary token, runs of
/// strictly-consecutive same-signed variable references collapse into a
/// `first/count` token; anything left over is written element by element.
/// Not guaranteed to be the most compact possible rendering — just a
/// correct, round-trippable one.
pub fn render_literals(literals: &[Literal]) -> String {
    if literals.is_empty() {
        return "{}".to_string();
    }
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < literals.len() {
        if literals[i].is_constant() || literals[i].is_unassigned() {
            let start = i;
            while i < literals.len() && (literals[i].is_constant() || literals[i].is_unassigned()) {
                i += 1;
            }
            tokens.push(render_constant_run(&literals[start..i]));
        } else {
            let start = i;
            let sign = literals[i].is_direct();
            let mut run_len = 1;
            while i + run_len < literals.len() {
                let next = literals[i + run_len];
                if !next.is_variable() || next.is_direct() != sign {
                    break;
                }
                if next.variable() != literals[i + run_len - 1].variable() + 1 {
                    break;
                }
                run_len += 1;
            }
            i += run_len;
            tokens.push(render_variable_run(&literals[start..start + run_len], sign));
        }
    }
    if tokens.len() == 1 && !tokens[0].starts_with('{') {
        tokens.into_iter().next().unwrap()
    } else {
        format!("{{{}}}", tokens.join(", "))
    }
}

fn render_constant_run(run: &[Literal]) -> String {
    if run.iter().any(|l| l.is_unassigned()) {
        return format!("{{{}}}", run.iter().map(render_single).collect::<Vec<_>>().join(", "));
    }
    if run.len() % 4 == 0 {
        let mut s = String::from("0x");
        for chunk in run.chunks(4) {
            let mut nibble = 0u32;
            for &l in chunk {
                nibble = (nibble << 1) | l.value() as u32;
            }
            s.push(std::char::from_digit(nibble, 16).unwrap());
        }
        s
    } else {
        let mut s = String::from("0b");
        for &l in run {
            s.push(if l.value() { '1' } else { '0' });
        }
        s
    }
}

fn render_variable_run(run: &[Literal], sign: bool) -> String {
    let base = run[0].variable();
    let prefix = if sign { "" } else { "-" };
    if run.len() == 1 {
        format!("{prefix}{base}")
    } else {
        format!("{prefix}{base}/{}", run.len())
    }
}

fn render_single(l: &Literal) -> String {
    if l.is_unassigned() {
        "*".to_string()
    } else if l.is_constant() {
        if l.value() { "0b1".to_string() } else { "0b0".to_string() }
    } else if l.is_direct() {
        l.variable().to_string()
    } else {
        format!("-{}", l.variable())
    }
}

/// Parses a named-variable comment's right-hand side back into literals,
/// rejecting the `random:`/`compute`/`string:` alternatives (those only
/// make sense on the CLI's input side, not in a round-tripped file).
pub fn parse_literals(text: &str) -> Result<Vec<Literal>> {
    match grammar::parse(text)? {
        Value::Literals(lits) => Ok(lits),
        other => Err(Error::Parse(format!("named-variable record cannot use {other:?}"))),
    }
}

/// Renders every named-variable binding as `c var name = ...` lines, in
/// name order for determinism.
pub fn render_bindings(bindings: &Bindings) -> Vec<String> {
    let mut names: Vec<&String> = bindings.vars.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("c var {name} = {}", render_literals(&bindings.vars[name])))
        .collect()
}

/// Renders the metadata dictionary as `c var .key = {json}` lines, one per
/// top-level key, in key order.
pub fn render_parameters(parameters: &Parameters) -> Vec<String> {
    let mut keys: Vec<&String> = parameters.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| format!("c var .{key} = {}", parameters[key]))
        .collect()
}
