//! Synthesized clause templates for N-ary addition.
//!
//! No transcribed lookup table for the add-encoding was available to ground
//! this crate against, so each template is derived at first use by
//! exhaustively enumerating the batch's truth table and running a
//! Quine–McCluskey-style pairwise merge to drop redundant literals, then
//! cached for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// One input slot of a clause row: `Some(true)` = direct literal present,
/// `Some(false)` = negated literal present, `None` = merged away
/// ("don't care" for this prime implicant).
pub type Row = Vec<Option<bool>>;

/// A synthesized clause: input slots plus the sign the output literal must
/// carry in this clause.
pub type TemplateClause = (Row, bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddOutputBit {
    Sum,
    C1,
    C2,
}

type CacheKey = (usize, bool, AddOutputBit);

static CACHE: OnceLock<Mutex<HashMap<CacheKey, &'static [TemplateClause]>>> = OnceLock::new();

/// The minimized clause set implementing `out <-> f(inputs)` for the given
/// addition output bit, for a batch of `arity` literal inputs (2..=6) plus
/// a statically known `constant_bit`.
pub fn add_template(arity: usize, constant_bit: bool, output: AddOutputBit) -> &'static [TemplateClause] {
    let key = (arity, constant_bit, output);
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap();
    if let Some(&existing) = guard.get(&key) {
        return existing;
    }
    let rows = synthesize(arity, constant_bit, output);
    let leaked: &'static [TemplateClause] = Box::leak(rows.into_boxed_slice());
    guard.insert(key, leaked);
    leaked
}

fn truth(arity: usize, constant_bit: bool, output: AddOutputBit, inputs: &[bool]) -> bool {
    let total = constant_bit as u32 + inputs.iter().filter(|&&b| b).count() as u32;
    let _ = arity;
    match output {
        AddOutputBit::Sum => total & 1 == 1,
        AddOutputBit::C1 => (total >> 1) & 1 == 1,
        AddOutputBit::C2 => (total >> 2) & 1 == 1,
    }
}

fn synthesize(arity: usize, constant_bit: bool, output: AddOutputBit) -> Vec<TemplateClause> {
    let mut true_rows: Vec<Row> = Vec::new();
    let mut false_rows: Vec<Row> = Vec::new();
    for mask in 0u32..(1u32 << arity) {
        let inputs: Vec<bool> = (0..arity).map(|i| (mask >> i) & 1 == 1).collect();
        let row: Row = inputs.iter().map(|&b| Some(b)).collect();
        if truth(arity, constant_bit, output, &inputs) {
            true_rows.push(row);
        } else {
            false_rows.push(row);
        }
    }
    let mut clauses = Vec::new();
    for row in minimize(true_rows) {
        clauses.push((row, true));
    }
    for row in minimize(false_rows) {
        clauses.push((row, false));
    }
    clauses
}

/// Iteratively merges rows differing in exactly one slot (one `Some(true)`,
/// one `Some(false)`, identical elsewhere) into a single row with that slot
/// set to `None`, until no further merge applies. Produces prime
/// implicants; does not run Petrick's method for an absolutely minimal
/// cover, which is unnecessary for correctness.
fn minimize(mut rows: Vec<Row>) -> Vec<Row> {
    loop {
        let mut merged_any = false;
        let mut used = vec![false; rows.len()];
        let mut next: Vec<Row> = Vec::new();
        for i in 0..rows.len() {
            if used[i] {
                continue;
            }
            let mut merged_this = false;
            for j in (i + 1)..rows.len() {
                if used[j] {
                    continue;
                }
                if let Some(merged) = try_merge(&rows[i], &rows[j]) {
                    next.push(merged);
                    used[i] = true;
                    used[j] = true;
                    merged_any = true;
                    merged_this = true;
                    break;
                }
            }
            if !merged_this && !used[i] {
                next.push(rows[i].clone());
                used[i] = true;
            }
        }
        dedup(&mut next);
        rows = next;
        if !merged_any {
            return rows;
        }
    }
}

fn try_merge(a: &Row, b: &Row) -> Option<Row> {
    let mut diff_at = None;
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        match (x, y) {
            (None, None) => {}
            (Some(xv), Some(yv)) if xv == yv => {}
            (Some(_), Some(_)) => {
                if diff_at.is_some() {
                    return None;
                }
                diff_at = Some(i);
            }
            _ => return None,
        }
    }
    let i = diff_at?;
    let mut merged = a.clone();
    merged[i] = None;
    Some(merged)
}

fn dedup(rows: &mut Vec<Row>) {
    let mut seen: Vec<Row> = Vec::new();
    rows.retain(|r| {
        if seen.contains(r) {
            false
        } else {
            seen.push(r.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truth_of(clauses: &[TemplateClause], inputs: &[bool], out: bool) -> bool {
        // A clause is violated iff every input slot matches and the output sign disagrees.
        !clauses.iter().any(|(row, sign)| {
            let all_match = row.iter().zip(inputs).all(|(slot, &v)| match slot {
                None => true,
                Some(want) => *want == v,
            });
            all_match && *sign != out
        })
    }

    #[test]
    fn template_matches_truth_table_for_all_rows() {
        for arity in 2..=4 {
            for &cbit in &[false, true] {
                for &output in &[AddOutputBit::Sum, AddOutputBit::C1, AddOutputBit::C2] {
                    let clauses = add_template(arity, cbit, output);
                    for mask in 0u32..(1u32 << arity) {
                        let inputs: Vec<bool> = (0..arity).map(|i| (mask >> i) & 1 == 1).collect();
                        let expected = truth(arity, cbit, output, &inputs);
                        assert!(
                            truth_of(clauses, &inputs, expected),
                            "arity={arity} cbit={cbit} output={output:?} inputs={inputs:?}"
                        );
                        assert!(!truth_of(clauses, &inputs, !expected));
                    }
                }
            }
        }
    }

    #[test]
    fn cache_returns_same_pointer() {
        let a = add_template(3, false, AddOutputBit::Sum) as *const _;
        let b = add_template(3, false, AddOutputBit::Sum) as *const _;
        assert_eq!(a, b);
    }
}
