//! Unit-propagation / subsumption / clause-aggregation optimizer.
//!
//! The optimizer processes stored clauses through a work queue: normalizing
//! each clause under the current variable assignment, assigning and
//! propagating units as they're discovered, then running a generic
//! subsumption and binary-resolution pass over what's left. Everything runs
//! inside a [`ClauseStore`] transaction so a detected conflict rolls the
//! store back to its pre-optimize state before reporting UNSAT — a conflict
//! is terminal, never a backtracking point.

mod reindex;
mod subsumption;

pub use reindex::{apply_to_binding, apply_to_store, build as build_reindex, ReindexMap};

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::literal::Literal;
use crate::store::clause::Clause;
use crate::store::ClauseStore;

/// How thoroughly to run the optimizer, and what to keep afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Skip the evaluate/propagate loop entirely; just emit a unit or
    /// equivalence clause for every variable the caller already assigned
    /// (e.g. a driver-supplied `H` binding).
    Unoptimized,
    /// Run the full optimizer to learn every derivable assignment, then
    /// roll back the derived clauses and keep only the original formula
    /// plus the learned assignment facts.
    Original,
    /// Run the full optimizer and keep both the original and the derived
    /// clauses.
    All,
}

/// Result of a completed optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Satisfiable,
    Conflict,
}

/// Runs the optimizer over `store` per `mode`. On conflict, the store is
/// left exactly as it was before this call (the active transaction is
/// rolled back).
pub fn optimize(store: &mut ClauseStore, mode: Mode) -> Result<Outcome> {
    if mode == Mode::Unoptimized {
        emit_assignment_facts(store);
        return Ok(Outcome::Satisfiable);
    }

    store.begin();
    match run_fixpoint(store) {
        Err(e) => {
            store.rollback();
            Err(e)
        }
        Ok(Outcome::Conflict) => {
            store.rollback();
            Ok(Outcome::Conflict)
        }
        Ok(Outcome::Satisfiable) => {
            if mode == Mode::Original {
                store.rollback();
            } else {
                store.commit();
            }
            emit_assignment_facts(store);
            Ok(Outcome::Satisfiable)
        }
    }
}

/// Records every assignment the store currently holds as a literal clause
/// — a unit clause for a constant, two binary clauses (the usual XOR
/// encoding of an equivalence) for a variable-to-variable assignment.
/// Appended with `append_raw` so the fact isn't immediately re-resolved
/// back into nothing by `add_clause`'s own resolution step.
fn emit_assignment_facts(store: &mut ClauseStore) {
    for v in 0..store.variable_count() {
        let target = store.assignment()[v as usize];
        if target.is_unassigned() {
            continue;
        }
        if target.is_constant() {
            let fact = if target.value() { Literal::var(v) } else { Literal::var(v).negate() };
            store.append_raw(&[fact]);
            continue;
        }
        if target.is_variable() && target.variable() == v {
            continue; // self-loop: free variable, nothing to record
        }
        // v := target, i.e. v <-> target (honoring target's sign).
        store.append_raw(&[Literal::var(v).negate(), target]);
        store.append_raw(&[Literal::var(v), target.negate()]);
    }
}

fn run_fixpoint(store: &mut ClauseStore) -> Result<Outcome> {
    loop {
        if let Outcome::Conflict = evaluate_sweep(store)? {
            return Ok(Outcome::Conflict);
        }
        if !subsumption::pass(store)? {
            return Ok(Outcome::Satisfiable);
        }
    }
}

/// Outcome of normalizing one stored clause against the current assignment.
enum Eval {
    Unchanged,
    Satisfied,
    /// Old offset excluded; replacement clauses queued at these offsets.
    Changed(Vec<u32>),
}

/// Drains a work queue of clause offsets (initially every stored clause),
/// normalizing each against `store.assignment()`. Normalizing a clause may
/// assign a variable (discovered unit) or append replacement clauses, both
/// of which requeue further work, so the sweep runs to a fixed point.
fn evaluate_sweep(store: &mut ClauseStore) -> Result<Outcome> {
    let mut queue: VecDeque<u32> = (0..store.clauses().len() as u32).collect();
    let mut touched = false;
    while let Some(idx) = queue.pop_front() {
        if idx as usize >= store.clauses().len() || store.clause(idx).excluded {
            continue;
        }
        match evaluate_clause(store, idx)? {
            Eval::Unchanged => {}
            Eval::Satisfied => {
                store.exclude(idx);
                touched = true;
            }
            Eval::Changed(new_offsets) => {
                store.exclude(idx);
                touched = true;
                for off in new_offsets {
                    if let Some(var) = unit_value(store, off) {
                        assign_and_propagate(store, off, var, &mut queue)?;
                    } else {
                        queue.push_back(off);
                    }
                }
            }
        }
    }
    let _ = touched;
    Ok(Outcome::Satisfiable)
}

/// `Some((var, value))` iff the clause at `offset` is a live unit
/// (aggregated, one literal, exactly one flag bit set).
fn unit_value(store: &ClauseStore, offset: u32) -> Option<(u32, bool)> {
    let c = store.clause(offset);
    if c.excluded || !c.is_aggregated() || c.literals.len() != 1 {
        return None;
    }
    match c.aggregate_flags {
        0b01 => Some((c.literals[0], true)),
        0b10 => Some((c.literals[0], false)),
        _ => None,
    }
}

/// Assigns `var := value`, excludes the unit clause that proved it, and
/// requeues every clause mentioning `var` so the new fact propagates.
fn assign_and_propagate(
    store: &mut ClauseStore,
    unit_offset: u32,
    (var, value): (u32, bool),
    queue: &mut VecDeque<u32>,
) -> Result<()> {
    store.exclude(unit_offset);
    store.assign(var, Literal::constant(value));
    queue.extend(store.occurrences_of(var));
    Ok(())
}

/// Expands `offset`'s clause into its individual signed-literal clauses,
/// resolves each through the current assignment, and reports what changed.
/// A conflict here means one specific sub-clause resolved to empty — since
/// an aggregate's set bits are a conjunction of separately-required
/// clauses, that alone is enough to declare the whole formula UNSAT.
fn evaluate_clause(store: &mut ClauseStore, offset: u32) -> Result<Eval> {
    let original: Vec<Vec<Literal>> = store.clause(offset).expand_all();
    let mut changed = false;
    let mut surviving: Vec<Vec<Literal>> = Vec::with_capacity(original.len());

    for clause in &original {
        match resolve_one(store, clause) {
            ResolvedClause::Satisfied => changed = true,
            ResolvedClause::Conflict => {
                return Err(Error::Conflict(format!(
                    "clause {clause:?} reduced to empty under the current assignment"
                )))
            }
            ResolvedClause::Literals(lits) => {
                if lits != *clause {
                    changed = true;
                }
                surviving.push(lits);
            }
        }
    }

    if !changed {
        return Ok(Eval::Unchanged);
    }
    if surviving.is_empty() {
        return Ok(Eval::Satisfied);
    }

    let mut new_offsets = Vec::with_capacity(surviving.len());
    for lits in surviving {
        if let Some(off) = store.add_clause(&lits)? {
            new_offsets.push(off);
        }
    }
    new_offsets.sort_unstable();
    new_offsets.dedup();
    Ok(Eval::Changed(new_offsets))
}

enum ResolvedClause {
    Satisfied,
    Conflict,
    Literals(Vec<Literal>),
}

/// Resolves every literal of one expanded (non-aggregated) clause through
/// `store`'s assignment, drops constant-false literals, detects a
/// satisfied or tautological clause, and dedupes.
fn resolve_one(store: &ClauseStore, clause: &[Literal]) -> ResolvedClause {
    let mut resolved: Vec<Literal> = clause.iter().map(|&l| store.resolve(l)).collect();
    if resolved.iter().any(|l| l.is_constant() && l.value()) {
        return ResolvedClause::Satisfied;
    }
    resolved.retain(|l| !(l.is_constant() && !l.value()));
    resolved.sort_by_key(|l| l.abs().id());
    let mut deduped: Vec<Literal> = Vec::with_capacity(resolved.len());
    for lit in resolved {
        if let Some(&last) = deduped.last() {
            if last.abs() == lit.abs() {
                if last == lit {
                    continue;
                }
                return ResolvedClause::Satisfied; // tautology
            }
        }
        deduped.push(lit);
    }
    if deduped.is_empty() {
        ResolvedClause::Conflict
    } else {
        ResolvedClause::Literals(deduped)
    }
}

/// Every currently-live expanded clause's variable set — used by the
/// subsumption pass and by tests that want to sanity-check the formula.
pub fn live_variable_sets(store: &ClauseStore) -> Vec<Vec<u32>> {
    store.clauses().iter().filter(|c| !c.excluded).map(Clause::variables).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;

    #[test]
    fn unit_propagation_satisfies_chain() {
        let mut s = ClauseStore::new();
        // (¬1 ∨ 2), (¬2 ∨ 3), (1)
        s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(2).negate(), Literal::var(3)]).unwrap();
        s.add_clause(&[Literal::var(1)]).unwrap();
        let outcome = optimize(&mut s, Mode::All).unwrap();
        assert_eq!(outcome, Outcome::Satisfiable);
        assert_eq!(s.assignment()[1], Literal::TRUE);
        assert_eq!(s.assignment()[2], Literal::TRUE);
        assert_eq!(s.assignment()[3], Literal::TRUE);
    }

    #[test]
    fn conflicting_units_report_conflict() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(1)]).unwrap();
        let result = s.add_clause(&[Literal::var(1).negate()]);
        assert!(result.is_err());
    }

    #[test]
    fn all_four_binary_sign_combinations_conflict() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(1), Literal::var(2).negate()]).unwrap();
        let result = s.add_clause(&[Literal::var(1).negate(), Literal::var(2).negate()]);
        assert!(result.is_err());
    }

    #[test]
    fn subsumed_ternary_clause_is_dropped() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(1), Literal::var(2), Literal::var(3)]).unwrap();
        optimize(&mut s, Mode::All).unwrap();
        let live = live_variable_sets(&s);
        assert!(!live.iter().any(|vars| vars == &vec![1, 2, 3]));
    }

    #[test]
    fn original_mode_discards_derived_clauses_but_keeps_assignments() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(1)]).unwrap();
        let before = s.clauses().len();
        optimize(&mut s, Mode::Original).unwrap();
        assert_eq!(s.assignment()[1], Literal::TRUE);
        assert_eq!(s.assignment()[2], Literal::TRUE);
        // rolled back to (at most) the original clauses plus the emitted facts.
        assert!(s.clauses().len() <= before + 2);
    }

    #[test]
    fn unoptimized_mode_emits_facts_without_propagating() {
        let mut s = ClauseStore::new();
        s.assign(0, Literal::TRUE);
        optimize(&mut s, Mode::Unoptimized).unwrap();
        assert!(s.clauses().iter().any(|c| c.literals == vec![0] && c.aggregate_flags == 0b01));
    }
}
