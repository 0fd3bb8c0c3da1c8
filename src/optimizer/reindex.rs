//! Post-optimization variable reindexing.
//!
//! After a run settles, many variable ordinals are either dead (assigned to
//! a constant, or resolved away into another variable and no longer
//! mentioned by any live clause or named binding) or merely non-contiguous.
//! `reindex` walks the assignment low to high, decides which ordinals
//! survive, and produces a [`ReindexMap`] the caller applies to clauses and
//! named-variable arrays alike.

use std::collections::HashSet;

use crate::literal::{Literal, VarGen};
use crate::store::ClauseStore;

/// The result of a reindexing pass: old ordinal -> new literal (a variable
/// reference, possibly negated, or a constant for a dead-but-resolved
/// variable), plus the new variable count.
#[derive(Debug, Default)]
pub struct ReindexMap {
    /// Indexed by old variable ordinal.
    targets: Vec<Literal>,
    new_count: u32,
}

impl ReindexMap {
    /// Where `old` now lives: a fresh-ordinal variable (possibly negated to
    /// track a sign flip introduced along the way), a constant, or itself
    /// unchanged if it was never touched by the mapping.
    pub fn map(&self, old: Literal) -> Literal {
        if !old.is_variable() {
            return old;
        }
        let target = self.targets[old.variable() as usize];
        if old.is_direct() {
            target
        } else {
            target.negate()
        }
    }

    pub fn new_variable_count(&self) -> u32 {
        self.new_count
    }
}

/// Computes which variables survive (mentioned by a live clause, or in
/// `named`) and assigns them contiguous fresh ordinals in ascending order of
/// their old ordinal, preserving relative order. Dead variables map to
/// whatever constant/variable their one-step assignment chase resolves to.
pub fn build(store: &ClauseStore, named: &[&[Literal]]) -> ReindexMap {
    let count = store.variable_count();
    let mut referenced = HashSet::new();
    for clause in store.clauses().iter().filter(|c| !c.excluded) {
        referenced.extend(clause.variables());
    }
    for bindings in named {
        for &lit in bindings.iter() {
            if lit.is_variable() {
                referenced.insert(lit.variable());
            }
        }
    }

    let mut targets = vec![Literal::UNASSIGNED; count as usize];
    let mut gen = VarGen::new();

    for v in 0..count {
        let assigned = store.assignment()[v as usize];
        if assigned.is_constant() {
            targets[v as usize] = assigned;
            continue;
        }
        if assigned.is_variable() && assigned.variable() != v {
            // Chased one step, as promised by the assignment-map invariant:
            // the variable it points at is necessarily lower-ordinal and
            // therefore already has its own target decided.
            let base = targets[assigned.variable() as usize];
            targets[v as usize] = if assigned.is_direct() { base } else { base.negate() };
            continue;
        }
        if referenced.contains(&v) {
            targets[v as usize] = gen.fresh().expect("reindex stays within variable capacity");
        }
        // else: unassigned, unreferenced, unnamed — dead, left UNASSIGNED.
    }

    ReindexMap {
        targets,
        new_count: gen.count(),
    }
}

/// Rewrites every live clause's variable list through `map`, flipping the
/// matching aggregate-flag axis for every variable the mapping negates.
pub fn apply_to_store(store: &mut ClauseStore, map: &ReindexMap) -> ClauseStore {
    let mut fresh = ClauseStore::new();
    for clause in store.clauses().iter().filter(|c| !c.excluded) {
        for signed in clause.expand_all() {
            let rewritten: Vec<Literal> = signed.into_iter().map(|l| map.map(l)).collect();
            let _ = fresh.add_clause(&rewritten);
        }
    }
    fresh
}

/// Rewrites one named-variable binding (e.g. the bits of `"H"`) through `map`.
pub fn apply_to_binding(binding: &[Literal], map: &ReindexMap) -> Vec<Literal> {
    binding.iter().map(|&l| map.map(l)).collect()
}
