//! The clause container: packed aggregate clauses, a per-variable AVL
//! index, the variable assignment array, and transactional rollback.

pub mod avl;
pub mod clause;
pub mod transaction;

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::literal::Literal;
use avl::AvlIndex;
use clause::Clause;
use transaction::{Snapshot, Transaction};

#[derive(Debug, Default)]
pub struct ClauseStore {
    clauses: Vec<Clause>,
    index: AvlIndex,
    assignment: Vec<Literal>,
    transaction: Transaction,
    /// For each variable ordinal, the clause slots that mention it — not
    /// just the ones where it is the smallest variable (unlike `index`,
    /// which only tracks that). Drives unit propagation and subsumption
    /// candidate lookup without a full store scan.
    occurrences: Vec<Vec<u32>>,
}

impl ClauseStore {
    pub fn new() -> ClauseStore {
        ClauseStore::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clause(&self, idx: u32) -> &Clause {
        &self.clauses[idx as usize]
    }

    pub fn assignment(&self) -> &[Literal] {
        &self.assignment
    }

    /// Live (non-excluded) clause slots mentioning `var`, in append order.
    pub fn occurrences_of(&self, var: u32) -> impl Iterator<Item = u32> + '_ {
        self.occurrences
            .get(var as usize)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&idx| !self.clauses[idx as usize].excluded)
    }

    pub fn ensure_variable(&mut self, var: u32) {
        let need = var as usize + 1;
        if self.assignment.len() < need {
            self.assignment.resize(need, Literal::UNASSIGNED);
        }
        if self.occurrences.len() < need {
            self.occurrences.resize_with(need, Vec::new);
        }
    }

    pub fn assign(&mut self, var: u32, value: Literal) {
        self.ensure_variable(var);
        self.assignment[var as usize] = value;
    }

    pub fn resolve(&self, lit: Literal) -> Literal {
        lit.resolve(&self.assignment)
    }

    fn key_of(&self, idx: u32) -> Vec<u32> {
        self.clauses[idx as usize].sort_key().to_vec()
    }

    /// Adds a clause given as (possibly redundant) signed literals, after
    /// resolving every literal through the current assignment. Tautologies
    /// are dropped; duplicate variable occurrences are merged or cancelled;
    /// matching existing aggregated records have their flags OR-ed in.
    /// Returns the touched clause slot (`None` if the clause was trivially
    /// satisfied and nothing was stored), or `Err(Error::Conflict)` if the
    /// clause reduces to the empty (unsatisfiable) clause — including the
    /// case where an aggregate's flags end up covering every sign
    /// combination over its variables, which asserts every possible clause
    /// over that variable set simultaneously and is therefore UNSAT.
    pub fn add_clause(&mut self, literals: &[Literal]) -> Result<Option<u32>> {
        let mut resolved: Vec<Literal> = literals.iter().map(|&l| self.resolve(l)).collect();

        if resolved.iter().any(|l| l.is_constant() && l.value()) {
            return Ok(None); // satisfied trivially
        }
        resolved.retain(|l| !(l.is_constant() && !l.value()));

        resolved.sort_by_key(|l| l.abs().id());
        let mut deduped: Vec<Literal> = Vec::with_capacity(resolved.len());
        for lit in resolved {
            if let Some(&last) = deduped.last() {
                if last.abs() == lit.abs() {
                    if last == lit {
                        continue; // duplicate literal
                    } else {
                        return Ok(None); // tautology: x or not-x, clause always true
                    }
                }
            }
            deduped.push(lit);
        }

        if deduped.is_empty() {
            return Err(Error::Conflict("empty clause derived".into()));
        }

        for l in &deduped {
            self.ensure_variable(l.variable());
        }

        if deduped.len() <= clause::MAX_AGGREGATE_LITERALS {
            self.add_aggregated(&deduped)
        } else {
            let clause = Clause::non_aggregated(&deduped);
            Ok(Some(self.append_and_index(clause)))
        }
    }

    fn add_aggregated(&mut self, signed: &[Literal]) -> Result<Option<u32>> {
        let new_clause = Clause::aggregated_single(signed);
        let var = new_clause.first_variable().unwrap();
        let key = new_clause.sort_key().to_vec();
        let full_mask = (1u32 << (1u32 << new_clause.literals.len())) - 1;
        if let Some(existing) = self.index.find(var, &key, |i| self.key_of(i)) {
            let merged = self.clauses[existing as usize].aggregate_flags as u32 | new_clause.aggregate_flags as u32;
            if merged == full_mask {
                return Err(Error::Conflict(format!(
                    "all sign combinations asserted over variables {:?}",
                    self.clauses[existing as usize].literals
                )));
            }
            self.clauses[existing as usize].aggregate_flags = merged as u16;
            return Ok(Some(existing));
        }
        if new_clause.aggregate_flags as u32 == full_mask && new_clause.literals.len() == 1 {
            return Err(Error::Conflict(format!(
                "variable {} assigned both true and false",
                new_clause.literals[0]
            )));
        }
        Ok(Some(self.append_and_index(new_clause)))
    }

    /// Appends a clause without resolving it through the current
    /// assignment first, bypassing `add_clause`'s dedup/tautology logic.
    /// Used to record an already-decided fact (a unit or equivalence
    /// clause reflecting `assignment[v]`) verbatim, since re-resolving it
    /// through `assignment` would immediately collapse it back to nothing.
    pub fn append_raw(&mut self, literals: &[Literal]) -> u32 {
        for l in literals {
            self.ensure_variable(l.variable());
        }
        let mut signed: Vec<Literal> = literals.to_vec();
        signed.sort_by_key(|l| l.abs().id());
        let clause = if signed.len() <= clause::MAX_AGGREGATE_LITERALS {
            Clause::aggregated_single(&signed)
        } else {
            Clause::non_aggregated(&signed)
        };
        self.append_and_index(clause)
    }

    fn append_and_index(&mut self, clause: Clause) -> u32 {
        let var = clause.first_variable();
        let idx = self.clauses.len() as u32;
        for v in clause.variables() {
            self.ensure_variable(v);
            self.occurrences[v as usize].push(idx);
        }
        self.clauses.push(clause);
        if let Some(var) = var {
            self.index.insert(var, idx, |i| self.key_of(i));
        }
        idx
    }

    pub fn exclude(&mut self, idx: u32) {
        self.clauses[idx as usize].excluded = true;
    }

    /// Overwrites a stored aggregate's flag bitmap. Flags never
    /// participate in the index's sort key (only the variable list does),
    /// so changing them never invalidates the AVL placement.
    pub fn set_aggregate_flags(&mut self, idx: u32, flags: u16) {
        self.clauses[idx as usize].aggregate_flags = flags;
    }

    pub fn total_live_flag_bits(&self) -> u32 {
        self.clauses
            .iter()
            .filter(|c| !c.excluded && c.is_aggregated())
            .map(|c| c.aggregate_flags.count_ones())
            .sum()
    }

    pub fn variable_count(&self) -> u32 {
        self.assignment.len() as u32
    }

    pub fn begin(&mut self) {
        self.transaction.begin(Snapshot {
            clause_count: self.clauses.len(),
            variable_count: self.variable_count(),
            instance_count: self.assignment.len(),
            excluded: self.clauses.iter().map(|c| c.excluded).collect(),
        });
    }

    pub fn commit(&mut self) {
        self.transaction.commit();
    }

    /// Truncates back to the last `begin` snapshot, restores the
    /// pre-snapshot clauses' `excluded` flags to what they were at `begin`
    /// (undoing any in-place exclusion a mutation within the transaction
    /// performed under the immutable-region rule), and rebuilds the index
    /// from the surviving, non-excluded clauses.
    pub fn rollback(&mut self) {
        let Some(snap) = self.transaction.rollback() else { return };
        self.clauses.truncate(snap.clause_count);
        self.assignment.truncate(snap.instance_count);
        for (idx, &excluded) in snap.excluded.iter().enumerate() {
            self.clauses[idx].excluded = excluded;
        }
        self.rebuild_index();
    }

    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for occ in self.occurrences.iter_mut() {
            occ.clear();
        }
        let mut seen_keys: HashSet<(u32, Vec<u32>)> = HashSet::new();
        for idx in 0..self.clauses.len() as u32 {
            if self.clauses[idx as usize].excluded {
                continue;
            }
            for v in self.clauses[idx as usize].variables() {
                self.occurrences[v as usize].push(idx);
            }
            let Some(var) = self.clauses[idx as usize].first_variable() else { continue };
            let key = self.key_of(idx);
            if !seen_keys.insert((var, key)) {
                continue;
            }
            self.index.insert(var, idx, |i| self.key_of(i));
        }
    }

    /// All live (non-excluded) individual clauses, aggregates expanded.
    pub fn live_clauses(&self) -> impl Iterator<Item = Vec<Literal>> + '_ {
        self.clauses
            .iter()
            .filter(|c| !c.excluded)
            .flat_map(|c| c.expand_all())
    }

    pub fn live_clause_count(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| !c.excluded)
            .map(|c| if c.is_aggregated() { c.aggregate_flags.count_ones() as usize } else { 1 })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_clause_assigns_nothing_by_itself() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(0)]).unwrap();
        assert_eq!(s.live_clause_count(), 1);
    }

    #[test]
    fn tautology_is_dropped() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(0), Literal::var(0).negate()]).unwrap();
        assert_eq!(s.clauses().len(), 0);
    }

    #[test]
    fn empty_clause_is_conflict() {
        let mut s = ClauseStore::new();
        let err = s.add_clause(&[]).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn aggregate_merges_same_variable_set() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
        s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
        assert_eq!(s.clauses().len(), 1);
        assert_eq!(s.live_clause_count(), 2);
    }

    #[test]
    fn rollback_restores_prior_state() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(0), Literal::var(1)]).unwrap();
        s.begin();
        s.add_clause(&[Literal::var(2), Literal::var(3)]).unwrap();
        assert_eq!(s.clauses().len(), 2);
        s.rollback();
        assert_eq!(s.clauses().len(), 1);
    }

    #[test]
    fn rollback_un_excludes_pre_snapshot_clauses() {
        let mut s = ClauseStore::new();
        s.add_clause(&[Literal::var(0), Literal::var(1)]).unwrap();
        s.begin();
        s.exclude(0);
        assert_eq!(s.live_clause_count(), 0);
        s.rollback();
        assert_eq!(s.live_clause_count(), 1);
        assert!(!s.clause(0).excluded);
    }

    #[test]
    fn satisfied_clause_is_skipped() {
        let mut s = ClauseStore::new();
        s.assign(0, Literal::TRUE);
        s.add_clause(&[Literal::var(0), Literal::var(1)]).unwrap();
        assert_eq!(s.clauses().len(), 0);
    }
}
