//! Packed clause representation.
//!
//! A clause of at most [`MAX_AGGREGATE_LITERALS`] literals is stored as its
//! sorted, un-negated variable list plus a 16-bit *aggregate flags* bitmap:
//! bit `b` of the bitmap is set iff the sign combination described by `b`
//! (bit `k` of `b` negates the k-th variable) is one of the clauses actually
//! asserted. A single record can therefore stand in for up to sixteen
//! ordinary clauses sharing the same variable set. Clauses longer than
//! [`MAX_AGGREGATE_LITERALS`] store their literals (with sign folded in)
//! directly and carry empty aggregate flags.

use crate::literal::Literal;

pub const MAX_AGGREGATE_LITERALS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Un-negated variable ids (aggregated form) or signed literal ids
    /// (non-aggregated form), always sorted ascending by variable.
    pub literals: Vec<u32>,
    /// Non-zero iff `literals.len() <= MAX_AGGREGATE_LITERALS`.
    pub aggregate_flags: u16,
    pub excluded: bool,
}

impl Clause {
    pub fn is_aggregated(&self) -> bool {
        self.literals.len() <= MAX_AGGREGATE_LITERALS
    }

    /// Builds the aggregated form of a single clause given as signed
    /// literals (already sorted by variable, variables already deduplicated
    /// by the caller).
    pub fn aggregated_single(signed: &[Literal]) -> Clause {
        debug_assert!(signed.len() <= MAX_AGGREGATE_LITERALS);
        let literals: Vec<u32> = signed.iter().map(|l| l.variable()).collect();
        let mut bit = 0u16;
        for (k, l) in signed.iter().enumerate() {
            if !l.is_direct() {
                bit |= 1 << k;
            }
        }
        Clause {
            literals,
            aggregate_flags: 1 << bit,
            excluded: false,
        }
    }

    pub fn non_aggregated(signed: &[Literal]) -> Clause {
        debug_assert!(signed.len() > MAX_AGGREGATE_LITERALS);
        Clause {
            literals: signed.iter().map(|l| l.id()).collect(),
            aggregate_flags: 0,
            excluded: false,
        }
    }

    /// Expands an aggregated clause's `bit`-th sign combination into actual
    /// signed literals, or `None` if that combination is not set.
    pub fn expand_combination(&self, bit: u16) -> Option<Vec<Literal>> {
        if self.aggregate_flags & (1 << bit) == 0 {
            return None;
        }
        Some(
            self.literals
                .iter()
                .enumerate()
                .map(|(k, &v)| {
                    if bit & (1 << k) != 0 {
                        Literal::var(v).negate()
                    } else {
                        Literal::var(v)
                    }
                })
                .collect(),
        )
    }

    /// All individual clauses this record currently represents.
    pub fn expand_all(&self) -> Vec<Vec<Literal>> {
        if !self.is_aggregated() {
            return vec![self
                .literals
                .iter()
                .map(|&id| Literal::raw(id))
                .collect()];
        }
        let n = self.literals.len() as u32;
        (0..(1u16 << n))
            .filter_map(|bit| self.expand_combination(bit))
            .collect()
    }

    /// Every variable this clause mentions, in its stored (sorted) order.
    pub fn variables(&self) -> Vec<u32> {
        if self.is_aggregated() {
            self.literals.clone()
        } else {
            self.literals.iter().map(|&id| Literal::raw(id).variable()).collect()
        }
    }

    /// The first (smallest-variable) variable id, used to partition the
    /// per-variable index.
    pub fn first_variable(&self) -> Option<u32> {
        self.literals.first().map(|&v| {
            if self.is_aggregated() {
                v
            } else {
                Literal::raw(v).variable()
            }
        })
    }

    /// Comparison key used by the clause index: the literal sequence as
    /// signed ids (for aggregated clauses, the un-negated variable ids only,
    /// since the index partitions on variable set, not sign).
    pub fn sort_key(&self) -> &[u32] {
        &self.literals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_round_trips() {
        let signed = vec![Literal::var(2), Literal::var(5).negate()];
        let c = Clause::aggregated_single(&signed);
        assert!(c.is_aggregated());
        let expanded = c.expand_all();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0], signed);
    }

    #[test]
    fn merging_flags_represents_multiple_clauses() {
        let a = Clause::aggregated_single(&[Literal::var(1), Literal::var(2)]);
        let b = Clause::aggregated_single(&[Literal::var(1).negate(), Literal::var(2)]);
        let mut merged = a.clone();
        merged.aggregate_flags |= b.aggregate_flags;
        assert_eq!(merged.expand_all().len(), 2);
    }
}
