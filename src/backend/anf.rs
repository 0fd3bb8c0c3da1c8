//! ANF (algebraic normal form / PolyBoRi) backend.
//!
//! Every value is a GF(2) polynomial: a sum (XOR) of products of un-negated
//! variables, with a distinguished constant term. Each primitive computes
//! its own well-known GF(2) identity (`x∧y = xy`, `x∨y = x+y+xy`,
//! `ch = xy + ¬x·z`, `maj = xy+xz+yz`) and `add` derives its output bits via
//! the algebraic normal form (Möbius/Zhegalkin) transform of the addition
//! truth table, so one routine covers every arity instead of bespoke
//! per-arity carry formulas.

use std::collections::HashMap;

use crate::backend::{AddOutput, Backend};
use crate::error::Result;
use crate::literal::{Literal, VarGen};

/// A polynomial: XOR of terms, each term a sorted set of un-negated
/// variable ids (`[]` denotes the constant term `1`).
pub type Term = Vec<u32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub terms: Vec<Term>,
}

#[derive(Debug, Default)]
pub struct AnfBackend {
    pub equations: Vec<Equation>,
    pub vargen: VarGen,
    xor_max_args: usize,
    add_max_args: usize,
}

/// Substitutes a known constant for `var` across every equation: a term
/// containing `var` either vanishes (`value = false`) or drops `var` and
/// keeps the rest (`value = true`), per the usual GF(2) `x = 1` /
/// `x = 0` specialization. Used by the `assign`/`define` CLI commands,
/// which only support binding ANF variables to constants — aliasing one
/// ANF variable to another would need a full linear substitution, which
/// this crate does not implement (documented scope limit, see DESIGN.md).
pub fn substitute_constant(equations: &mut [Equation], var: u32, value: bool) {
    for eq in equations.iter_mut() {
        let mut terms = std::mem::take(&mut eq.terms);
        if !value {
            terms.retain(|t| !t.contains(&var));
        } else {
            for t in terms.iter_mut() {
                t.retain(|&v| v != var);
            }
        }
        cancel_duplicates(&mut terms);
        eq.terms = terms;
    }
}

fn cancel_duplicates(terms: &mut Vec<Term>) {
    let mut counts: HashMap<Term, u32> = HashMap::new();
    for t in terms.drain(..) {
        *counts.entry(t).or_insert(0) += 1;
    }
    let mut result: Vec<Term> = counts.into_iter().filter(|(_, c)| c % 2 == 1).map(|(t, _)| t).collect();
    result.sort();
    *terms = result;
}

/// The XOR-sum-of-terms representation of a single signed literal.
fn single_literal_terms(l: Literal) -> Vec<Term> {
    if l.is_constant() {
        return if l.value() { vec![vec![]] } else { vec![] };
    }
    if l.is_direct() {
        vec![vec![l.variable()]]
    } else {
        vec![vec![], vec![l.variable()]]
    }
}

/// Expands the product of `lits` (each possibly negated) into a term list,
/// eliminating negation via `¬y = 1 + y` and idempotence via `x·x = x`.
fn product_terms(lits: &[Literal]) -> Vec<Term> {
    let mut terms: Vec<Term> = vec![vec![]];
    for &l in lits {
        if l.is_constant() {
            if !l.value() {
                return vec![];
            }
            continue;
        }
        let mut next = Vec::with_capacity(terms.len() * 2);
        for t in &terms {
            if l.is_direct() {
                let mut nt = t.clone();
                if !nt.contains(&l.variable()) {
                    nt.push(l.variable());
                    nt.sort_unstable();
                }
                next.push(nt);
            } else {
                next.push(t.clone());
                let mut nt = t.clone();
                if !nt.contains(&l.variable()) {
                    nt.push(l.variable());
                    nt.sort_unstable();
                }
                next.push(nt);
            }
        }
        terms = next;
        cancel_duplicates(&mut terms);
    }
    terms
}

fn xor_terms(groups: Vec<Vec<Term>>) -> Vec<Term> {
    let mut all: Vec<Term> = groups.into_iter().flatten().collect();
    cancel_duplicates(&mut all);
    all
}

/// Möbius (Zhegalkin) transform: the subsets of `{0..n}` whose product
/// appears with coefficient 1 in the GF(2) polynomial for `f`.
fn anf_monomials(n: usize, f: impl Fn(u32) -> bool) -> Vec<Vec<usize>> {
    let size = 1usize << n;
    let mut table: Vec<bool> = (0..size).map(|mask| f(mask as u32)).collect();
    for i in 0..n {
        for mask in 0..size {
            if mask & (1 << i) != 0 {
                table[mask] ^= table[mask ^ (1 << i)];
            }
        }
    }
    (0..size)
        .filter(|&mask| table[mask])
        .map(|mask| (0..n).filter(|&i| mask & (1 << i) != 0).collect())
        .collect()
}

impl AnfBackend {
    pub fn new(add_max_args: usize, xor_max_args: usize) -> AnfBackend {
        AnfBackend {
            equations: Vec::new(),
            vargen: VarGen::new(),
            xor_max_args: xor_max_args.clamp(2, 32),
            add_max_args: add_max_args.clamp(2, 6),
        }
    }

    fn finalize(&mut self, mut terms: Vec<Term>) -> Result<Literal> {
        cancel_duplicates(&mut terms);
        if terms.is_empty() {
            return Ok(Literal::FALSE);
        }
        if terms.len() == 1 {
            if terms[0].is_empty() {
                return Ok(Literal::TRUE);
            }
            if terms[0].len() == 1 {
                return Ok(Literal::var(terms[0][0]));
            }
        }
        if terms.len() == 2 {
            if let Some(pos) = terms.iter().position(|t| t.is_empty()) {
                let other = &terms[1 - pos];
                if other.len() == 1 {
                    return Ok(Literal::var(other[0]).negate());
                }
            }
        }
        let r = self.vargen.fresh()?;
        let mut eq_terms = terms;
        eq_terms.push(vec![r.variable()]);
        self.equations.push(Equation { terms: eq_terms });
        Ok(r)
    }
}

impl Backend for AnfBackend {
    fn fresh(&mut self) -> Result<Literal> {
        self.vargen.fresh()
    }

    fn not(&mut self, x: Literal) -> Literal {
        x.negate()
    }

    fn and(&mut self, x: Literal, y: Literal) -> Result<Literal> {
        self.finalize(product_terms(&[x, y]))
    }

    fn or(&mut self, x: Literal, y: Literal) -> Result<Literal> {
        let terms = xor_terms(vec![
            product_terms(&[x, y]),
            single_literal_terms(x),
            single_literal_terms(y),
        ]);
        self.finalize(terms)
    }

    fn xor(&mut self, args: &[Literal]) -> Result<Literal> {
        let terms = xor_terms(args.iter().map(|&a| single_literal_terms(a)).collect());
        self.finalize(terms)
    }

    fn ch(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal> {
        let terms = xor_terms(vec![product_terms(&[x, y]), product_terms(&[x.negate(), z])]);
        self.finalize(terms)
    }

    fn maj(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal> {
        let terms = xor_terms(vec![
            product_terms(&[x, y]),
            product_terms(&[x, z]),
            product_terms(&[y, z]),
        ]);
        self.finalize(terms)
    }

    fn add(&mut self, args: &[Literal], constant_bit: bool, want_c2: bool) -> Result<AddOutput> {
        let n = args.len();
        debug_assert!((2..=6).contains(&n));
        // `mask`'s i-th bit stands for the truth value of `args[i]` itself
        // (sign and constant-folding included) — `build` below reconstructs
        // each monomial by substituting the real literal back in via
        // `product_terms`, which already does that sign/constant handling.
        // Re-deriving a sign here too would apply it twice.
        let value_of = |mask: u32, i: usize| -> bool { (mask >> i) & 1 == 1 };
        let total = |mask: u32| -> u32 {
            constant_bit as u32 + (0..n).filter(|&i| value_of(mask, i)).count() as u32
        };

        let build = |bit_index: u32| -> Vec<Term> {
            let monomials = anf_monomials(n, |mask| (total(mask) >> bit_index) & 1 == 1);
            let mut terms = Vec::new();
            for subset in monomials {
                let lits: Vec<Literal> = subset.iter().map(|&i| args[i]).collect();
                if lits.is_empty() {
                    terms.push(vec![]);
                } else {
                    terms.extend(product_terms(&lits));
                }
            }
            terms
        };

        let sum = self.finalize(build(0))?;
        let c1 = self.finalize(build(1))?;
        let c2 = if want_c2 { Some(self.finalize(build(2))?) } else { None };
        Ok(AddOutput { sum, c1, c2 })
    }

    fn xor_max_args(&self) -> usize {
        self.xor_max_args
    }

    fn add_max_args(&self) -> usize {
        self.add_max_args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_of_two_vars_is_single_product_term() {
        let mut b = AnfBackend::new(6, 3);
        let r = b.and(Literal::var(0), Literal::var(1)).unwrap();
        assert!(r.is_variable());
        assert_eq!(b.equations.len(), 1);
        assert_eq!(b.equations[0].terms.len(), 2); // xy + r
    }

    #[test]
    fn or_with_constant_short_circuits_to_term_expression() {
        let mut b = AnfBackend::new(6, 3);
        let r = b.or(Literal::TRUE, Literal::var(0)).unwrap();
        assert_eq!(r, Literal::TRUE);
    }

    #[test]
    fn xor_of_same_variable_cancels() {
        let mut b = AnfBackend::new(6, 3);
        let r = b.xor(&[Literal::var(0), Literal::var(0)]).unwrap();
        assert_eq!(r, Literal::FALSE);
    }

    #[test]
    fn add_matches_concrete_backend_on_all_constant_inputs() {
        use crate::backend::concrete::ConcreteBackend;
        for n in 2..=4usize {
            for mask in 0u32..(1 << n) {
                let args_concrete: Vec<Literal> =
                    (0..n).map(|i| Literal::constant((mask >> i) & 1 == 1)).collect();
                let mut concrete = ConcreteBackend::new();
                let expect = concrete.add(&args_concrete, false, true).unwrap();

                let mut anf = AnfBackend::new(6, 3);
                let got = anf.add(&args_concrete, false, true).unwrap();
                assert_eq!(got.sum, expect.sum, "sum mismatch for mask {mask:#b}, n={n}");
                assert_eq!(got.c1, expect.c1, "c1 mismatch for mask {mask:#b}, n={n}");
                assert_eq!(got.c2, expect.c2, "c2 mismatch for mask {mask:#b}, n={n}");
            }
        }
    }

    /// Regression: a negated operand used to come out with the wrong sign
    /// (and a constant-false operand could flip the result) because the
    /// monomial truth table re-derived each operand's sign from its
    /// underlying variable instead of treating `mask` as that operand's own
    /// truth value — double-applying the sign once the literal was
    /// substituted back in.
    #[test]
    fn add_handles_negated_and_constant_operands_together() {
        let mut anf = AnfBackend::new(6, 3);
        // TRUE + !y5, mod 2: 1 XOR (NOT y5) = y5.
        let sum = anf.add(&[Literal::TRUE, Literal::var(5).negate()], false, false).unwrap().sum;
        assert_eq!(sum, Literal::var(5));

        let mut anf = AnfBackend::new(6, 3);
        // TRUE + FALSE = TRUE.
        let sum = anf.add(&[Literal::TRUE, Literal::FALSE], false, false).unwrap().sum;
        assert_eq!(sum, Literal::TRUE);
    }
}
