//! Symbolic fixed-width words built over a [`Backend`].
//!
//! `Word<N>` holds `N` [`Literal`]s, index 0 = least significant bit. Every
//! bitwise primitive threads a `&mut impl Backend` through so the exact same
//! round-function code can emit CNF clauses, ANF terms, or just compute a
//! concrete value, depending only on which backend is handed in.

use std::collections::{HashMap, HashSet};

use crate::backend::Backend;
use crate::error::Result;
use crate::literal::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<const N: usize>(pub [Literal; N]);

impl<const N: usize> Word<N> {
    pub fn from_unassigned() -> Word<N> {
        Word([Literal::UNASSIGNED; N])
    }

    pub fn from_value(value: u64) -> Word<N> {
        debug_assert!(N <= 64);
        let mut bits = [Literal::FALSE; N];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = Literal::constant((value >> i) & 1 == 1);
        }
        Word(bits)
    }

    /// Allocates `N` fresh variables.
    pub fn fresh(vargen: &mut crate::literal::VarGen) -> Result<Word<N>> {
        let mut bits = [Literal::FALSE; N];
        for b in bits.iter_mut() {
            *b = vargen.fresh()?;
        }
        Ok(Word(bits))
    }

    /// `Some(value)` iff every bit is a resolved constant.
    pub fn as_value(&self) -> Option<u64> {
        let mut v = 0u64;
        for (i, l) in self.0.iter().enumerate() {
            if !l.is_constant() {
                return None;
            }
            if l.value() {
                v |= 1 << i;
            }
        }
        Some(v)
    }

    pub fn rotr(&self, n: usize) -> Word<N> {
        let n = n % N;
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = self.0[(i + n) % N];
        }
        Word(out)
    }

    pub fn shr(&self, n: usize) -> Word<N> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = if i + n < N { self.0[i + n] } else { Literal::FALSE };
        }
        Word(out)
    }

    pub fn not(&self, backend: &mut impl Backend) -> Word<N> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.not(self.0[i]);
        }
        Word(out)
    }

    pub fn and(&self, other: &Word<N>, backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.and(self.0[i], other.0[i])?;
        }
        Ok(Word(out))
    }

    pub fn or(&self, other: &Word<N>, backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.or(self.0[i], other.0[i])?;
        }
        Ok(Word(out))
    }

    pub fn xor(&self, other: &Word<N>, backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.xor(&[self.0[i], other.0[i]])?;
        }
        Ok(Word(out))
    }

    pub fn xor_many(words: &[&Word<N>], backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            let bits: Vec<Literal> = words.iter().map(|w| w.0[i]).collect();
            out[i] = backend.xor(&bits)?;
        }
        Ok(Word(out))
    }

    pub fn ch(&self, y: &Word<N>, z: &Word<N>, backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.ch(self.0[i], y.0[i], z.0[i])?;
        }
        Ok(Word(out))
    }

    pub fn maj(&self, y: &Word<N>, z: &Word<N>, backend: &mut impl Backend) -> Result<Word<N>> {
        let mut out = [Literal::FALSE; N];
        for i in 0..N {
            out[i] = backend.maj(self.0[i], y.0[i], z.0[i])?;
        }
        Ok(Word(out))
    }

    /// N-ary, mod `2^N` addition of `words`, using carry-batched bags per
    /// bit position so each call to `backend.add` handles at most
    /// `backend.add_max_args()` operands. See module docs for the
    /// dedup/carry-promotion rules.
    pub fn add(words: &[Word<N>], backend: &mut impl Backend) -> Result<Word<N>> {
        let add_max = backend.add_max_args().max(2);
        let mut result = [Literal::FALSE; N];
        let mut future: HashMap<usize, Vec<Literal>> = HashMap::new();
        let mut constant_acc: u64 = 0;

        for bit in 0..N {
            let mut bag = future.remove(&bit).unwrap_or_default();
            for w in words {
                let l = w.0[bit];
                if l.is_constant() {
                    if l.value() {
                        constant_acc += 1;
                    }
                } else {
                    bag.push(l);
                }
            }

            let (reduced, extra_constant, promote) = dedup_bag(bag);
            constant_acc += extra_constant as u64;
            if bit + 1 < N && !promote.is_empty() {
                future.entry(bit + 1).or_default().extend(promote);
            }

            let constant_bit = constant_acc & 1 == 1;
            constant_acc >>= 1;

            let is_last = bit + 1 == N;
            let (sum, c1s, c2s) = process_bit(backend, reduced, constant_bit, add_max, !is_last)?;
            result[bit] = sum;
            if !is_last {
                if !c1s.is_empty() {
                    future.entry(bit + 1).or_default().extend(c1s);
                }
                if bit + 2 < N && !c2s.is_empty() {
                    future.entry(bit + 2).or_default().extend(c2s);
                }
            }
        }
        Ok(Word(result))
    }
}

/// Splits same-literal pairs out of `bag`: two occurrences of the same
/// signed literal promote to one carry literal for the next bit position;
/// one direct + one negated occurrence of the same variable cancel and add
/// 1 to the running constant. Returns `(remaining_bag, extra_constant,
/// promoted_carry)`.
fn dedup_bag(bag: Vec<Literal>) -> (Vec<Literal>, u32, Vec<Literal>) {
    let mut counts: HashMap<Literal, i32> = HashMap::new();
    for l in bag {
        *counts.entry(l).or_insert(0) += 1;
    }
    let mut reduced = Vec::new();
    let mut promote = Vec::new();
    let mut extra_constant = 0u32;
    let mut seen_vars: HashSet<u32> = HashSet::new();
    let vars: Vec<u32> = counts.keys().map(|l| l.variable()).collect();
    for var in vars {
        if !seen_vars.insert(var) {
            continue;
        }
        let d = *counts.get(&Literal::var(var)).unwrap_or(&0);
        let n = *counts.get(&Literal::var(var).negate()).unwrap_or(&0);
        let opp_pairs = d.min(n);
        extra_constant += opp_pairs as u32;
        let rem_d = d - opp_pairs;
        let rem_n = n - opp_pairs;
        if rem_d > 0 {
            for _ in 0..(rem_d / 2) {
                promote.push(Literal::var(var));
            }
            if rem_d % 2 == 1 {
                reduced.push(Literal::var(var));
            }
        }
        if rem_n > 0 {
            for _ in 0..(rem_n / 2) {
                promote.push(Literal::var(var).negate());
            }
            if rem_n % 2 == 1 {
                reduced.push(Literal::var(var).negate());
            }
        }
    }
    (reduced, extra_constant, promote)
}

/// One addition batch of at most `arity` operands, wrapping
/// `backend.add` with shortcuts for the 0- and 1-operand cases the
/// backend contract does not cover.
fn add_batch(
    backend: &mut impl Backend,
    bag: &[Literal],
    constant_bit: bool,
    want_carries: bool,
) -> Result<(Literal, Literal, Option<Literal>)> {
    if bag.is_empty() {
        let v = constant_bit as u32;
        return Ok((
            Literal::constant(v & 1 == 1),
            Literal::FALSE,
            if want_carries { Some(Literal::FALSE) } else { None },
        ));
    }
    if bag.len() == 1 {
        let l = bag[0];
        return if !constant_bit {
            Ok((l, Literal::FALSE, if want_carries { Some(Literal::FALSE) } else { None }))
        } else {
            Ok((backend.not(l), l, if want_carries { Some(Literal::FALSE) } else { None }))
        };
    }
    let out = backend.add(bag, constant_bit, want_carries)?;
    Ok((out.sum, out.c1, out.c2))
}

/// Chains `add_batch` calls across `reduced`, at most `add_max` operands
/// per call, folding each batch's sum into the next as an extra operand.
/// Returns the bit position's final sum plus every carry generated along
/// the way (destined one and two positions ahead respectively).
fn process_bit(
    backend: &mut impl Backend,
    mut reduced: Vec<Literal>,
    constant_bit: bool,
    add_max: usize,
    want_carries: bool,
) -> Result<(Literal, Vec<Literal>, Vec<Literal>)> {
    if reduced.is_empty() {
        let (sum, _, _) = add_batch(backend, &[], constant_bit, false)?;
        return Ok((sum, vec![], vec![]));
    }
    let mut c1s = Vec::new();
    let mut c2s = Vec::new();
    let mut first = true;
    loop {
        let take = reduced.len().min(add_max);
        let chunk: Vec<Literal> = reduced.drain(0..take).collect();
        let cb = if first { constant_bit } else { false };
        first = false;
        let (sum, c1, c2) = add_batch(backend, &chunk, cb, want_carries)?;
        if want_carries {
            c1s.push(c1);
            if let Some(c2) = c2 {
                c2s.push(c2);
            }
        }
        if reduced.is_empty() {
            return Ok((sum, c1s, c2s));
        }
        reduced.insert(0, sum);
    }
}
