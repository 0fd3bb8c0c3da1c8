//! Encoder driver: turns a chosen hash algorithm, round count, and named
//! I/O bindings into a symbolic circuit over a [`Backend`].
//!
//! Both algorithms here are restricted to a single input block: message
//! length must fall in `(0, 55]` bytes so the `0x80` marker, zero padding,
//! and the 64-bit big-endian bit-length suffix all fit in one 512-bit
//! block. Multi-block messages are a documented non-goal.

pub mod sha1;
pub mod sha256;

use std::collections::HashMap;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::literal::Literal;
use crate::word::Word;

pub const BLOCK_BITS: usize = 512;
pub const MAX_MESSAGE_BYTES: usize = 55;

/// Named variable bindings recorded on a completed encoding, mirroring the
/// `c var name = ...` comment records a DIMACS/PolyBoRi file carries.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    pub vars: HashMap<String, Vec<Literal>>,
}

impl Bindings {
    pub fn set(&mut self, name: &str, literals: Vec<Literal>) {
        self.vars.insert(name.to_string(), literals);
    }
}

/// Hash algorithm selector (component F's `algorithm` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl Algorithm {
    pub fn max_rounds(self) -> usize {
        match self {
            Algorithm::Sha1 => 80,
            Algorithm::Sha256 => 64,
        }
    }

    pub fn state_words(self) -> usize {
        match self {
            Algorithm::Sha1 => 5,
            Algorithm::Sha256 => 8,
        }
    }
}

/// Pads `message_bits` (big-endian bit order, as many bits as the message
/// has; `message_bits.len()` must be a multiple of 8 and at most
/// `MAX_MESSAGE_BYTES * 8`) into one 512-bit block: a trailing `1` bit,
/// zero fill, and the message's bit length as a big-endian 64-bit suffix.
pub fn pad_single_block(message_bits: &[Literal]) -> Result<[Literal; BLOCK_BITS]> {
    let len_bits = message_bits.len();
    if len_bits == 0 || len_bits % 8 != 0 || len_bits > MAX_MESSAGE_BYTES * 8 {
        return Err(Error::InvalidArgument(format!(
            "message length must be a positive multiple of 8 bits, at most {} bytes (got {} bits)",
            MAX_MESSAGE_BYTES, len_bits
        )));
    }
    let mut block = [Literal::FALSE; BLOCK_BITS];
    block[..len_bits].copy_from_slice(message_bits);
    block[len_bits] = Literal::TRUE;
    for i in (len_bits + 1)..448 {
        block[i] = Literal::FALSE;
    }
    let length_value = len_bits as u64;
    for i in 0..64 {
        // big-endian: bit 448 is the MSB of the 64-bit length.
        block[448 + i] = Literal::constant((length_value >> (63 - i)) & 1 == 1);
    }
    Ok(block)
}

/// Converts 32 big-endian-ordered literals (index 0 = MSB) into a `Word<32>`
/// (index 0 = LSB), the layout every arithmetic primitive expects.
pub fn word_from_be_bits(bits: &[Literal]) -> Word<32> {
    debug_assert_eq!(bits.len(), 32);
    let mut out = [Literal::FALSE; 32];
    for i in 0..32 {
        out[i] = bits[31 - i];
    }
    Word(out)
}

/// The inverse of [`word_from_be_bits`]: big-endian bit order for display
/// and file I/O.
pub fn word_to_be_bits(word: &Word<32>) -> Vec<Literal> {
    (0..32).map(|i| word.0[31 - i]).collect()
}

/// Splits a 512-bit big-endian block into sixteen 32-bit message words.
pub fn block_to_words(block: &[Literal; BLOCK_BITS]) -> [Word<32>; 16] {
    let mut words = [Word::from_unassigned(); 16];
    for t in 0..16 {
        words[t] = word_from_be_bits(&block[t * 32..(t + 1) * 32]);
    }
    words
}

/// Replaces any unassigned literal in `message_bits` with a fresh backend
/// variable (an unspecified message bit becomes a free variable the solver
/// may choose).
pub fn allocate_unassigned(backend: &mut impl Backend, message_bits: &mut [Literal]) -> Result<()> {
    for l in message_bits.iter_mut() {
        if l.is_unassigned() {
            *l = backend.fresh()?;
        }
    }
    Ok(())
}

/// Drives the full encoder (component F): allocates free variables for any
/// unspecified message bit, pads to the single 512-bit block, runs the
/// chosen algorithm's round function over `backend` for `rounds` rounds,
/// and records `M` (the message as finally allocated), `W` (the expanded
/// message schedule), `A` (the working state after every round, words
/// concatenated round-major), and `H` (the final hash) as named bindings.
///
/// `message_bits` is mutated in place: any `Literal::UNASSIGNED` entry is
/// replaced with the fresh variable the driver allocated for it, so the
/// caller can inspect exactly which bits ended up free.
pub fn encode(
    algorithm: Algorithm,
    rounds: usize,
    message_bits: &mut Vec<Literal>,
    backend: &mut impl Backend,
) -> Result<Bindings> {
    allocate_unassigned(backend, message_bits)?;
    let padded = pad_single_block(message_bits)?;
    let block = block_to_words(&padded);
    let rounds = rounds.min(algorithm.max_rounds());

    let mut bindings = Bindings::default();
    bindings.set("M", message_bits.clone());

    match algorithm {
        Algorithm::Sha1 => {
            let (h, trace, schedule) = sha1::hash_block_traced(&block, rounds, backend)?;
            bindings.set("W", schedule.iter().flat_map(word_to_be_bits).collect());
            bindings.set(
                "A",
                trace.iter().flat_map(|state| state.iter().flat_map(word_to_be_bits)).collect(),
            );
            bindings.set("H", h.iter().flat_map(word_to_be_bits).collect());
        }
        Algorithm::Sha256 => {
            let (h, trace, schedule) = sha256::hash_block_traced(&block, rounds, backend)?;
            bindings.set("W", schedule.iter().flat_map(word_to_be_bits).collect());
            bindings.set(
                "A",
                trace.iter().flat_map(|state| state.iter().flat_map(word_to_be_bits)).collect(),
            );
            bindings.set("H", h.iter().flat_map(word_to_be_bits).collect());
        }
    }
    Ok(bindings)
}

/// Derives the concrete hash value of a fully-specified message (every bit
/// a resolved constant) via [`crate::backend::concrete::ConcreteBackend`] —
/// the driver's "H mode = compute" step, realized without needing a SAT
/// solver or CNF evaluator on hand.
pub fn compute_concrete_hash(algorithm: Algorithm, rounds: usize, message_bits: &[Literal]) -> Result<Vec<Literal>> {
    if message_bits.iter().any(|l| !l.is_constant()) {
        return Err(Error::InvalidArgument(
            "compute mode requires every M bit to be a concrete constant".into(),
        ));
    }
    let mut backend = crate::backend::concrete::ConcreteBackend::new();
    let padded = pad_single_block(message_bits)?;
    let block = block_to_words(&padded);
    let rounds = rounds.min(algorithm.max_rounds());
    let h: Vec<Literal> = match algorithm {
        Algorithm::Sha1 => sha1::hash_block(&block, rounds, &mut backend)?.iter().flat_map(word_to_be_bits).collect(),
        Algorithm::Sha256 => {
            sha256::hash_block(&block, rounds, &mut backend)?.iter().flat_map(word_to_be_bits).collect()
        }
    };
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_rejects_oversized_message() {
        let bits = vec![Literal::FALSE; 56 * 8];
        assert!(pad_single_block(&bits).is_err());
    }

    #[test]
    fn pad_rejects_empty_message() {
        assert!(pad_single_block(&[]).is_err());
    }

    #[test]
    fn pad_places_marker_and_length() {
        let bits = vec![Literal::TRUE; 8]; // one byte, all ones
        let block = pad_single_block(&bits).unwrap();
        assert_eq!(block[8], Literal::TRUE); // 0x80 marker bit
        assert_eq!(block[9], Literal::FALSE);
        // length field = 8, encoded in the last 64 bits
        let len_bits = &block[448..512];
        let mut v = 0u64;
        for (i, l) in len_bits.iter().enumerate() {
            if l.value() {
                v |= 1 << (63 - i);
            }
        }
        assert_eq!(v, 8);
    }

    #[test]
    fn word_be_round_trips() {
        let be: Vec<Literal> = (0..32).map(|i| Literal::constant(i == 31)).collect();
        let w = word_from_be_bits(&be);
        assert_eq!(w.as_value(), Some(1));
        assert_eq!(word_to_be_bits(&w), be);
    }
}
