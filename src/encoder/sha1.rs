//! SHA-1 round function, generic over any [`Backend`]. Mirrors
//! [`crate::encoder::sha256`]'s structure: the same source drives clause
//! emission, term emission, or a concrete hash computation depending only on
//! the backend handed in.

use crate::backend::Backend;
use crate::error::Result;
use crate::word::Word;

pub const H1_INIT: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// The four round constants, one per twenty-round block, per FIPS 180-4 §4.2.1.
pub const K1: [u32; 4] = [0x5A827999, 0x6ED9EBA1, 0x8F1BBCDC, 0xCA62C1D6];

pub const ROUNDS: usize = 80;

fn rotl(x: &Word<32>, n: usize) -> Word<32> {
    x.rotr((32 - (n % 32)) % 32)
}

fn round_constant(t: usize) -> u32 {
    K1[t / 20]
}

fn round_function(t: usize, b: &Word<32>, c: &Word<32>, d: &Word<32>, backend: &mut impl Backend) -> Result<Word<32>> {
    match t / 20 {
        0 => b.ch(c, d, backend),
        1 | 3 => Word::xor_many(&[b, c, d], backend),
        2 => b.maj(c, d, backend),
        _ => unreachable!("round index out of range"),
    }
}

/// Expands the sixteen block words into `rounds` schedule words (`rounds`
/// capped at [`ROUNDS`]).
pub fn message_schedule(
    block: &[Word<32>; 16],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<Vec<Word<32>>> {
    let rounds = rounds.min(ROUNDS);
    let mut w: Vec<Word<32>> = block.to_vec();
    for t in 16..rounds {
        let x = Word::xor_many(&[&w[t - 3], &w[t - 8], &w[t - 14], &w[t - 16]], backend)?;
        w.push(rotl(&x, 1));
    }
    Ok(w)
}

/// Runs the compression function over `h` for `rounds` rounds (capped at
/// [`ROUNDS`]), returning the new working state (the caller adds it back
/// into `h`, per FIPS 180-4 §6.1.2 step 4).
pub fn compress(
    h: &[Word<32>; 5],
    schedule: &[Word<32>],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<[Word<32>; 5]> {
    let rounds = rounds.min(ROUNDS).min(schedule.len());
    let [mut a, mut b, mut c, mut d, mut e] = *h;

    for t in 0..rounds {
        let f = round_function(t, &b, &c, &d, backend)?;
        let k_t: Word<32> = Word::from_value(round_constant(t) as u64);
        let temp = Word::add(&[rotl(&a, 5), f, e, k_t, schedule[t]], backend)?;

        e = d;
        d = c;
        c = rotl(&b, 30);
        b = a;
        a = temp;
    }

    Ok([a, b, c, d, e])
}

/// Runs the full single-block compression starting from [`H1_INIT`] and
/// folds the working variables back into the state.
pub fn hash_block(block: &[Word<32>; 16], rounds: usize, backend: &mut impl Backend) -> Result<[Word<32>; 5]> {
    let h: [Word<32>; 5] = std::array::from_fn(|i| Word::from_value(H1_INIT[i] as u64));
    let schedule = message_schedule(block, rounds, backend)?;
    let worked = compress(&h, &schedule, rounds, backend)?;
    let mut out = [Word::from_unassigned(); 5];
    for i in 0..5 {
        out[i] = Word::add(&[h[i], worked[i]], backend)?;
    }
    Ok(out)
}

/// Like [`hash_block`], but also returns the five-word working state after
/// every round (`trace[t]` is `[a, b, c, d, e]` as it stood right after
/// round `t`), so a driver can bind that state to a named variable the way
/// it binds `M`/`H`.
pub fn hash_block_traced(
    block: &[Word<32>; 16],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<([Word<32>; 5], Vec<[Word<32>; 5]>, Vec<Word<32>>)> {
    let h: [Word<32>; 5] = std::array::from_fn(|i| Word::from_value(H1_INIT[i] as u64));
    let schedule = message_schedule(block, rounds, backend)?;
    let rounds = rounds.min(ROUNDS).min(schedule.len());
    let mut trace = Vec::with_capacity(rounds);
    let [mut a, mut b, mut c, mut d, mut e] = h;

    for t in 0..rounds {
        let f = round_function(t, &b, &c, &d, backend)?;
        let k_t: Word<32> = Word::from_value(round_constant(t) as u64);
        let temp = Word::add(&[rotl(&a, 5), f, e, k_t, schedule[t]], backend)?;

        e = d;
        d = c;
        c = rotl(&b, 30);
        b = a;
        a = temp;
        trace.push([a, b, c, d, e]);
    }

    let worked = [a, b, c, d, e];
    let mut out = [Word::from_unassigned(); 5];
    for i in 0..5 {
        out[i] = Word::add(&[h[i], worked[i]], backend)?;
    }
    Ok((out, trace, schedule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::concrete::ConcreteBackend;
    use crate::encoder::{pad_single_block, word_from_be_bits};
    use crate::literal::Literal;
    use sha1::{Digest, Sha1};

    fn concrete_block(bytes: &[u8]) -> [Word<32>; 16] {
        let bits: Vec<Literal> = bytes
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |i| Literal::constant((byte >> i) & 1 == 1)))
            .collect();
        let padded = pad_single_block(&bits).unwrap();
        let mut words = [Word::from_unassigned(); 16];
        for t in 0..16 {
            words[t] = word_from_be_bits(&padded[t * 32..(t + 1) * 32]);
        }
        words
    }

    #[test]
    fn matches_reference_implementation_for_short_message() {
        let message = b"abc";
        let mut backend = ConcreteBackend::new();
        let block = concrete_block(message);
        let digest = hash_block(&block, ROUNDS, &mut backend).unwrap();

        let expected_bytes = Sha1::digest(message);
        for i in 0..5 {
            let expected = u32::from_be_bytes(expected_bytes[i * 4..i * 4 + 4].try_into().unwrap());
            assert_eq!(digest[i].as_value(), Some(expected as u64), "word {i}");
        }
    }

    #[test]
    fn matches_reference_implementation_at_max_single_block_length() {
        let message = [0xA5u8; 55];
        let mut backend = ConcreteBackend::new();
        let block = concrete_block(&message);
        let digest = hash_block(&block, ROUNDS, &mut backend).unwrap();

        let expected_bytes = Sha1::digest(message);
        for i in 0..5 {
            let expected = u32::from_be_bytes(expected_bytes[i * 4..i * 4 + 4].try_into().unwrap());
            assert_eq!(digest[i].as_value(), Some(expected as u64), "word {i}");
        }
    }
}
