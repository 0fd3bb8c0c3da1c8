//! SHA-256 round function, generic over any [`Backend`].
//!
//! Driving this over [`crate::backend::cnf::CnfBackend`] or
//! [`crate::backend::anf::AnfBackend`] emits the clause/term encoding of the
//! compression function; driving it over
//! [`crate::backend::concrete::ConcreteBackend`] computes the ordinary hash
//! value, letting the same source serve as its own cross-check.

use crate::backend::Backend;
use crate::error::Result;
use crate::word::Word;

/// Initial hash values (the fractional parts of the square roots of the
/// first eight primes), per FIPS 180-4 §5.3.3.
pub const H256_INIT: [u32; 8] = [
    0x6A09E667, 0xBB67AE85, 0x3C6EF372, 0xA54FF53A, 0x510E527F, 0x9B05688C, 0x1F83D9AB, 0x5BE0CD19,
];

/// Round constants (the fractional parts of the cube roots of the first
/// sixty-four primes), per FIPS 180-4 §4.2.2.
pub const K256: [u32; 64] = [
    0x428A2F98, 0x71374491, 0xB5C0FBCF, 0xE9B5DBA5, 0x3956C25B, 0x59F111F1, 0x923F82A4, 0xAB1C5ED5,
    0xD807AA98, 0x12835B01, 0x243185BE, 0x550C7DC3, 0x72BE5D74, 0x80DEB1FE, 0x9BDC06A7, 0xC19BF174,
    0xE49B69C1, 0xEFBE4786, 0x0FC19DC6, 0x240CA1CC, 0x2DE92C6F, 0x4A7484AA, 0x5CB0A9DC, 0x76F988DA,
    0x983E5152, 0xA831C66D, 0xB00327C8, 0xBF597FC7, 0xC6E00BF3, 0xD5A79147, 0x06CA6351, 0x14292967,
    0x27B70A85, 0x2E1B2138, 0x4D2C6DFC, 0x53380D13, 0x650A7354, 0x766A0ABB, 0x81C2C92E, 0x92722C85,
    0xA2BFE8A1, 0xA81A664B, 0xC24B8B70, 0xC76C51A3, 0xD192E819, 0xD6990624, 0xF40E3585, 0x106AA070,
    0x19A4C116, 0x1E376C08, 0x2748774C, 0x34B0BCB5, 0x391C0CB3, 0x4ED8AA4A, 0x5B9CCA4F, 0x682E6FF3,
    0x748F82EE, 0x78A5636F, 0x84C87814, 0x8CC70208, 0x90BEFFFA, 0xA4506CEB, 0xBEF9A3F7, 0xC67178F2,
];

pub const ROUNDS: usize = 64;

fn big_sigma0(x: &Word<32>, backend: &mut impl Backend) -> Result<Word<32>> {
    Word::xor_many(&[&x.rotr(2), &x.rotr(13), &x.rotr(22)], backend)
}

fn big_sigma1(x: &Word<32>, backend: &mut impl Backend) -> Result<Word<32>> {
    Word::xor_many(&[&x.rotr(6), &x.rotr(11), &x.rotr(25)], backend)
}

fn small_sigma0(x: &Word<32>, backend: &mut impl Backend) -> Result<Word<32>> {
    Word::xor_many(&[&x.rotr(7), &x.rotr(18), &x.shr(3)], backend)
}

fn small_sigma1(x: &Word<32>, backend: &mut impl Backend) -> Result<Word<32>> {
    Word::xor_many(&[&x.rotr(17), &x.rotr(19), &x.shr(10)], backend)
}

/// Expands the sixteen block words into `rounds` schedule words (`rounds`
/// capped at [`ROUNDS`]; the first sixteen are the block itself unchanged).
pub fn message_schedule(
    block: &[Word<32>; 16],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<Vec<Word<32>>> {
    let rounds = rounds.min(ROUNDS);
    let mut w: Vec<Word<32>> = block.to_vec();
    for t in 16..rounds {
        let s0 = small_sigma0(&w[t - 15], backend)?;
        let s1 = small_sigma1(&w[t - 2], backend)?;
        let next = Word::add(&[w[t - 16], s0, w[t - 7], s1], backend)?;
        w.push(next);
    }
    Ok(w)
}

/// Runs the compression function over `h` for `rounds` rounds (capped at
/// [`ROUNDS`]), returning the new state words (not yet folded back into
/// `h` — the caller adds them, per FIPS 180-4 §6.2.2 step 4).
pub fn compress(
    h: &[Word<32>; 8],
    schedule: &[Word<32>],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<[Word<32>; 8]> {
    let rounds = rounds.min(ROUNDS).min(schedule.len());
    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut hh] = *h;

    for t in 0..rounds {
        let s1 = big_sigma1(&e, backend)?;
        let ch = e.ch(&f, &g, backend)?;
        let k_t: Word<32> = Word::from_value(K256[t] as u64);
        let t1 = Word::add(&[hh, s1, ch, k_t, schedule[t]], backend)?;
        let s0 = big_sigma0(&a, backend)?;
        let maj = a.maj(&b, &c, backend)?;
        let t2 = Word::add(&[s0, maj], backend)?;

        hh = g;
        g = f;
        f = e;
        e = Word::add(&[d, t1], backend)?;
        d = c;
        c = b;
        b = a;
        a = Word::add(&[t1, t2], backend)?;
    }

    Ok([a, b, c, d, e, f, g, hh])
}

/// Runs the full single-block compression starting from [`H256_INIT`] and
/// folds the working variables back into the state, as FIPS 180-4 requires.
pub fn hash_block(block: &[Word<32>; 16], rounds: usize, backend: &mut impl Backend) -> Result<[Word<32>; 8]> {
    let h: [Word<32>; 8] = std::array::from_fn(|i| Word::from_value(H256_INIT[i] as u64));
    let schedule = message_schedule(block, rounds, backend)?;
    let worked = compress(&h, &schedule, rounds, backend)?;
    let mut out = [Word::from_unassigned(); 8];
    for i in 0..8 {
        out[i] = Word::add(&[h[i], worked[i]], backend)?;
    }
    Ok(out)
}

/// Like [`hash_block`], but also returns the eight-word working state after
/// every round (`trace[t]` is `[a, b, c, d, e, f, g, h]` as it stood right
/// after round `t`), so a driver can bind that state to a named variable
/// the way it binds `M`/`H`.
pub fn hash_block_traced(
    block: &[Word<32>; 16],
    rounds: usize,
    backend: &mut impl Backend,
) -> Result<([Word<32>; 8], Vec<[Word<32>; 8]>, Vec<Word<32>>)> {
    let h: [Word<32>; 8] = std::array::from_fn(|i| Word::from_value(H256_INIT[i] as u64));
    let schedule = message_schedule(block, rounds, backend)?;
    let rounds = rounds.min(ROUNDS).min(schedule.len());
    let mut trace = Vec::with_capacity(rounds);
    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut hh] = h;

    for t in 0..rounds {
        let s1 = big_sigma1(&e, backend)?;
        let ch = e.ch(&f, &g, backend)?;
        let k_t: Word<32> = Word::from_value(K256[t] as u64);
        let t1 = Word::add(&[hh, s1, ch, k_t, schedule[t]], backend)?;
        let s0 = big_sigma0(&a, backend)?;
        let maj = a.maj(&b, &c, backend)?;
        let t2 = Word::add(&[s0, maj], backend)?;

        hh = g;
        g = f;
        f = e;
        e = Word::add(&[d, t1], backend)?;
        d = c;
        c = b;
        b = a;
        a = Word::add(&[t1, t2], backend)?;
        trace.push([a, b, c, d, e, f, g, hh]);
    }

    let worked = [a, b, c, d, e, f, g, hh];
    let mut out = [Word::from_unassigned(); 8];
    for i in 0..8 {
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
    use sha2::{Digest, Sha256};

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

        let mut expected_bytes = [0u8; 32];
        expected_bytes.copy_from_slice(&Sha256::digest(message));
        for i in 0..8 {
            let expected = u32::from_be_bytes(expected_bytes[i * 4..i * 4 + 4].try_into().unwrap());
            assert_eq!(digest[i].as_value(), Some(expected as u64), "word {i}");
        }
    }

    #[test]
    fn matches_reference_implementation_at_max_single_block_length() {
        let message = [0x5Au8; 55]; // longest message that still fits one block
        let mut backend = ConcreteBackend::new();
        let block = concrete_block(&message);
        let digest = hash_block(&block, ROUNDS, &mut backend).unwrap();

        let mut expected_bytes = [0u8; 32];
        expected_bytes.copy_from_slice(&Sha256::digest(message));
        for i in 0..8 {
            let expected = u32::from_be_bytes(expected_bytes[i * 4..i * 4 + 4].try_into().unwrap());
            assert_eq!(digest[i].as_value(), Some(expected as u64), "word {i}");
        }
    }
}
