//! Integration-level property tests over the public API: clause-store
//! invariants, optimizer semantics, and end-to-end encode/optimize/write
//! round trips. Complements the per-module `#[cfg(test)]` unit tests, which
//! exercise the same invariants against private internals.

use hashcnf::backend::anf::AnfBackend;
use hashcnf::backend::cnf::CnfBackend;
use hashcnf::encoder::{self, Algorithm};
use hashcnf::io::{self, Parameters};
use hashcnf::literal::Literal;
use hashcnf::optimizer::{self, Mode, Outcome};
use hashcnf::store::ClauseStore;

/// Property 1: after any sequence of appends, no two stored records carry
/// the same (sorted) literal sequence.
#[test]
fn clause_uniqueness_holds_after_many_appends() {
    let mut s = ClauseStore::new();
    let pairs = [(1, 2), (1, 3), (2, 3), (1, 2), (1, 4), (2, 3), (3, 4)];
    for &(a, b) in &pairs {
        s.add_clause(&[Literal::var(a), Literal::var(b)]).unwrap();
    }
    let mut seen = std::collections::HashSet::new();
    for clause in s.clauses() {
        let key: Vec<u32> = clause.sort_key().to_vec();
        assert!(seen.insert(key), "duplicate stored literal sequence");
    }
}

/// Property 2: expanding an aggregated record's flags into its individual
/// clauses and reinserting them all reproduces the same flag set.
#[test]
fn aggregate_promotion_round_trips() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1), Literal::var(2).negate()]).unwrap();
    assert_eq!(s.clauses().len(), 1);
    let original_flags = s.clause(0).aggregate_flags;
    let expanded = s.clause(0).expand_all();
    assert_eq!(expanded.len(), original_flags.count_ones() as usize);

    let mut rebuilt = ClauseStore::new();
    for clause in &expanded {
        rebuilt.add_clause(clause).unwrap();
    }
    assert_eq!(rebuilt.clauses().len(), 1);
    assert_eq!(rebuilt.clause(0).aggregate_flags, original_flags);
}

/// Property 4: once a variable is assigned a constant, it never changes —
/// assigning it again to the same constant is a no-op and the live store
/// never mentions it in a surviving clause.
#[test]
fn assignment_monotonicity_holds_across_propagation() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1)]).unwrap();
    optimizer::optimize(&mut s, Mode::All).unwrap();
    assert_eq!(s.assignment()[1], Literal::TRUE);
    assert_eq!(s.assignment()[2], Literal::TRUE);

    // Re-running leaves the constants exactly as they were.
    optimizer::optimize(&mut s, Mode::All).unwrap();
    assert_eq!(s.assignment()[1], Literal::TRUE);
    assert_eq!(s.assignment()[2], Literal::TRUE);
}

/// Property 6: `begin; add clauses; rollback` restores the store's
/// committed clause sequence exactly (clause order is append-only, so
/// "modulo AVL balance permutation" collapses to plain equality here).
#[test]
fn transaction_rollback_restores_committed_clauses() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(0), Literal::var(1)]).unwrap();
    s.add_clause(&[Literal::var(2), Literal::var(3)]).unwrap();
    let before: Vec<_> = s.clauses().to_vec();

    s.begin();
    s.add_clause(&[Literal::var(4), Literal::var(5)]).unwrap();
    s.add_clause(&[Literal::var(0).negate(), Literal::var(6)]).unwrap();
    s.rollback();

    assert_eq!(s.clauses(), before.as_slice());
}

/// S3: a binary clause subsumes a ternary superset clause over the same
/// sign-compatible literals.
#[test]
fn binary_clause_subsumes_ternary_superset() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1), Literal::var(2), Literal::var(3)]).unwrap();
    optimizer::optimize(&mut s, Mode::All).unwrap();
    let live = optimizer::live_variable_sets(&s);
    assert!(!live.iter().any(|vars| vars == &vec![1, 2, 3]));
}

/// S4: a chain of implications plus a fact propagates fully.
#[test]
fn unit_propagation_chain_assigns_every_variable() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(2).negate(), Literal::var(3)]).unwrap();
    s.add_clause(&[Literal::var(1)]).unwrap();
    let outcome = optimizer::optimize(&mut s, Mode::All).unwrap();
    assert_eq!(outcome, Outcome::Satisfiable);
    for v in 1..=3 {
        assert_eq!(s.assignment()[v], Literal::TRUE);
    }
}

/// S5: all four sign combinations over the same two variables is a
/// contradiction, reported at append time (the aggregate flags would cover
/// every combination).
#[test]
fn all_sign_combinations_over_two_variables_conflict() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1), Literal::var(2).negate()]).unwrap();
    let result = s.add_clause(&[Literal::var(1).negate(), Literal::var(2).negate()]);
    assert!(matches!(result, Err(hashcnf::Error::Conflict(_))));
}

/// S1: the very first clause appended to an empty store is a unit clause.
#[test]
fn first_clause_into_empty_store_is_a_unit() {
    let mut s = ClauseStore::new();
    assert_eq!(s.clauses().len(), 0);
    s.add_clause(&[Literal::var(0)]).unwrap();
    assert_eq!(s.live_clause_count(), 1);
}

/// S2: two binary clauses over the same variables merge into one aggregate
/// record with both sign combinations set, rather than two stored records.
#[test]
fn two_compatible_binary_clauses_merge_into_one_aggregate() {
    let mut s = ClauseStore::new();
    s.add_clause(&[Literal::var(1), Literal::var(2)]).unwrap();
    s.add_clause(&[Literal::var(1).negate(), Literal::var(2)]).unwrap();
    assert_eq!(s.clauses().len(), 1);
    assert_eq!(s.clause(0).aggregate_flags.count_ones(), 2);
}

/// End-to-end: encoding SHA-256 over a CNF backend, binding the message to
/// concrete constants, and optimizing propagates every circuit bit down to
/// a constant matching the reference implementation's digest.
#[test]
fn sha256_cnf_pipeline_matches_reference_digest() {
    sha_pipeline_matches_reference(Algorithm::Sha256, b"abc", &sha2::Sha256::digest(b"abc"));
}

/// Same end-to-end check for SHA-1.
#[test]
fn sha1_cnf_pipeline_matches_reference_digest() {
    sha_pipeline_matches_reference(Algorithm::Sha1, b"abc", &sha1::Sha1::digest(b"abc"));
}

use sha1::Digest as _;
use sha2::Digest as _;

fn sha_pipeline_matches_reference(algorithm: Algorithm, message: &[u8], expected_digest: &[u8]) {
    let mut message_bits: Vec<Literal> = message
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| Literal::constant((byte >> i) & 1 == 1)))
        .collect();

    let mut backend = CnfBackend::new(6, 3);
    let bindings = encoder::encode(algorithm, algorithm.max_rounds(), &mut message_bits, &mut backend).unwrap();

    let outcome = optimizer::optimize(&mut backend.store, Mode::Original).unwrap();
    assert_eq!(outcome, Outcome::Satisfiable);

    let h_bits = &bindings.vars["H"];
    let mut bytes = Vec::with_capacity(h_bits.len() / 8);
    for chunk in h_bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &lit) in chunk.iter().enumerate() {
            let resolved = backend.store.resolve(lit);
            assert!(resolved.is_constant(), "H bit {i} did not resolve to a constant after optimizing");
            byte = (byte << 1) | resolved.value() as u8;
        }
        bytes.push(byte);
    }
    assert_eq!(bytes, expected_digest, "CNF-derived digest does not match reference implementation");
}

/// A reindexed, DIMACS-written-and-read-back CNF formula with `M` bound
/// still resolves `H` to the reference digest, exercising reindexing and
/// the text codec together with the optimizer.
#[test]
fn dimacs_round_trip_preserves_satisfying_assignment() {
    let message = b"abc";
    let mut message_bits: Vec<Literal> = message
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| Literal::constant((byte >> i) & 1 == 1)))
        .collect();

    let mut backend = CnfBackend::new(6, 3);
    let mut bindings = encoder::encode(Algorithm::Sha256, Algorithm::Sha256.max_rounds(), &mut message_bits, &mut backend).unwrap();
    optimizer::optimize(&mut backend.store, Mode::Original).unwrap();

    let named_slices: Vec<&[Literal]> = bindings.vars.values().map(|v| v.as_slice()).collect();
    let map = optimizer::build_reindex(&backend.store, &named_slices);
    let mut reduced = optimizer::apply_to_store(&mut backend.store, &map);
    if map.new_variable_count() > 0 {
        reduced.ensure_variable(map.new_variable_count() - 1);
    }
    for literals in bindings.vars.values_mut() {
        *literals = optimizer::apply_to_binding(literals.as_slice(), &map);
    }

    let mut buf = Vec::new();
    io::dimacs::write(&mut buf, &reduced, &bindings, &Parameters::new()).unwrap();

    let mut cursor = std::io::Cursor::new(buf);
    let parsed = io::dimacs::read(&mut cursor).unwrap();

    let h_bits = &parsed.bindings.vars["H"];
    let expected = sha2::Sha256::digest(message);
    let mut bytes = Vec::with_capacity(h_bits.len() / 8);
    for chunk in h_bits.chunks(8) {
        let mut byte = 0u8;
        for &lit in chunk {
            let resolved = parsed.store.resolve(lit);
            assert!(resolved.is_constant());
            byte = (byte << 1) | resolved.value() as u8;
        }
        bytes.push(byte);
    }
    assert_eq!(bytes, expected.as_slice());
}

/// The ANF backend folds a fully-constant message down to a concrete `H`
/// the same way the CNF backend does, since every primitive short-circuits
/// on constant operands before it ever allocates an equation variable.
#[test]
fn sha1_anf_pipeline_folds_to_reference_digest() {
    let message = b"abc";
    let mut message_bits: Vec<Literal> = message
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| Literal::constant((byte >> i) & 1 == 1)))
        .collect();

    let mut backend = AnfBackend::new(6, 3);
    let bindings =
        encoder::encode(Algorithm::Sha1, Algorithm::Sha1.max_rounds(), &mut message_bits, &mut backend).unwrap();

    let h_bits = &bindings.vars["H"];
    let expected = sha1::Sha1::digest(message);
    let mut bytes = Vec::with_capacity(h_bits.len() / 8);
    for chunk in h_bits.chunks(8) {
        let mut byte = 0u8;
        for &lit in chunk {
            assert!(lit.is_constant(), "H bit should have folded to a constant for an all-constant message");
            byte = (byte << 1) | lit.value() as u8;
        }
        bytes.push(byte);
    }
    assert_eq!(bytes, expected.as_slice());
}
