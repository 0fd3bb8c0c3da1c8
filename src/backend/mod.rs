//! The [`Backend`] trait: the single contract both formula sinks (CNF, ANF)
//! and the concrete reference evaluator implement. `Word` (see
//! [`crate::word`]) is generic over any `impl Backend`, so the exact same
//! round-function code drives clause emission, term emission, or a plain
//! bit computation depending on which backend it is handed.

pub mod anf;
pub mod cnf;
pub mod concrete;

use crate::error::{Error, Result};
use crate::literal::Literal;

/// Result of an N-ary addition batch: the sum bit, the first-level carry
/// into the next bit position, and — when the batch's maximum representable
/// value needed it — a second-level carry into the position after that.
#[derive(Debug, Clone, Copy)]
pub struct AddOutput {
    pub sum: Literal,
    pub c1: Literal,
    pub c2: Option<Literal>,
}

/// A sink for the elementary boolean/arithmetic operations a symbolic
/// [`crate::word::Word`] performs while a hash algorithm runs over it.
pub trait Backend {
    /// Allocates a fresh, unconstrained variable. Used by the encoder driver
    /// to fill in message bits the caller left unassigned.
    fn fresh(&mut self) -> Result<Literal>;
    fn not(&mut self, x: Literal) -> Literal;
    fn and(&mut self, x: Literal, y: Literal) -> Result<Literal>;
    fn or(&mut self, x: Literal, y: Literal) -> Result<Literal>;
    /// `args.len() >= 1`; results in the XOR of all operands, batched
    /// internally according to [`Backend::xor_max_args`].
    fn xor(&mut self, args: &[Literal]) -> Result<Literal>;
    fn ch(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal>;
    fn maj(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal>;
    /// One batch of N-ary addition: `args.len()` in `2..=6`. `constant_bit`
    /// folds in a known-constant addend for this position; `want_c2`
    /// requests the second-level carry output.
    fn add(&mut self, args: &[Literal], constant_bit: bool, want_c2: bool) -> Result<AddOutput>;

    /// Maximum operand count `xor` will batch internally before chaining.
    fn xor_max_args(&self) -> usize {
        3
    }
    /// Maximum operand count `add` will batch per call.
    fn add_max_args(&self) -> usize {
        6
    }
}
