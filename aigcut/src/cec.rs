use tracing::warn;

use crate::aig::Aig;
use crate::error::{Error, Result};

/// A combinational equivalence check between two networks.
///
/// The pipeline only restructures; a failed check after a round means a
/// boundary or reinsertion bug, so callers should treat `Ok(false)` as
/// fatal.
pub trait EquivalenceChecker {
    /// True if both networks compute the same outputs for every input
    /// assignment.
    fn check(&self, a: &Aig, b: &Aig) -> Result<bool>;
}

/// Brute-force equivalence by simulating every input assignment.
///
/// Only usable on small networks; anything wider than `max_inputs` is
/// refused rather than silently taking forever.
#[derive(Clone, Copy, Debug)]
pub struct ExhaustiveChecker {
    /// The widest network the checker will simulate.
    pub max_inputs: usize,
}

impl Default for ExhaustiveChecker {
    fn default() -> Self {
        Self { max_inputs: 16 }
    }
}

impl EquivalenceChecker for ExhaustiveChecker {
    fn check(&self, a: &Aig, b: &Aig) -> Result<bool> {
        if a.num_pis() != b.num_pis() || a.num_pos() != b.num_pos() {
            warn!(
                a_pis = a.num_pis(),
                b_pis = b.num_pis(),
                a_pos = a.num_pos(),
                b_pos = b.num_pos(),
                "interface mismatch"
            );
            return Ok(false);
        }
        if a.num_pis() > self.max_inputs {
            return Err(Error::Unsupported("too many inputs for exhaustive simulation"));
        }
        for pattern in 0_u64..1 << a.num_pis() {
            let inputs: Vec<bool> = (0..a.num_pis()).map(|bit| pattern >> bit & 1 == 1).collect();
            if a.evaluate(&inputs) != b.evaluate(&inputs) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
