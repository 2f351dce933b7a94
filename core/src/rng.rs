//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! All randomness flows through streams derived from the single
//! master seed stored on the EngineConfig.
//!
//! Each k-means fit gets its own stream, seeded deterministically
//! from (master_seed XOR mixed cluster count). This means:
//!   - The elbow fit for k and the final fit for the same k are identical.
//!   - Changing the elbow range never changes another k's stream.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// All k-means RNG streams for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream for a k-means fit with `k` clusters.
    pub fn for_cluster_count(&self, k: usize) -> Pcg64Mcg {
        let derived_seed = self.master_seed ^ (k as u64).wrapping_mul(SEED_MIX);
        Pcg64Mcg::seed_from_u64(derived_seed)
    }
}
