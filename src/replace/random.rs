use crate::cache::Block;

use super::Replace;

/// Evicts a uniformly random way.
///
/// Victims ignore metadata, but hits are still counted in `access_count` so
/// the counter display stays meaningful.
pub struct Random {
    rng: fastrand::Rng,
}

impl Random {
    pub fn new(seed: Option<u64>) -> Self {
        Random {
            rng: seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
        }
    }
}

impl std::fmt::Debug for Random {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Random").finish_non_exhaustive()
    }
}

impl Replace for Random {
    fn touch(&mut self, block: &mut Block, _now: u64) {
        block.access_count = block.access_count.saturating_add(1);
    }

    fn fill(&mut self, block: &mut Block, _now: u64) {
        block.access_count = 0;
    }

    fn victim(&mut self, set: &[Block]) -> usize {
        self.rng.usize(0..set.len())
    }
}
