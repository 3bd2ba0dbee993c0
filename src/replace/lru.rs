use crate::cache::Block;

use super::Replace;

/// Evicts the block touched longest ago.
///
/// `recency` holds the clock value of the last touch, so never-used ways (0)
/// are always picked before anything resident.
#[derive(Debug, Default)]
pub struct Lru {}

impl Lru {
    pub fn new() -> Self {
        Lru {}
    }
}

impl Replace for Lru {
    fn touch(&mut self, block: &mut Block, now: u64) {
        block.recency = now;
    }

    fn fill(&mut self, block: &mut Block, now: u64) {
        block.recency = now;
    }

    fn victim(&mut self, set: &[Block]) -> usize {
        set.iter()
            .enumerate()
            .min_by_key(|(_way, b)| b.recency)
            .map_or(0, |(way, _b)| way)
    }
}
