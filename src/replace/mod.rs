pub mod lfu;
pub mod lru;
pub mod random;

use serde::Deserialize;

use crate::cache::Block;

/// Which replacement policy a cache is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[serde(alias = "LRU")]
    Lru,
    #[serde(alias = "LFU")]
    Lfu,
    #[serde(alias = "RANDOM")]
    Random,
}

/// Keeps per-block replacement metadata and picks victims.
///
/// `now` is the cache's logical clock, advanced once per access.
pub trait Replace {
    /// A resident block was hit.
    fn touch(&mut self, block: &mut Block, now: u64);
    /// A block was just (re)loaded with a new line.
    fn fill(&mut self, block: &mut Block, now: u64);
    /// Picks the way to replace in `set`. `set` is never empty.
    fn victim(&mut self, set: &[Block]) -> usize;
}
