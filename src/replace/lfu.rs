use crate::cache::Block;

use super::Replace;

/// Evicts the block with the fewest hits since it was loaded.
///
/// Equal counts fall back to recency, oldest first, then to way order.
#[derive(Debug, Default)]
pub struct Lfu {}

impl Lfu {
    pub fn new() -> Self {
        Lfu {}
    }
}

impl Replace for Lfu {
    fn touch(&mut self, block: &mut Block, now: u64) {
        block.access_count = block.access_count.saturating_add(1);
        block.recency = now;
    }

    fn fill(&mut self, block: &mut Block, now: u64) {
        block.access_count = 0;
        block.recency = now;
    }

    fn victim(&mut self, set: &[Block]) -> usize {
        set.iter()
            .enumerate()
            .min_by_key(|(_way, b)| (b.access_count, b.recency))
            .map_or(0, |(way, _b)| way)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::empty_block;

    fn set_with(meta: &[(u32, u64)]) -> Vec<Block> {
        meta.iter()
            .map(|&(count, recency)| {
                let mut b = empty_block(4);
                b.access_count = count;
                b.recency = recency;
                b
            })
            .collect()
    }

    #[test]
    fn picks_least_used() {
        assert_eq!(Lfu::new().victim(&set_with(&[(3, 1), (1, 9), (2, 2)])), 1);
    }

    #[test]
    fn ties_go_to_older_block() {
        assert_eq!(Lfu::new().victim(&set_with(&[(1, 8), (1, 4), (5, 1)])), 1);
        assert_eq!(Lfu::new().victim(&set_with(&[(0, 0), (0, 0)])), 0);
    }

    #[test]
    fn fill_resets_count() {
        let mut lfu = Lfu::new();
        let mut block = empty_block(4);
        lfu.touch(&mut block, 1);
        lfu.touch(&mut block, 2);
        assert_eq!(block.access_count, 2);
        lfu.fill(&mut block, 3);
        assert_eq!(block.access_count, 0);
        assert_eq!(block.recency, 3);
    }
}
