use serde::Deserialize;

use crate::{
    cache::Block,
    memory::{Address, Memory, TransferUnit, Word},
};

/// When cached writes reach the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Writes stay in the cache until the line is evicted. Allocates on write.
    #[serde(alias = "WRITE_BACK")]
    WriteBack,
    /// Every write reaches memory at once. Write misses do not allocate.
    #[serde(alias = "WRITE_THROUGH")]
    WriteThrough,
}

impl SyncPolicy {
    /// Stores `word` at `at` in a resident line whose base address is `base`.
    pub fn write_hit(
        self,
        mem: &mut dyn Memory,
        block: &mut Block,
        base: Address,
        unit: TransferUnit,
        at: usize,
        word: Word,
    ) {
        block.write_word(at, word);
        block.valid = true;
        match self {
            SyncPolicy::WriteBack => block.dirty = true,
            SyncPolicy::WriteThrough => {
                mem.write(base, unit, &block.data);
                block.dirty = false;
            }
        }
    }

    /// Flushes a victim that is about to be overwritten. Returns true if memory was written.
    pub fn write_back_victim(
        self,
        mem: &mut dyn Memory,
        victim: &mut Block,
        old_base: Address,
        unit: TransferUnit,
    ) -> bool {
        if self != SyncPolicy::WriteBack || !victim.dirty {
            return false;
        }
        mem.write(old_base, unit, &victim.data);
        victim.dirty = false;
        true
    }

    /// Handles a write to a line that is not resident.
    ///
    /// Returns true when the line was installed in `victim`. Under write-through
    /// only the word itself goes to memory and `victim` is left alone.
    #[allow(clippy::too_many_arguments)]
    pub fn write_miss(
        self,
        mem: &mut dyn Memory,
        victim: &mut Block,
        base: Address,
        unit: TransferUnit,
        tag: Address,
        at: usize,
        word: Word,
    ) -> bool {
        match self {
            SyncPolicy::WriteBack => {
                victim.fill(mem, base, unit, tag);
                victim.write_word(at, word);
                victim.dirty = true;
                true
            }
            SyncPolicy::WriteThrough => {
                mem.write(
                    base.wrapping_add(at as Address),
                    TransferUnit::Word,
                    &word.to_le_bytes(),
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingMemory;

    const UNIT: TransferUnit = TransferUnit::DoubleWord;

    fn resident(tag: Address) -> Block {
        let mut mem = RecordingMemory::new();
        let mut block = crate::test_utils::empty_block(8);
        block.fill(&mut mem, 0, UNIT, tag);
        block
    }

    #[test]
    fn write_back_hit_marks_dirty() {
        let mut mem = RecordingMemory::new();
        let mut block = resident(1);
        SyncPolicy::WriteBack.write_hit(&mut mem, &mut block, 0x8, UNIT, 4, 3);
        assert!(block.dirty);
        assert_eq!(block.read_word(4), 3);
        assert!(mem.writes.is_empty());
    }

    #[test]
    fn write_through_hit_is_clean() {
        let mut mem = RecordingMemory::new();
        let mut block = resident(1);
        block.dirty = true;
        SyncPolicy::WriteThrough.write_hit(&mut mem, &mut block, 0x8, UNIT, 0, 3);
        assert!(!block.dirty);
        assert_eq!(mem.writes, vec![(0x8, vec![3, 0, 0, 0, 0, 0, 0, 0])]);
    }

    #[test]
    fn only_dirty_write_back_victims_flush() {
        let mut mem = RecordingMemory::new();
        let mut block = resident(1);
        assert!(!SyncPolicy::WriteBack.write_back_victim(&mut mem, &mut block, 0x8, UNIT));

        block.dirty = true;
        assert!(!SyncPolicy::WriteThrough.write_back_victim(&mut mem, &mut block, 0x8, UNIT));
        assert!(mem.writes.is_empty());

        assert!(SyncPolicy::WriteBack.write_back_victim(&mut mem, &mut block, 0x8, UNIT));
        assert_eq!(mem.writes.len(), 1);
        assert!(!block.dirty);
    }

    #[test]
    fn write_through_miss_leaves_victim() {
        let mut mem = RecordingMemory::new();
        let mut block = resident(5);
        let before = block.clone();
        let installed = SyncPolicy::WriteThrough.write_miss(
            &mut mem,
            &mut block,
            0x40,
            UNIT,
            8,
            4,
            0x77,
        );
        assert!(!installed);
        assert_eq!(block, before);
        assert_eq!(mem.writes, vec![(0x44, 0x77u32.to_le_bytes().to_vec())]);
    }

    #[test]
    fn sync_policy_names() {
        let p: SyncPolicy = serde_json::from_str("\"write_back\"").unwrap();
        assert_eq!(p, SyncPolicy::WriteBack);
        let p: SyncPolicy = serde_json::from_str("\"WRITE_THROUGH\"").unwrap();
        assert_eq!(p, SyncPolicy::WriteThrough);
    }
}
