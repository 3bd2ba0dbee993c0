use std::{iter, ops::Range};

use log::debug;
use serde::Serialize;

use crate::{
    error::ConfigError,
    memory::{Address, Memory, TransferUnit, Word, WORD_SIZE},
    replace::Replace,
    visual::Visualize,
    write::SyncPolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: usize,
    pub set: usize,
    pub tag: Address,
}

#[derive(Debug)]
pub struct BitSection {
    shift: u32,
    mask: Address,
}

impl BitSection {
    fn apply(&self, num: Address) -> Address {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write(Word),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
    /// No cache configured, the backing store served the access.
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub result: AccessResult,
    /// The word read, or the word that was written.
    pub data: Word,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub name: String,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub write_backs: u64,
    pub bypassed: u64,
    pub miss_rate: f64,
}

#[derive(Debug)]
pub struct Cache<R: Replace> {
    name: String,
    pub blocks: Vec<Block>,
    pub n_ways: usize,
    pub n_sets: usize,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
    unit: TransferUnit,
    sync: SyncPolicy,
    pub repl: R,
    // Logical time, advanced once per cached access.
    clock: u64,

    // Stats
    reads: u64,
    writes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    write_backs: u64,
    bypassed: u64,
}

impl<R: Replace> Cache<R> {
    pub fn new(
        name: String,
        block_size: usize,
        n_sets: usize,
        n_ways: usize,
        sync: SyncPolicy,
        repl: R,
    ) -> Result<Self, ConfigError> {
        // Without ways every access bypasses the cache and the geometry is never used.
        let (line_size, index_sets) = if n_ways == 0 {
            (WORD_SIZE, 1)
        } else {
            (block_size, n_sets)
        };

        let unit = TransferUnit::try_from(line_size)?;
        let offset_sec = BitSection {
            shift: 0,
            mask: (line_size - 1) as Address,
        };

        if !index_sets.is_power_of_two() {
            return Err(ConfigError::SetCountNotPowerOfTwo(n_sets));
        }
        let set_shift = line_size.ilog2();
        let set_sec = BitSection {
            shift: set_shift,
            mask: (index_sets - 1) as Address,
        };

        let tag_shift = index_sets.ilog2() + set_shift;
        let tag_sec = BitSection {
            shift: tag_shift,
            mask: Address::MAX,
        };

        Ok(Cache {
            name,
            blocks: iter::repeat_with(|| Block::new(line_size))
                .take(n_sets * n_ways)
                .collect(),
            n_ways,
            n_sets,
            offset_sec,
            set_sec,
            tag_sec,
            unit,
            sync,
            repl,
            clock: 0,
            reads: 0,
            writes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            write_backs: 0,
            bypassed: 0,
        })
    }

    /// Finds the way holding `tag` in `set`, if any.
    pub fn lookup(&self, set: usize, tag: Address) -> Option<usize> {
        self.blocks[self.get_set(set)]
            .iter()
            .position(|b| b.valid && b.tag == tag)
    }

    /// Rebuilds the base address of the line `tag` would occupy in `set`.
    fn line_base(&self, tag: Address, set: usize) -> Address {
        tag.checked_shl(self.tag_sec.shift).unwrap_or(0)
            | (set as Address) << self.set_sec.shift
    }

    fn bypass(&mut self, mem: &mut dyn Memory, addr: Address, op: Op) -> Access {
        self.bypassed += 1;
        let data = match op {
            Op::Read => {
                self.reads += 1;
                let mut buf = [0u8; WORD_SIZE];
                mem.read(addr, TransferUnit::Word, &mut buf);
                Word::from_le_bytes(buf)
            }
            Op::Write(word) => {
                self.writes += 1;
                mem.write(addr, TransferUnit::Word, &word.to_le_bytes());
                word
            }
        };
        Access {
            result: AccessResult::Bypass,
            data,
        }
    }

    fn hit(
        &mut self,
        mem: &mut dyn Memory,
        vis: &mut dyn Visualize,
        addr: Addr,
        way: usize,
        op: Op,
    ) -> Access {
        self.hits += 1;
        let base = self.line_base(addr.tag, addr.set);
        let at = word_offset(addr.offset);
        let block = &mut self.blocks[addr.set * self.n_ways + way];
        self.repl.touch(block, self.clock);
        vis.hit(addr.set, way, addr.offset);

        let data = match op {
            Op::Read => block.read_word(at),
            Op::Write(word) => {
                self.sync.write_hit(mem, block, base, self.unit, at, word);
                word
            }
        };
        Access {
            result: AccessResult::Hit,
            data,
        }
    }

    fn miss(
        &mut self,
        mem: &mut dyn Memory,
        vis: &mut dyn Visualize,
        addr: Addr,
        op: Op,
    ) -> Access {
        self.misses += 1;
        let set_range = self.get_set(addr.set);
        let way = self.repl.victim(&self.blocks[set_range.clone()]);
        vis.miss_victim(addr.set, way);
        vis.miss_offset(addr.set, way, addr.offset);

        let base = self.line_base(addr.tag, addr.set);
        let old_base = self.line_base(self.blocks[set_range.start + way].tag, addr.set);
        let at = word_offset(addr.offset);
        let block = &mut self.blocks[set_range.start + way];
        let was_valid = block.valid;

        if self.sync.write_back_victim(mem, block, old_base, self.unit) {
            debug!(
                "{}: wrote back dirty line {old_base:#010x} from set {} way {way}",
                self.name, addr.set
            );
            self.write_backs += 1;
        }

        let (installed, data) = match op {
            Op::Read => {
                block.fill(mem, base, self.unit, addr.tag);
                (true, block.read_word(at))
            }
            Op::Write(word) => {
                let installed = self
                    .sync
                    .write_miss(mem, block, base, self.unit, addr.tag, at, word);
                (installed, word)
            }
        };

        if installed {
            self.repl.fill(block, self.clock);
            if was_valid {
                self.evictions += 1;
            }
        } else {
            self.bypassed += 1;
        }
        Access {
            result: AccessResult::Miss,
            data,
        }
    }
}

/// Word-aligned position of the accessed word inside its line.
fn word_offset(offset: usize) -> usize {
    offset & !(WORD_SIZE - 1)
}

pub trait IsCache {
    /// Performs one word access against the cache and its backing store.
    fn access(
        &mut self,
        mem: &mut dyn Memory,
        vis: &mut dyn Visualize,
        addr: Address,
        op: Op,
    ) -> Access;
    fn split_addr(&self, addr: Address) -> Addr;
    fn get_set(&self, set: usize) -> Range<usize>;
    fn n_sets(&self) -> usize;
    fn n_ways(&self) -> usize;
    fn block(&self, set: usize, way: usize) -> &Block;
    fn clear_stats(&mut self);
    fn make_stats(&self) -> CacheStats;

    fn lru_to_string(&self, set: usize, way: usize) -> String {
        self.block(set, way).recency.to_string()
    }

    fn lfu_to_string(&self, set: usize, way: usize) -> String {
        self.block(set, way).access_count.to_string()
    }
}

impl<R: Replace> IsCache for Cache<R> {
    fn access(
        &mut self,
        mem: &mut dyn Memory,
        vis: &mut dyn Visualize,
        addr: Address,
        op: Op,
    ) -> Access {
        if self.n_ways == 0 {
            return self.bypass(mem, addr, op);
        }
        self.clock += 1;
        match op {
            Op::Read => self.reads += 1,
            Op::Write(_) => self.writes += 1,
        }

        let split = self.split_addr(addr);
        match self.lookup(split.set, split.tag) {
            Some(way) => self.hit(mem, vis, split, way, op),
            None => self.miss(mem, vis, split, op),
        }
    }

    fn split_addr(&self, addr: Address) -> Addr {
        let offset = self.offset_sec.apply(addr) as usize;
        let set = self.set_sec.apply(addr) as usize;
        let tag = self.tag_sec.apply(addr);
        Addr { offset, set, tag }
    }

    fn get_set(&self, set: usize) -> Range<usize> {
        set * self.n_ways..(set + 1) * self.n_ways
    }

    fn n_sets(&self) -> usize {
        self.n_sets
    }

    fn n_ways(&self) -> usize {
        self.n_ways
    }

    fn block(&self, set: usize, way: usize) -> &Block {
        &self.blocks[self.get_set(set)][way]
    }

    fn clear_stats(&mut self) {
        self.reads = 0;
        self.writes = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
        self.write_backs = 0;
        self.bypassed = 0;
    }

    fn make_stats(&self) -> CacheStats {
        let total_access = (self.hits + self.misses) as f64;
        let miss_rate = if total_access > 0.0 {
            self.misses as f64 / total_access
        } else {
            0.0
        };

        CacheStats {
            name: self.name.clone(),
            reads: self.reads,
            writes: self.writes,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            write_backs: self.write_backs,
            bypassed: self.bypassed,
            miss_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    pub dirty: bool,
    pub tag: Address,
    pub data: Box<[u8]>,

    // Replace Data
    pub recency: u64,
    pub access_count: u32,
}

impl Block {
    pub fn new(block_size: usize) -> Self {
        Block {
            valid: false,
            dirty: false,
            tag: 0,
            data: vec![0; block_size].into_boxed_slice(),
            recency: 0,
            access_count: 0,
        }
    }

    /// Loads the line at `base` and makes it resident and clean under `tag`.
    pub fn fill(
        &mut self,
        mem: &mut dyn Memory,
        base: Address,
        unit: TransferUnit,
        tag: Address,
    ) {
        mem.read(base, unit, &mut self.data);
        self.valid = true;
        self.dirty = false;
        self.tag = tag;
    }

    pub fn read_word(&self, at: usize) -> Word {
        let mut bytes = [0u8; WORD_SIZE];
        bytes.copy_from_slice(&self.data[at..at + WORD_SIZE]);
        Word::from_le_bytes(bytes)
    }

    pub fn write_word(&mut self, at: usize, word: Word) {
        self.data[at..at + WORD_SIZE].copy_from_slice(&word.to_le_bytes());
    }
}
