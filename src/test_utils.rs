use crate::{
    cache::Block,
    memory::{Address, Dram, Memory, TransferUnit, Word},
    visual::Visualize,
};

pub fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
}

pub fn proptest_cases(default: u32) -> u32 {
    env_u32("PROPTEST_CASES").unwrap_or(default)
}

pub fn empty_block(block_size: usize) -> Block {
    Block::new(block_size)
}

/// DRAM that also remembers every transfer, in order.
#[derive(Default)]
pub struct RecordingMemory {
    pub dram: Dram,
    pub reads: Vec<(Address, usize)>,
    pub writes: Vec<(Address, Vec<u8>)>,
}

impl RecordingMemory {
    pub fn new() -> Self {
        RecordingMemory::default()
    }

    pub fn poke_word(&mut self, addr: Address, word: Word) {
        self.dram.write(addr, TransferUnit::Word, &word.to_le_bytes());
    }

    pub fn peek_word(&self, addr: Address) -> Word {
        self.dram.peek_word(addr)
    }
}

impl Memory for RecordingMemory {
    fn read(&mut self, addr: Address, unit: TransferUnit, buf: &mut [u8]) {
        self.reads.push((addr, buf.len()));
        self.dram.read(addr, unit, buf);
    }

    fn write(&mut self, addr: Address, unit: TransferUnit, buf: &[u8]) {
        self.writes.push((addr, buf.to_vec()));
        self.dram.write(addr, unit, buf);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEvent {
    Hit { index: usize, way: usize, offset: usize },
    MissVictim { index: usize, way: usize },
    MissOffset { index: usize, way: usize, offset: usize },
}

#[derive(Default)]
pub struct RecordingVisuals {
    pub events: Vec<VisualEvent>,
}

impl Visualize for RecordingVisuals {
    fn hit(&mut self, index: usize, way: usize, offset: usize) {
        self.events.push(VisualEvent::Hit { index, way, offset });
    }

    fn miss_victim(&mut self, index: usize, way: usize) {
        self.events.push(VisualEvent::MissVictim { index, way });
    }

    fn miss_offset(&mut self, index: usize, way: usize, offset: usize) {
        self.events.push(VisualEvent::MissOffset { index, way, offset });
    }
}
