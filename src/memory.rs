use std::collections::HashMap;

use serde::Serialize;

use crate::error::ConfigError;

pub type Address = u32;
pub type Word = u32;

pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

const PAGE_BITS: u32 = 12;
const PAGE_SIZE: usize = 1 << PAGE_BITS;

/// Size of a single backing-store transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferUnit {
    Word,
    DoubleWord,
    QuadWord,
    OctWord,
}

impl TransferUnit {
    pub fn bytes(self) -> usize {
        match self {
            TransferUnit::Word => 4,
            TransferUnit::DoubleWord => 8,
            TransferUnit::QuadWord => 16,
            TransferUnit::OctWord => 32,
        }
    }
}

impl TryFrom<usize> for TransferUnit {
    type Error = ConfigError;

    fn try_from(block_size: usize) -> Result<Self, Self::Error> {
        match block_size {
            4 => Ok(TransferUnit::Word),
            8 => Ok(TransferUnit::DoubleWord),
            16 => Ok(TransferUnit::QuadWord),
            32 => Ok(TransferUnit::OctWord),
            _ => Err(ConfigError::UnsupportedBlockSize(block_size)),
        }
    }
}

/// The store behind the cache. `buf` is always exactly `unit.bytes()` long.
pub trait Memory {
    fn read(&mut self, addr: Address, unit: TransferUnit, buf: &mut [u8]);
    fn write(&mut self, addr: Address, unit: TransferUnit, buf: &[u8]);
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DramStats {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Sparse byte-addressable DRAM covering the whole 32 bit address space.
///
/// Pages are only allocated once written; untouched memory reads as zero.
#[derive(Debug, Default)]
pub struct Dram {
    pages: HashMap<Address, Box<[u8; PAGE_SIZE]>>,
    stats: DramStats,
}

impl Dram {
    pub fn new() -> Self {
        Dram::default()
    }

    pub fn stats(&self) -> DramStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats = DramStats::default();
    }

    /// Reads a little-endian word without touching the stats.
    #[cfg(test)]
    pub fn peek_word(&self, addr: Address) -> Word {
        let mut bytes = [0u8; WORD_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.load(addr.wrapping_add(i as Address));
        }
        Word::from_le_bytes(bytes)
    }

    fn load(&self, addr: Address) -> u8 {
        self.pages
            .get(&(addr >> PAGE_BITS))
            .map_or(0, |page| page[addr as usize & (PAGE_SIZE - 1)])
    }

    fn store(&mut self, addr: Address, byte: u8) {
        let page = self
            .pages
            .entry(addr >> PAGE_BITS)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));
        page[addr as usize & (PAGE_SIZE - 1)] = byte;
    }
}

impl Memory for Dram {
    fn read(&mut self, addr: Address, unit: TransferUnit, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), unit.bytes());
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.load(addr.wrapping_add(i as Address));
        }
        self.stats.reads += 1;
        self.stats.bytes_read += buf.len() as u64;
    }

    fn write(&mut self, addr: Address, unit: TransferUnit, buf: &[u8]) {
        debug_assert_eq!(buf.len(), unit.bytes());
        for (i, &byte) in buf.iter().enumerate() {
            self.store(addr.wrapping_add(i as Address), byte);
        }
        self.stats.writes += 1;
        self.stats.bytes_written += buf.len() as u64;
    }
}
