use std::fmt;

/// A cache geometry that cannot be simulated.
///
/// These are setup mistakes: they are reported when the cache is built, so no
/// access ever runs against a half-valid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Block size has no matching backing-store transfer unit.
    UnsupportedBlockSize(usize),
    /// Set count must be a power of two (1 is allowed).
    SetCountNotPowerOfTwo(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedBlockSize(size) => {
                write!(f, "unsupported block size {size} (expected 4, 8, 16 or 32)")
            }
            ConfigError::SetCountNotPowerOfTwo(count) => {
                write!(f, "set count {count} is not a power of two")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
