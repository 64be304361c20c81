use byte_unit::Byte;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BLOCK_CAPACITY: usize = 1024;
pub const DEFAULT_VOLATILE_ARENA_SIZE: Byte = Byte::from_u64(64 * 1024 * 1024);
pub const DEFAULT_NONVOLATILE_ARENA_SIZE: Byte = Byte::from_u64(64 * 1024 * 1024);

/// Configuration of the storage engine.
///
/// All values are fixed once the engine is constructed. Block capacity
/// in particular is a deploy-time setting: every fixed block of every
/// relation holds exactly `block_capacity` slots for the lifetime of
/// the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    // Number of tuple slots per fixed block, independent of
    // column-group size.
    pub block_capacity: usize,
    // Capacity of the volatile (anonymous memory) arena.
    pub volatile_arena_size: Byte,
    // Capacity of the non-volatile arena.
    pub nonvolatile_arena_size: Byte,
    // File backing the non-volatile arena. Empty means not configured:
    // the non-volatile tier then falls back to anonymous memory, which
    // is useful for tests and hosts without NVM.
    pub nonvolatile_path: String,
}

impl StorageConfig {
    /// How many slots every fixed block holds.
    #[inline]
    pub fn block_capacity(mut self, block_capacity: usize) -> Self {
        assert!(block_capacity > 0);
        self.block_capacity = block_capacity;
        self
    }

    /// How large the volatile arena can grow.
    #[inline]
    pub fn volatile_arena_size<T>(mut self, volatile_arena_size: T) -> Self
    where
        Byte: From<T>,
    {
        self.volatile_arena_size = Byte::from(volatile_arena_size);
        self
    }

    /// How large the non-volatile arena can grow.
    #[inline]
    pub fn nonvolatile_arena_size<T>(mut self, nonvolatile_arena_size: T) -> Self
    where
        Byte: From<T>,
    {
        self.nonvolatile_arena_size = Byte::from(nonvolatile_arena_size);
        self
    }

    /// File backing the non-volatile arena.
    #[inline]
    pub fn nonvolatile_path(mut self, nonvolatile_path: impl Into<String>) -> Self {
        self.nonvolatile_path = nonvolatile_path.into();
        self
    }
}

impl Default for StorageConfig {
    #[inline]
    fn default() -> Self {
        StorageConfig {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            volatile_arena_size: DEFAULT_VOLATILE_ARENA_SIZE,
            nonvolatile_arena_size: DEFAULT_NONVOLATILE_ARENA_SIZE,
            nonvolatile_path: String::new(),
        }
    }
}
