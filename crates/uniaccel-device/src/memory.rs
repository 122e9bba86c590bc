//! Device memory accounting.
//!
//! The facade fronts a small size-bucketed pool over raw device allocations.
//! Released blocks are cached for reuse instead of being freed, and
//! `empty_cache` drops the cached blocks. The pool is what gives the
//! allocated/reserved queries their meaning; on backends without discrete
//! memory the queries read zero.

/// Snapshot of the facade's memory accounting.
///
/// All fields are zero on backends without discrete memory accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    /// Bytes currently handed out to callers.
    pub allocated_bytes: u64,
    /// Bytes held in the reuse cache.
    pub cached_bytes: u64,
    /// Number of blocks held in the reuse cache.
    pub cached_blocks: usize,
}

impl MemoryStats {
    /// Bytes reserved from the backend: live allocations plus the cache.
    pub const fn reserved_bytes(&self) -> u64 {
        self.allocated_bytes + self.cached_bytes
    }
}

#[cfg(feature = "cuda")]
pub use pool::CudaMemoryPool;

#[cfg(feature = "cuda")]
mod pool {
    use std::collections::HashMap;
    use std::sync::Arc;

    use cudarc::driver::{CudaDevice, CudaSlice};
    use parking_lot::Mutex;

    use super::MemoryStats;
    use crate::error::Result;

    /// Size-bucketed reuse pool for device allocations.
    pub struct CudaMemoryPool {
        /// Cached blocks, keyed by allocation size in bytes.
        free_blocks: Mutex<HashMap<usize, Vec<CudaSlice<u8>>>>,
        stats: Mutex<MemoryStats>,
    }

    impl CudaMemoryPool {
        /// Creates an empty pool.
        pub fn new() -> Self {
            Self {
                free_blocks: Mutex::new(HashMap::new()),
                stats: Mutex::new(MemoryStats::default()),
            }
        }

        /// Hands out a block of `len` bytes, reusing a cached block of the
        /// exact size when one is available.
        pub fn allocate(&self, device: &Arc<CudaDevice>, len: usize) -> Result<CudaSlice<u8>> {
            if let Some(block) = self.free_blocks.lock().get_mut(&len).and_then(Vec::pop) {
                let mut stats = self.stats.lock();
                stats.cached_bytes -= len as u64;
                stats.cached_blocks -= 1;
                stats.allocated_bytes += len as u64;
                return Ok(block);
            }

            let block = device.alloc_zeros::<u8>(len)?;
            self.stats.lock().allocated_bytes += len as u64;
            Ok(block)
        }

        /// Returns a block to the cache for later reuse.
        pub fn release(&self, block: CudaSlice<u8>) {
            let len = block.len();
            self.free_blocks.lock().entry(len).or_default().push(block);
            let mut stats = self.stats.lock();
            stats.allocated_bytes = stats.allocated_bytes.saturating_sub(len as u64);
            stats.cached_bytes += len as u64;
            stats.cached_blocks += 1;
        }

        /// Drops every cached block, returning the memory to the driver.
        /// Live allocations are unaffected. Idempotent.
        pub fn clear(&self) {
            self.free_blocks.lock().clear();
            let mut stats = self.stats.lock();
            stats.cached_bytes = 0;
            stats.cached_blocks = 0;
        }

        /// Snapshot of the pool accounting.
        pub fn stats(&self) -> MemoryStats {
            *self.stats.lock()
        }
    }

    impl Default for CudaMemoryPool {
        fn default() -> Self {
            Self::new()
        }
    }
}
