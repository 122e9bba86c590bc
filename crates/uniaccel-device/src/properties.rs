//! Device property records.
//!
//! Properties come in two shapes: the real record reported by the CUDA
//! driver, and a mocked record for the unified-memory backend, which has no
//! per-device accounting. The two are a tagged variant with a common
//! total-memory accessor so callers never need to know which one they hold.

/// Properties of the probed device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceProperties {
    /// Real record from the CUDA driver.
    Cuda(CudaProperties),
    /// Mocked record for unified-memory devices.
    Unified(UnifiedProperties),
}

/// Properties reported by the CUDA driver for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CudaProperties {
    /// Marketing name of the device.
    pub name: String,
    /// Total device memory in bytes.
    pub total_memory: u64,
    /// Number of streaming multiprocessors.
    pub multiprocessor_count: u32,
    /// Compute capability as (major, minor).
    pub compute_capability: (u32, u32),
}

/// Placeholder properties for unified-memory devices.
///
/// Unified memory is shared with the host, so a per-device total is not
/// meaningful; the field is fixed at zero and callers are warned when the
/// record is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnifiedProperties {
    /// Always zero.
    pub total_memory: u64,
}

impl UnifiedProperties {
    pub(crate) const fn mocked() -> Self {
        Self { total_memory: 0 }
    }
}

impl DeviceProperties {
    /// Total device memory in bytes; zero for the mocked record.
    pub fn total_memory(&self) -> u64 {
        match self {
            Self::Cuda(p) => p.total_memory,
            Self::Unified(p) => p.total_memory,
        }
    }

    /// Whether this record is a placeholder rather than driver data.
    pub fn is_mocked(&self) -> bool {
        matches!(self, Self::Unified(_))
    }
}
