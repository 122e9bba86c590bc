//! Capability table keyed by device kind.
//!
//! Every facade operation consults this table exactly once instead of
//! re-branching on the device kind, so the support matrix lives in a single
//! place.

use crate::device::DeviceKind;

/// Capabilities of a device class.
///
/// The table is total: every [`DeviceKind`] maps to one row, computed by
/// [`DeviceCaps::of`] at facade construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceCaps {
    /// Stream objects can be created and scoped.
    pub streams: bool,
    /// The device has discrete memory with byte-accurate accounting.
    pub discrete_memory: bool,
    /// Host memory can be pinned for faster transfers.
    pub pinned_host: bool,
    /// The backend exposes a cache-release primitive.
    pub cache_release: bool,
    /// The backend exposes a blocking queue-drain primitive.
    pub queue_sync: bool,
}

impl DeviceCaps {
    /// Returns the capability row for a device kind.
    pub const fn of(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Cuda => Self {
                streams: true,
                discrete_memory: true,
                pinned_host: true,
                cache_release: true,
                queue_sync: true,
            },
            // Unified memory: no discrete accounting, no stream objects.
            DeviceKind::Metal => Self {
                streams: false,
                discrete_memory: false,
                pinned_host: false,
                cache_release: true,
                queue_sync: true,
            },
            DeviceKind::Cpu => Self {
                streams: false,
                discrete_memory: false,
                pinned_host: false,
                cache_release: false,
                queue_sync: false,
            },
        }
    }
}
