//! Device capability facade for heterogeneous compute.
//!
//! This crate probes the runtime once for an available accelerator and
//! exposes a uniform set of memory, stream and synchronization helpers that
//! dispatch to the matching backend, substituting inert defaults where a
//! capability is unsupported. Higher-level code calls the facade without ever
//! checking the device type itself.
//!
//! # Device classes
//!
//! - **CUDA**: discrete memory accounting, stream objects, explicit
//!   synchronization (behind the `cuda` feature).
//! - **Metal**: unified memory shared with the host; no streams, no discrete
//!   accounting (behind the `metal` feature, macOS only).
//! - **CPU**: the always-available fallback; every helper degrades to a
//!   no-op, zero, or `None`.
//!
//! # Example
//!
//! ```
//! use uniaccel_device::device;
//!
//! let dev = device();
//! let _guard = dev.stream(None); // no-op scope off-GPU
//! if dev.can_pin_memory() {
//!     // fast host-device transfer path
//! }
//! dev.synchronize(None).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`device`](mod@device): detection, the probe-once global, and the facade
//! - [`caps`]: capability table keyed by device kind
//! - [`properties`]: real vs. mocked device property records
//! - [`memory`]: memory accounting and the CUDA reuse pool
//! - [`stream`]: stream handles and the scoped-stream guard
//! - [`error`]: the thin error passthrough
//! - [`backend`]: feature-gated backend glue

pub mod backend;
pub mod caps;
pub mod device;
pub mod error;
pub mod memory;
pub mod properties;
pub mod stream;

pub use caps::DeviceCaps;
pub use device::{device, Device, DeviceKind};
pub use error::{DeviceError, Result, UnknownDeviceKind};
pub use memory::MemoryStats;
pub use properties::{CudaProperties, DeviceProperties, UnifiedProperties};
pub use stream::{Stream, StreamGuard};

#[cfg(feature = "cuda")]
pub use memory::CudaMemoryPool;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use uniaccel_device::prelude::*;
/// ```
pub mod prelude {
    pub use crate::caps::DeviceCaps;
    pub use crate::device::{device, Device, DeviceKind};
    pub use crate::error::{DeviceError, Result};
    pub use crate::memory::MemoryStats;
    pub use crate::properties::DeviceProperties;
    pub use crate::stream::{Stream, StreamGuard};
}
