//! Error types for the device facade.
//!
//! The facade deliberately carries no error taxonomy of its own: unsupported
//! capabilities degrade to inert defaults instead of failing, and the only
//! fallible paths are direct backend calls whose errors pass through
//! unmodified.

use thiserror::Error;

/// Convenience alias used by all fallible facade operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors surfaced by the device facade.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A backend was requested that is not usable on this system.
    #[error("accelerator backend not available: {0}")]
    NotAvailable(String),

    /// A CUDA driver call failed. The driver error is passed through as-is.
    #[cfg(feature = "cuda")]
    #[error(transparent)]
    Driver(#[from] cudarc::driver::DriverError),
}

/// Error returned when parsing an unrecognized device-class name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown device kind: {0:?}")]
pub struct UnknownDeviceKind(pub String);
