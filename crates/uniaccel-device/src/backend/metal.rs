//! Metal backend context (unified memory).
//!
//! Metal shares memory with the host and has no stream objects, so the only
//! primitives the facade needs from it are availability, a queue to drain,
//! and the device name.

use crate::error::{DeviceError, Result};

/// Handles owned by the facade when the probed device is a Metal GPU.
pub struct MetalContext {
    device: metal::Device,
    queue: metal::CommandQueue,
}

/// Whether a system-default Metal device exists.
pub fn is_available() -> bool {
    metal::Device::system_default().is_some()
}

impl MetalContext {
    /// Opens the system-default device and creates a command queue.
    pub fn init() -> Result<Self> {
        let device = metal::Device::system_default()
            .ok_or_else(|| DeviceError::NotAvailable("no system-default Metal device".into()))?;
        let queue = device.new_command_queue();
        Ok(Self { device, queue })
    }

    /// Blocks until all work committed to the queue has completed.
    ///
    /// Metal has no direct device-wide barrier; committing an empty command
    /// buffer and waiting on it drains everything queued before it.
    pub fn synchronize(&self) {
        let buffer = self.queue.new_command_buffer();
        buffer.commit();
        buffer.wait_until_completed();
    }

    /// Marketing name of the device.
    pub fn device_name(&self) -> String {
        self.device.name().to_string()
    }
}
