//! CUDA backend context.

use std::sync::Arc;

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::{CudaDevice, CudaStream};
use parking_lot::RwLock;

use crate::error::Result;
use crate::memory::CudaMemoryPool;
use crate::properties::CudaProperties;

/// Handles owned by the facade when the probed device is a CUDA GPU.
pub struct CudaContext {
    pub(crate) device: Arc<CudaDevice>,
    pub(crate) default_stream: Arc<CudaStream>,
    /// Stream installed by an active scoped-stream guard, if any.
    pub(crate) current: RwLock<Option<Arc<CudaStream>>>,
    pub(crate) pool: CudaMemoryPool,
}

/// Whether a CUDA device can be opened at ordinal 0.
pub fn is_available() -> bool {
    CudaDevice::new(0).is_ok()
}

impl CudaContext {
    /// Opens the device at ordinal 0 and forks its default stream.
    pub fn init() -> Result<Self> {
        let device = CudaDevice::new(0)?;
        let default_stream = Arc::new(device.fork_default_stream()?);
        Ok(Self {
            device,
            default_stream,
            current: RwLock::new(None),
            pool: CudaMemoryPool::new(),
        })
    }

    /// Creates a new stream on the probed device.
    pub fn new_stream(&self) -> Result<Arc<CudaStream>> {
        Ok(Arc::new(self.device.fork_default_stream()?))
    }

    /// Blocks until the device work queue drains.
    pub fn synchronize(&self) -> Result<()> {
        Ok(self.device.synchronize()?)
    }

    /// Binds the device's primary context to the calling thread.
    pub fn bind_to_thread(&self) -> Result<()> {
        Ok(self.device.bind_to_thread()?)
    }

    /// Driver-reported total device memory in bytes.
    pub fn total_memory(&self) -> Result<u64> {
        let (_free, total) = cudarc::driver::result::mem_get_info()?;
        Ok(total as u64)
    }

    /// Full property record for the probed device.
    pub fn properties(&self) -> Result<CudaProperties> {
        let name = self.device.name()?;
        let total_memory = self.total_memory()?;
        let multiprocessor_count = self
            .device
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT)?
            as u32;
        let major = self
            .device
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)?
            as u32;
        let minor = self
            .device
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?
            as u32;

        Ok(CudaProperties {
            name,
            total_memory,
            multiprocessor_count,
            compute_capability: (major, minor),
        })
    }
}
