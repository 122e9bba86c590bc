//! Stream handles and the scoped-stream context.
//!
//! Streams only exist on the CUDA backend. Everywhere else the handle type is
//! inert and the scoped context degrades to a guard with nothing to restore,
//! so callers can scope work to a stream without checking the device kind.

use std::fmt;
use std::marker::PhantomData;

#[cfg(feature = "cuda")]
use std::sync::Arc;

#[cfg(feature = "cuda")]
use cudarc::driver::CudaStream;
#[cfg(feature = "cuda")]
use parking_lot::RwLock;

/// Opaque handle to a backend stream.
///
/// Obtained from [`Device::create_stream`](crate::Device::create_stream) and
/// friends; never constructible on backends without stream support.
#[derive(Clone)]
pub struct Stream {
    #[cfg(feature = "cuda")]
    inner: Arc<CudaStream>,
    #[cfg(not(feature = "cuda"))]
    _inert: (),
}

impl Stream {
    #[cfg(feature = "cuda")]
    pub(crate) fn new(inner: Arc<CudaStream>) -> Self {
        Self { inner }
    }

    #[cfg(feature = "cuda")]
    pub(crate) fn inner(&self) -> Arc<CudaStream> {
        self.inner.clone()
    }

    /// Inert handle for exercising the degraded paths off-GPU.
    #[cfg(all(test, not(feature = "cuda")))]
    pub(crate) fn inert() -> Self {
        Self { _inert: () }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

/// Scoped-stream context.
///
/// On the CUDA backend with a concrete stream, construction installs the
/// stream as current and dropping the guard restores the previous one,
/// whether the scope exits normally or by unwinding. In every other case both
/// ends are no-ops.
#[must_use = "the stream scope ends when the guard is dropped"]
pub struct StreamGuard<'a> {
    #[cfg(feature = "cuda")]
    restore: Option<Restore<'a>>,
    _device: PhantomData<&'a ()>,
}

#[cfg(feature = "cuda")]
struct Restore<'a> {
    slot: &'a RwLock<Option<Arc<CudaStream>>>,
    previous: Option<Arc<CudaStream>>,
}

impl<'a> StreamGuard<'a> {
    /// Guard that does nothing on entry or exit.
    pub(crate) fn noop() -> Self {
        Self {
            #[cfg(feature = "cuda")]
            restore: None,
            _device: PhantomData,
        }
    }

    /// Installs `stream` as current; the previous value is restored on drop.
    #[cfg(feature = "cuda")]
    pub(crate) fn scoped(
        slot: &'a RwLock<Option<Arc<CudaStream>>>,
        stream: Arc<CudaStream>,
    ) -> Self {
        let previous = slot.write().replace(stream);
        Self {
            restore: Some(Restore { slot, previous }),
            _device: PhantomData,
        }
    }

    /// Whether dropping this guard restores a stream slot.
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "cuda")]
        {
            self.restore.is_some()
        }
        #[cfg(not(feature = "cuda"))]
        {
            false
        }
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        #[cfg(feature = "cuda")]
        if let Some(restore) = self.restore.take() {
            *restore.slot.write() = restore.previous;
        }
    }
}

impl fmt::Debug for StreamGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamGuard")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceKind};

    #[test]
    fn cpu_device_yields_no_streams() {
        let device = Device::with_kind(DeviceKind::Cpu);
        assert!(device.create_stream().unwrap().is_none());
        assert!(device.current_stream(None).is_none());
        assert!(device.default_stream(None).is_none());
    }

    #[test]
    fn metal_device_yields_no_streams() {
        let device = Device::with_kind(DeviceKind::Metal);
        assert!(device.create_stream().unwrap().is_none());
        assert!(device.current_stream(Some(0)).is_none());
        assert!(device.default_stream(Some(0)).is_none());
    }

    #[test]
    fn noop_guard_wraps_a_block_without_alteration() {
        let device = Device::with_kind(DeviceKind::Cpu);
        let mut ran = false;
        {
            let guard = device.stream(None);
            assert!(!guard.is_active());
            ran = true;
        }
        assert!(ran);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn guard_with_handle_is_still_inert_off_gpu() {
        let device = Device::with_kind(DeviceKind::Cpu);
        let handle = Stream::inert();
        let guard = device.stream(Some(&handle));
        assert!(!guard.is_active());
        drop(guard);
    }

    #[test]
    fn nested_noop_guards_never_panic() {
        let device = Device::with_kind(DeviceKind::Metal);
        let outer = device.stream(None);
        {
            let inner = device.stream(None);
            assert!(!inner.is_active());
        }
        drop(outer);
    }
}
