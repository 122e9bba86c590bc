//! Device detection and the capability facade.
//!
//! The runtime is probed once, in priority order CUDA → Metal → CPU, and the
//! result is cached for the process lifetime behind [`device`]. Every helper
//! dispatches on the cached kind through the capability table and degrades to
//! an inert default when the backend lacks the primitive.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::caps::DeviceCaps;
use crate::error::{Result, UnknownDeviceKind};
use crate::memory::MemoryStats;
use crate::properties::DeviceProperties;
use crate::stream::{Stream, StreamGuard};

#[cfg(feature = "cuda")]
use crate::backend::cuda::CudaContext;
#[cfg(all(feature = "metal", target_os = "macos"))]
use crate::backend::metal::MetalContext;

/// The class of the probed compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DeviceKind {
    /// Discrete GPU with CUDA streams and byte-accurate memory accounting.
    Cuda,
    /// Apple GPU sharing memory with the host.
    Metal,
    /// Host fallback.
    Cpu,
}

impl DeviceKind {
    /// Canonical lowercase name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Metal => "metal",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = UnknownDeviceKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cuda" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            "cpu" => Ok(Self::Cpu),
            other => Err(UnknownDeviceKind(other.to_string())),
        }
    }
}

/// Process-wide facade, probed on first access and immutable afterwards.
static DEVICE: Lazy<Device> = Lazy::new(Device::detect);

/// Returns the process-wide device facade.
///
/// The first call probes the runtime; later calls are lock-free reads of the
/// cached result.
pub fn device() -> &'static Device {
    &DEVICE
}

/// Capability facade over the probed device.
///
/// A `Device` is an explicit context: the probe-once global from [`device`]
/// covers the common case, and [`Device::with_kind`] builds a standalone
/// context for callers that manage their own.
pub struct Device {
    kind: DeviceKind,
    caps: DeviceCaps,
    /// Effective default device for new work; starts at CPU.
    default_kind: RwLock<DeviceKind>,
    #[cfg(feature = "cuda")]
    cuda: Option<CudaContext>,
    #[cfg(all(feature = "metal", target_os = "macos"))]
    metal: Option<MetalContext>,
}

impl Device {
    /// Probes the runtime and returns the facade for the best device found.
    ///
    /// Order: CUDA, then Metal, then the CPU fallback. A backend that probes
    /// as present but fails to initialize is skipped, not an error.
    pub fn detect() -> Self {
        #[cfg(feature = "cuda")]
        if crate::backend::cuda::is_available() {
            match CudaContext::init() {
                Ok(ctx) => return Self::from_cuda(ctx),
                Err(e) => tracing::debug!("CUDA probed but failed to initialize: {e}"),
            }
        }

        #[cfg(all(feature = "metal", target_os = "macos"))]
        if crate::backend::metal::is_available() {
            match MetalContext::init() {
                Ok(ctx) => return Self::from_metal(ctx),
                Err(e) => tracing::debug!("Metal probed but failed to initialize: {e}"),
            }
        }

        Self::with_kind(DeviceKind::Cpu)
    }

    /// Builds a facade for `kind` without probing or opening a backend.
    ///
    /// Backend-delegating operations degrade exactly as they do for an
    /// unsupported kind, which makes this the entry point for tests and for
    /// callers forcing the CPU path.
    pub fn with_kind(kind: DeviceKind) -> Self {
        Self {
            kind,
            caps: DeviceCaps::of(kind),
            default_kind: RwLock::new(DeviceKind::Cpu),
            #[cfg(feature = "cuda")]
            cuda: None,
            #[cfg(all(feature = "metal", target_os = "macos"))]
            metal: None,
        }
    }

    #[cfg(feature = "cuda")]
    fn from_cuda(ctx: CudaContext) -> Self {
        let mut this = Self::with_kind(DeviceKind::Cuda);
        this.cuda = Some(ctx);
        this
    }

    #[cfg(all(feature = "metal", target_os = "macos"))]
    fn from_metal(ctx: MetalContext) -> Self {
        let mut this = Self::with_kind(DeviceKind::Metal);
        this.metal = Some(ctx);
        this
    }

    /// The probed device kind.
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Canonical name of the probed kind ("cuda", "metal" or "cpu").
    pub const fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// The capability row for the probed kind.
    pub const fn caps(&self) -> DeviceCaps {
        self.caps
    }

    /// Whether the probed device is a CUDA GPU.
    pub fn is_cuda(&self) -> bool {
        self.kind == DeviceKind::Cuda
    }

    /// Whether the probed device is a unified-memory Metal GPU.
    pub fn is_metal(&self) -> bool {
        self.kind == DeviceKind::Metal
    }

    /// Whether the facade fell back to the CPU.
    pub fn is_cpu(&self) -> bool {
        self.kind == DeviceKind::Cpu
    }

    /// Properties of the device at `_ordinal`.
    ///
    /// CUDA returns the driver record. Metal has no per-device accounting, so
    /// a mocked record with zero total memory is returned and an advisory
    /// warning is emitted on every call. The CPU fallback returns `None`.
    ///
    /// The ordinal is accepted for API parity; only the probed device is
    /// queried.
    pub fn properties(&self, _ordinal: usize) -> Result<Option<DeviceProperties>> {
        match self.kind {
            #[cfg(feature = "cuda")]
            DeviceKind::Cuda => match &self.cuda {
                Some(ctx) => Ok(Some(DeviceProperties::Cuda(ctx.properties()?))),
                None => Ok(None),
            },
            DeviceKind::Metal => {
                tracing::warn!(
                    "device properties are not available on the unified-memory backend; \
                     returning mocked values"
                );
                Ok(Some(DeviceProperties::Unified(
                    crate::properties::UnifiedProperties::mocked(),
                )))
            }
            _ => Ok(None),
        }
    }

    /// Total memory of the device at `_ordinal` in bytes; zero off-CUDA.
    pub fn total_memory(&self, _ordinal: usize) -> Result<u64> {
        if !self.caps.discrete_memory {
            return Ok(0);
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            return ctx.total_memory();
        }
        Ok(0)
    }

    /// Bytes currently handed out by the facade pool; zero off-CUDA.
    pub fn memory_allocated(&self) -> u64 {
        self.memory_stats().allocated_bytes
    }

    /// Bytes reserved from the backend (live plus cached); zero off-CUDA.
    pub fn memory_reserved(&self) -> u64 {
        self.memory_stats().reserved_bytes()
    }

    /// Snapshot of the facade's memory accounting.
    pub fn memory_stats(&self) -> MemoryStats {
        if !self.caps.discrete_memory {
            return MemoryStats::default();
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            return ctx.pool.stats();
        }
        MemoryStats::default()
    }

    /// Releases cached device memory back to the backend.
    ///
    /// CUDA drops the pool's cached blocks; Metal drains its queue; the CPU
    /// fallback does nothing. Safe to call repeatedly.
    pub fn empty_cache(&self) {
        if !self.caps.cache_release {
            return;
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            ctx.pool.clear();
            return;
        }
        #[cfg(all(feature = "metal", target_os = "macos"))]
        if let Some(ctx) = &self.metal {
            ctx.synchronize();
        }
    }

    /// Creates a new stream, or `None` where streams are unsupported.
    pub fn create_stream(&self) -> Result<Option<Stream>> {
        if !self.caps.streams {
            return Ok(None);
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            return Ok(Some(Stream::new(ctx.new_stream()?)));
        }
        Ok(None)
    }

    /// The stream a scoped guard has installed, else the default stream.
    /// `None` where streams are unsupported.
    pub fn current_stream(&self, _ordinal: Option<usize>) -> Option<Stream> {
        if !self.caps.streams {
            return None;
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            let installed = ctx.current.read().clone();
            return Some(Stream::new(
                installed.unwrap_or_else(|| ctx.default_stream.clone()),
            ));
        }
        None
    }

    /// The device's default stream, or `None` where streams are unsupported.
    pub fn default_stream(&self, _ordinal: Option<usize>) -> Option<Stream> {
        if !self.caps.streams {
            return None;
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            return Some(Stream::new(ctx.default_stream.clone()));
        }
        None
    }

    /// Blocks until the backend work queue drains; no-op on the CPU fallback.
    pub fn synchronize(&self, _ordinal: Option<usize>) -> Result<()> {
        if !self.caps.queue_sync {
            return Ok(());
        }
        #[cfg(feature = "cuda")]
        if let Some(ctx) = &self.cuda {
            return ctx.synchronize();
        }
        #[cfg(all(feature = "metal", target_os = "macos"))]
        if let Some(ctx) = &self.metal {
            ctx.synchronize();
        }
        Ok(())
    }

    /// Scopes subsequent work to `stream`.
    ///
    /// Only meaningful on CUDA with a concrete handle; every other
    /// combination returns a guard whose entry and exit do nothing.
    pub fn stream<'a>(&'a self, stream: Option<&Stream>) -> StreamGuard<'a> {
        #[cfg(feature = "cuda")]
        if self.caps.streams {
            if let (Some(ctx), Some(handle)) = (self.cuda.as_ref(), stream) {
                return StreamGuard::scoped(&ctx.current, handle.inner());
            }
        }
        #[cfg(not(feature = "cuda"))]
        let _ = stream;
        StreamGuard::noop()
    }

    /// Sets the effective default device by name.
    ///
    /// "cuda" while on CUDA binds the backend and switches the default.
    /// "metal" while on Metal is deliberately left alone: the backend's
    /// mechanism for switching the allocation default has side effects, so
    /// the current default is kept. Every other request, including unknown
    /// names, forces the default to CPU.
    pub fn set_default_device(&self, name: &str) -> Result<()> {
        match name.parse::<DeviceKind>() {
            Ok(DeviceKind::Cuda) if self.is_cuda() => {
                #[cfg(feature = "cuda")]
                if let Some(ctx) = &self.cuda {
                    ctx.bind_to_thread()?;
                }
                *self.default_kind.write() = DeviceKind::Cuda;
            }
            Ok(DeviceKind::Metal) if self.is_metal() => {}
            _ => {
                *self.default_kind.write() = DeviceKind::Cpu;
            }
        }
        Ok(())
    }

    /// The effective default device last set through
    /// [`set_default_device`](Self::set_default_device).
    pub fn default_device(&self) -> DeviceKind {
        *self.default_kind.read()
    }

    /// Whether host memory can be pinned on this device.
    pub fn can_pin_memory(&self) -> bool {
        self.caps.pinned_host
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("kind", &self.kind)
            .field("caps", &self.caps)
            .field("default", &self.default_device())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn detect_falls_back_to_cpu_without_backends() {
        let device = Device::detect();
        assert!(device.is_cpu());
        assert_eq!(device.name(), "cpu");
    }

    #[test]
    fn predicates_follow_the_kind() {
        let cuda = Device::with_kind(DeviceKind::Cuda);
        assert!(cuda.is_cuda() && !cuda.is_metal() && !cuda.is_cpu());

        let metal = Device::with_kind(DeviceKind::Metal);
        assert!(metal.is_metal() && !metal.is_cuda() && !metal.is_cpu());

        let cpu = Device::with_kind(DeviceKind::Cpu);
        assert!(cpu.is_cpu() && !cpu.is_cuda() && !cpu.is_metal());
    }

    #[test]
    fn can_pin_memory_only_on_cuda() {
        for kind in [DeviceKind::Cuda, DeviceKind::Metal, DeviceKind::Cpu] {
            let device = Device::with_kind(kind);
            assert_eq!(device.can_pin_memory(), kind == DeviceKind::Cuda);
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [DeviceKind::Cuda, DeviceKind::Metal, DeviceKind::Cpu] {
            assert_eq!(kind.to_string().parse::<DeviceKind>(), Ok(kind));
        }
        assert!("tpu".parse::<DeviceKind>().is_err());
        assert!("CUDA".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn default_device_starts_at_cpu() {
        for kind in [DeviceKind::Cuda, DeviceKind::Metal, DeviceKind::Cpu] {
            assert_eq!(Device::with_kind(kind).default_device(), DeviceKind::Cpu);
        }
    }

    #[test]
    fn set_default_cpu_always_wins() {
        for kind in [DeviceKind::Cuda, DeviceKind::Metal, DeviceKind::Cpu] {
            let device = Device::with_kind(kind);
            device.set_default_device("cpu").unwrap();
            assert_eq!(device.default_device(), DeviceKind::Cpu);
        }
    }

    #[test]
    fn set_default_cuda_off_gpu_falls_back_to_cpu() {
        let device = Device::with_kind(DeviceKind::Cpu);
        device.set_default_device("cuda").unwrap();
        assert_eq!(device.default_device(), DeviceKind::Cpu);

        let device = Device::with_kind(DeviceKind::Metal);
        device.set_default_device("cuda").unwrap();
        assert_eq!(device.default_device(), DeviceKind::Cpu);
    }

    #[test]
    fn set_default_cuda_on_cuda_switches_the_default() {
        let device = Device::with_kind(DeviceKind::Cuda);
        device.set_default_device("cuda").unwrap();
        assert_eq!(device.default_device(), DeviceKind::Cuda);
    }

    #[test]
    fn set_default_metal_on_metal_is_a_deliberate_noop() {
        let device = Device::with_kind(DeviceKind::Metal);
        device.set_default_device("metal").unwrap();
        // The default is left untouched, not switched to Metal.
        assert_eq!(device.default_device(), DeviceKind::Cpu);
    }

    #[test]
    fn unknown_names_force_cpu() {
        let device = Device::with_kind(DeviceKind::Cuda);
        device.set_default_device("cuda").unwrap();
        device.set_default_device("tpu").unwrap();
        assert_eq!(device.default_device(), DeviceKind::Cpu);
    }

    #[test]
    fn memory_queries_are_zero_off_cuda() {
        for kind in [DeviceKind::Metal, DeviceKind::Cpu] {
            let device = Device::with_kind(kind);
            assert_eq!(device.total_memory(0).unwrap(), 0);
            assert_eq!(device.memory_allocated(), 0);
            assert_eq!(device.memory_reserved(), 0);
        }
    }

    #[test]
    fn cpu_cache_and_sync_are_idempotent() {
        let device = Device::with_kind(DeviceKind::Cpu);
        for _ in 0..3 {
            device.empty_cache();
            device.synchronize(None).unwrap();
            device.synchronize(Some(0)).unwrap();
        }
        assert_eq!(device.memory_stats(), MemoryStats::default());
    }

    proptest! {
        #[test]
        fn set_default_on_cpu_device_always_lands_on_cpu(name in ".*") {
            let device = Device::with_kind(DeviceKind::Cpu);
            device.set_default_device(&name).unwrap();
            prop_assert_eq!(device.default_device(), DeviceKind::Cpu);
        }

        #[test]
        fn metal_default_is_unreachable(name in ".*") {
            let device = Device::with_kind(DeviceKind::Metal);
            device.set_default_device(&name).unwrap();
            prop_assert_eq!(device.default_device(), DeviceKind::Cpu);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn kind_serializes_to_its_name() {
        let json = serde_json::to_string(&DeviceKind::Metal).unwrap();
        assert_eq!(json, "\"metal\"");
    }
}
