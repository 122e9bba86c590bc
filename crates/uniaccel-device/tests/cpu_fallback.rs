//! End-to-end behavior of the facade on a CPU-only build.
//!
//! With no accelerator backend compiled in, detection must land on the CPU
//! fallback and every helper must degrade to its inert default.

#![cfg(not(any(feature = "cuda", feature = "metal")))]

use pretty_assertions::assert_eq;
use uniaccel_device::{device, DeviceKind, MemoryStats};

#[test]
fn cpu_only_process_degrades_everywhere() {
    let dev = device();

    assert_eq!(dev.kind(), DeviceKind::Cpu);
    assert_eq!(dev.name(), "cpu");
    assert!(!dev.is_cuda());
    assert!(!dev.is_metal());

    // Memory queries all read zero.
    assert_eq!(dev.total_memory(0).unwrap(), 0);
    assert_eq!(dev.total_memory(7).unwrap(), 0);
    assert_eq!(dev.memory_allocated(), 0);
    assert_eq!(dev.memory_reserved(), 0);
    assert_eq!(dev.memory_stats(), MemoryStats::default());

    // No stream objects exist.
    assert!(dev.create_stream().unwrap().is_none());
    assert!(dev.current_stream(None).is_none());
    assert!(dev.current_stream(Some(0)).is_none());
    assert!(dev.default_stream(None).is_none());

    // No properties record on the fallback.
    assert!(dev.properties(0).unwrap().is_none());

    // The scoped context executes the wrapped block without alteration.
    let mut executed = false;
    {
        let guard = dev.stream(None);
        assert!(!guard.is_active());
        executed = true;
    }
    assert!(executed);

    // Pinning is a CUDA-only capability.
    assert!(!dev.can_pin_memory());
}

#[test]
fn cache_and_sync_are_repeatable_noops() {
    let dev = device();
    for _ in 0..5 {
        dev.empty_cache();
        dev.synchronize(None).unwrap();
    }
    assert_eq!(dev.memory_allocated(), 0);
    assert_eq!(dev.memory_reserved(), 0);
}

#[test]
fn default_device_requests_all_land_on_cpu() {
    let dev = device();

    dev.set_default_device("cpu").unwrap();
    assert_eq!(dev.default_device(), DeviceKind::Cpu);

    // Requesting an absent accelerator falls back rather than failing.
    dev.set_default_device("cuda").unwrap();
    assert_eq!(dev.default_device(), DeviceKind::Cpu);

    dev.set_default_device("not-a-device").unwrap();
    assert_eq!(dev.default_device(), DeviceKind::Cpu);
}
