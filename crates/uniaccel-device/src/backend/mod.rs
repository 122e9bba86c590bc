//! Feature-gated backend glue.
//!
//! Each backend owns the handles the facade dispatches to. Probing and
//! initialization live here; everything above this module is
//! backend-agnostic.

#[cfg(feature = "cuda")]
pub mod cuda;

#[cfg(all(feature = "metal", target_os = "macos"))]
pub mod metal;
