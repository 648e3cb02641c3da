//! AvdPilot - Scripted Android emulator lifecycle for end-to-end UI tests
//!
//! Boots an emulator to a verified-ready state, controls device
//! connectivity, installs and verifies application packages and captures
//! the device log, so a test suite can run against a known device state.

// Re-export crates
pub use avdpilot_core as core;
pub use avdpilot_device_bridge as device_bridge;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "AvdPilot";
