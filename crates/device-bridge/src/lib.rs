//! AvdPilot Device Bridge
//!
//! Talks to the external device tooling: runs device-bridge CLI commands,
//! supervises the emulator and log-stream processes, polls boot readiness,
//! toggles connectivity and installs packages.

pub mod adb;
pub mod command;
pub mod emulator;
pub mod install;
pub mod network;
pub mod readiness;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testutil;

pub use adb::AdbClient;
pub use command::{CommandOutput, CommandRunner, DeviceCommand, ExecError, ProcessRunner};
pub use emulator::{launch_command, EmulatorOptions};
pub use install::{InstallError, PackageInstaller};
pub use network::{NetworkController, NetworkState, NetworkToggleFailed};
pub use readiness::{PollSettings, ReadinessError, ReadinessPoller};
pub use supervisor::{BackgroundProcess, ProcessKind, ProcessSupervisor, SupervisorError};
