//! ADB (Android Debug Bridge) Client
//!
//! Typed wrapper over the device-bridge CLI. All device queries go through
//! the shared [`CommandRunner`] so callers can substitute execution in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::command::{CommandOutput, CommandRunner, DeviceCommand, ExecError};

/// ADB client
#[derive(Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl AdbClient {
    /// Create a client for the adb binary under the given SDK root
    pub fn new(sdk_root: &Path, runner: Arc<dyn CommandRunner>) -> Self {
        let platform_tools = sdk_root.join("platform-tools");
        let adb_path = if cfg!(windows) {
            platform_tools.join("adb.exe")
        } else {
            platform_tools.join("adb")
        };
        Self { adb_path, runner }
    }

    /// Path to the adb binary
    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// The runner used for command execution
    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::clone(&self.runner)
    }

    /// Check if adb is available
    pub fn is_available(&self) -> bool {
        self.adb_path.exists()
    }

    fn command<I, S>(&self, args: I) -> DeviceCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DeviceCommand::new(self.adb_path.to_string_lossy()).args(args)
    }

    /// Run an adb command, capturing its output
    pub async fn run<I, S>(&self, args: I) -> Result<CommandOutput, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run(&self.command(args)).await
    }

    /// Run a shell command on the device, returning stdout
    pub async fn shell<I, S>(&self, args: I) -> Result<String, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full_args = vec!["shell".to_string()];
        full_args.extend(args.into_iter().map(Into::into));
        Ok(self.run(full_args).await?.stdout)
    }

    /// Read a device property, trimmed
    pub async fn get_prop(&self, prop: &str) -> Result<String, ExecError> {
        let output = self.shell(["getprop", prop]).await?;
        Ok(output.trim().to_string())
    }

    /// Block until the device transport is attachable
    pub async fn wait_for_device(&self) -> Result<(), ExecError> {
        debug!("Waiting for device transport...");
        self.run(["wait-for-device"]).await?;
        Ok(())
    }

    /// Ask the emulator console to shut the emulator down
    pub async fn emu_kill(&self) -> Result<(), ExecError> {
        self.run(["emu", "kill"]).await?;
        Ok(())
    }

    /// Command that installs an APK, replacing any existing version
    pub fn install_command(&self, apk_path: &Path) -> DeviceCommand {
        self.command(["install", "-r"])
            .arg(apk_path.to_string_lossy())
    }

    /// Command that streams the device log
    pub fn logcat_command(&self) -> DeviceCommand {
        self.command(["logcat"])
    }
}

impl std::fmt::Debug for AdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdbClient")
            .field("adb_path", &self.adb_path)
            .finish()
    }
}
