//! Emulator Launch
//!
//! Builds the emulator invocation for a named AVD profile.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::command::DeviceCommand;

/// Emulator launch options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorOptions {
    /// GPU mode (auto, host, swiftshader_indirect, ...)
    pub gpu: Option<String>,
    /// Disable audio
    pub no_audio: bool,
    /// Disable the emulator window
    pub no_window: bool,
    /// Disable the boot animation
    pub no_boot_anim: bool,
    /// Wipe user data on launch
    pub wipe_data: bool,
    /// Cold boot (skip snapshot load)
    pub cold_boot: bool,
    /// Additional arguments passed through verbatim
    pub extra_args: Vec<String>,
}

impl EmulatorOptions {
    /// Options for a reproducible test run: fresh data, no boot animation,
    /// no audio, cold boot.
    pub fn for_tests() -> Self {
        Self {
            no_boot_anim: true,
            cold_boot: true,
            wipe_data: true,
            no_audio: true,
            ..Default::default()
        }
    }

    /// Options for headless/CI environments
    pub fn headless() -> Self {
        Self {
            gpu: Some("swiftshader_indirect".to_string()),
            no_window: true,
            ..Self::for_tests()
        }
    }

    /// Convert to command line arguments
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref gpu) = self.gpu {
            args.push("-gpu".to_string());
            args.push(gpu.clone());
        }
        if self.no_boot_anim {
            args.push("-no-boot-anim".to_string());
        }
        if self.cold_boot {
            args.push("-no-snapshot-load".to_string());
        }
        if self.wipe_data {
            args.push("-wipe-data".to_string());
        }
        if self.no_audio {
            args.push("-no-audio".to_string());
        }
        if self.no_window {
            args.push("-no-window".to_string());
        }
        args.extend(self.extra_args.clone());

        args
    }
}

/// Path to the emulator binary under the SDK root
pub fn emulator_path(sdk_root: &Path) -> std::path::PathBuf {
    let emulator_dir = sdk_root.join("emulator");
    if cfg!(windows) {
        emulator_dir.join("emulator.exe")
    } else {
        emulator_dir.join("emulator")
    }
}

/// Build the launch command for the given AVD profile
pub fn launch_command(sdk_root: &Path, avd_name: &str, options: &EmulatorOptions) -> DeviceCommand {
    DeviceCommand::new(emulator_path(sdk_root).to_string_lossy())
        .args(["-avd", avd_name])
        .args(options.to_args())
}
