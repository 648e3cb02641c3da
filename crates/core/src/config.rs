//! Harness Configuration
//!
//! All lifecycle settings: SDK and AVD locations, the emulator profile,
//! package sources and poll tunables. Values come from an optional TOML
//! file with environment variables taking precedence; the environment is
//! read once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use avdpilot_device_bridge::{EmulatorOptions, NetworkState, PollSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// Readiness poll tunables, in config-file form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Poll attempts before giving up
    pub max_attempts: u32,
    /// Seconds between attempts
    pub retry_delay_secs: u64,
    /// Seconds to settle after the device first reports ready
    pub settle_delay_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: avdpilot_device_bridge::readiness::DEFAULT_MAX_ATTEMPTS,
            retry_delay_secs: avdpilot_device_bridge::readiness::DEFAULT_RETRY_DELAY.as_secs(),
            settle_delay_secs: avdpilot_device_bridge::readiness::DEFAULT_SETTLE_DELAY.as_secs(),
        }
    }
}

impl ReadinessConfig {
    pub fn to_poll_settings(&self) -> PollSettings {
        PollSettings {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Android SDK root (`ANDROID_HOME` / `ANDROID_SDK_ROOT`)
    pub sdk_root: PathBuf,
    /// AVD home directory (`ANDROID_AVD_HOME`)
    pub avd_home: PathBuf,
    /// Emulator profile name (`EMULATOR_NAME`)
    pub avd_name: String,
    /// Emulator platform version (`EMULATOR_VERSION`); surfaced to the
    /// external test runner, unused by the lifecycle itself
    pub platform_version: Option<String>,
    /// Directory holding the APKs to install (`APK_DIR`)
    pub apk_dir: PathBuf,
    /// File receiving the captured device log stream
    pub log_file: PathBuf,
    /// Connectivity state to drive during prepare, if any
    pub network: Option<NetworkState>,
    /// Whether `complete` shuts the emulator down. Off by default: the
    /// emulator is left running for inspection and reuse.
    pub stop_emulator_on_complete: bool,
    /// Emulator launch options
    pub emulator: EmulatorOptions,
    /// Boot poll tunables
    pub readiness: ReadinessConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            sdk_root: default_sdk_root(),
            avd_home: default_avd_home(),
            avd_name: "Pixel_5_API_32".to_string(),
            platform_version: None,
            apk_dir: PathBuf::from("apks"),
            log_file: PathBuf::from("logcat.log"),
            network: None,
            stop_emulator_on_complete: false,
            emulator: EmulatorOptions::for_tests(),
            readiness: ReadinessConfig::default(),
        }
    }
}

fn default_sdk_root() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        home.join("Library").join("Android").join("sdk")
    } else if cfg!(windows) {
        home.join("AppData")
            .join("Local")
            .join("Android")
            .join("Sdk")
    } else {
        home.join("Android").join("Sdk")
    }
}

fn default_avd_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".android").join("avd")
}

impl HarnessConfig {
    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply the recognized environment variables
    pub fn apply_env(&mut self) {
        if let Some(sdk) = env_var("ANDROID_HOME").or_else(|| env_var("ANDROID_SDK_ROOT")) {
            self.sdk_root = PathBuf::from(sdk);
        }
        if let Some(avd_home) = env_var("ANDROID_AVD_HOME") {
            self.avd_home = PathBuf::from(avd_home);
        }
        if let Some(name) = env_var("EMULATOR_NAME") {
            self.avd_name = name;
        }
        if let Some(version) = env_var("EMULATOR_VERSION") {
            self.platform_version = Some(version);
        }
        if let Some(apk_dir) = env_var("APK_DIR") {
            self.apk_dir = PathBuf::from(apk_dir);
        }
        debug!(
            "Configuration: sdk_root={:?} avd={} apk_dir={:?}",
            self.sdk_root, self.avd_name, self.apk_dir
        );
    }

    fn validate(&self) -> Result<()> {
        if self.avd_name.is_empty() {
            return Err(HarnessError::Config(
                "emulator profile name must not be empty".to_string(),
            ));
        }
        if self.readiness.max_attempts == 0 {
            return Err(HarnessError::Config(
                "readiness.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.avd_name, "Pixel_5_API_32");
        assert_eq!(config.apk_dir, PathBuf::from("apks"));
        assert!(!config.stop_emulator_on_complete);
        assert!(config.network.is_none());
        assert_eq!(config.readiness.max_attempts, 20);
    }

    #[test]
    fn test_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avdpilot.toml");
        std::fs::write(
            &path,
            r#"
            avd_name = "Pixel_7_API_34"
            apk_dir = "/srv/apks"
            network = "disabled"
            stop_emulator_on_complete = true

            [readiness]
            max_attempts = 5
            retry_delay_secs = 1
            settle_delay_secs = 0
            "#,
        )
        .unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.avd_name, "Pixel_7_API_34");
        assert_eq!(config.apk_dir, PathBuf::from("/srv/apks"));
        assert_eq!(config.network, Some(NetworkState::Disabled));
        assert!(config.stop_emulator_on_complete);

        let poll = config.readiness.to_poll_settings();
        assert_eq!(poll.max_attempts, 5);
        assert_eq!(poll.retry_delay, Duration::from_secs(1));
        assert_eq!(poll.settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HarnessConfig {
            avd_name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
