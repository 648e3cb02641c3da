//! Package Installation and Verification
//!
//! Extracts a package identifier from an APK via the inspector CLI,
//! installs APKs over adb, and verifies installation against the device's
//! package list. Installed state is always observed fresh from the device.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::adb::AdbClient;
use crate::command::{DeviceCommand, ExecError};

/// First `name='...'` token in `aapt dump badging` output is the package line.
static PACKAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"name='([^']+)'").expect("package name pattern"));

/// Install errors
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("no package name found in inspector output for {path:?}")]
    IdentifierNotFound { path: PathBuf },
    #[error("install of {path:?} failed with exit code {code:?}")]
    InstallFailed { path: PathBuf, code: Option<i32> },
    #[error("device command failed: {0}")]
    Exec(#[from] ExecError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate the aapt binary: newest build-tools directory under the SDK root,
/// falling back to `aapt` on PATH.
pub fn aapt_path(sdk_root: &Path) -> PathBuf {
    let build_tools = sdk_root.join("build-tools");
    let mut versions: Vec<PathBuf> = std::fs::read_dir(&build_tools)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    versions.sort();

    match versions.pop() {
        Some(dir) => {
            if cfg!(windows) {
                dir.join("aapt.exe")
            } else {
                dir.join("aapt")
            }
        }
        None => PathBuf::from("aapt"),
    }
}

/// Package installer and verifier
#[derive(Debug, Clone)]
pub struct PackageInstaller {
    adb: AdbClient,
    aapt: PathBuf,
}

impl PackageInstaller {
    pub fn new(adb: AdbClient, aapt: PathBuf) -> Self {
        Self { adb, aapt }
    }

    /// Installer with aapt resolved from the SDK root
    pub fn for_sdk(adb: AdbClient, sdk_root: &Path) -> Self {
        Self::new(adb, aapt_path(sdk_root))
    }

    /// Extract the package identifier from an APK.
    ///
    /// Runs the inspector's badging dump and takes the first `name='...'`
    /// capture; the identifier is required to be non-empty.
    pub async fn extract_identifier(&self, apk_path: &Path) -> Result<String, InstallError> {
        let command = DeviceCommand::new(self.aapt.to_string_lossy())
            .args(["dump", "badging"])
            .arg(apk_path.to_string_lossy());
        let output = self.adb.runner().run(&command).await?;

        PACKAGE_NAME
            .captures(&output.stdout)
            .map(|c| c[1].to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| InstallError::IdentifierNotFound {
                path: apk_path.to_path_buf(),
            })
    }

    /// Install an APK, replacing any existing version.
    ///
    /// Output is streamed to the trace log as it arrives; succeeds only on
    /// exit code 0.
    pub async fn install(&self, apk_path: &Path) -> Result<(), InstallError> {
        info!("Installing APK {:?}...", apk_path);
        let command = self.adb.install_command(apk_path);
        match self.adb.runner().run_streamed(&command).await {
            Ok(_) => Ok(()),
            Err(ExecError::NonZeroExit { code, .. }) => Err(InstallError::InstallFailed {
                path: apk_path.to_path_buf(),
                code,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a package with the given identifier is installed.
    ///
    /// Queries the device's package listing filtered by identifier; true iff
    /// the identifier appears verbatim in the output.
    pub async fn is_installed(&self, identifier: &str) -> Result<bool, InstallError> {
        let output = self.adb.shell(["pm", "list", "packages", identifier]).await?;
        Ok(output.contains(identifier))
    }

    /// Install every `.apk` in a directory (non-recursive), in file-name
    /// order. Fail-fast: the first failure aborts the batch, because a
    /// partially-installed batch is not a valid basis for running tests.
    pub async fn install_all(&self, directory: &Path) -> Result<(), InstallError> {
        let mut apks = Vec::new();
        let mut entries = tokio::fs::read_dir(directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "apk") {
                apks.push(path);
            }
        }
        apks.sort();

        if apks.is_empty() {
            debug!("No APKs found in {:?}", directory);
            return Ok(());
        }

        info!("Installing {} APK(s) from {:?}", apks.len(), directory);
        for apk in &apks {
            self.install(apk).await?;
        }
        Ok(())
    }
}
