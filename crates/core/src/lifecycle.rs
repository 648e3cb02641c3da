//! Lifecycle Orchestration
//!
//! Sequences the device bridge into the two hooks the external test runner
//! calls: `prepare` (start emulator, wait for boot, capture logs, toggle
//! network, install packages) and `complete` (stop background processes).
//! Steps run strictly in order; later steps depend on the device state
//! established by earlier ones.

use std::path::Path;
use std::sync::Arc;

use avdpilot_device_bridge::{
    emulator, AdbClient, CommandRunner, NetworkController, NetworkState, PackageInstaller,
    ProcessKind, ProcessRunner, ProcessSupervisor, ReadinessPoller,
};
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started
    Idle,
    /// Prepare in progress
    Preparing,
    /// Device booted, packages installed, tests may run
    Ready,
    /// A prepare step failed; only teardown is valid
    Failed,
}

/// Lifecycle orchestrator
///
/// Owns the process supervisor and all device-facing components; no device
/// state is assumed between calls beyond the background process handles.
pub struct Lifecycle {
    config: HarnessConfig,
    adb: AdbClient,
    supervisor: ProcessSupervisor,
    poller: ReadinessPoller,
    network: NetworkController,
    installer: PackageInstaller,
    phase: Phase,
}

impl Lifecycle {
    /// Orchestrator running real device commands
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    /// Orchestrator with a caller-supplied command runner
    pub fn with_runner(config: HarnessConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let adb = AdbClient::new(&config.sdk_root, runner);
        let poller = ReadinessPoller::new(config.readiness.to_poll_settings());
        let network = NetworkController::new(adb.clone());
        let installer = PackageInstaller::for_sdk(adb.clone(), &config.sdk_root);

        Self {
            config,
            adb,
            supervisor: ProcessSupervisor::new(),
            poller,
            network,
            installer,
            phase: Phase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The configuration in effect
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The adb client, for collaborators that issue their own queries
    pub fn adb(&self) -> &AdbClient {
        &self.adb
    }

    /// Bring the device to a verified-ready, fully-installed state.
    ///
    /// Valid once per run, from the idle phase. Any fatal step failure
    /// leaves the orchestrator in the failed phase and propagates; there is
    /// no whole-cycle retry here, that policy belongs to the caller.
    pub async fn prepare(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(HarnessError::InvalidState(format!(
                "prepare is only valid from the idle phase (currently {:?})",
                self.phase
            )));
        }
        self.phase = Phase::Preparing;
        info!("Preparing device environment...");

        match self.run_prepare().await {
            Ok(()) => {
                info!("Device environment ready");
                self.phase = Phase::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Prepare failed: {}", e);
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    async fn run_prepare(&mut self) -> Result<()> {
        let launch = emulator::launch_command(
            &self.config.sdk_root,
            &self.config.avd_name,
            &self.config.emulator,
        );
        self.supervisor
            .start(ProcessKind::Emulator, launch, None)
            .await?;

        self.poller.wait_until_ready(&self.adb).await?;

        self.supervisor
            .start(
                ProcessKind::Logcat,
                self.adb.logcat_command(),
                Some(&self.config.log_file),
            )
            .await?;

        if let Some(target) = self.config.network {
            // connectivity control is best-effort; a failed toggle never
            // aborts prepare
            if let Err(e) = self.network.set_state(target).await {
                warn!("Network toggle failed, continuing: {}", e);
            }
        }

        self.installer.install_all(&self.config.apk_dir).await?;
        Ok(())
    }

    /// Tear down background processes.
    ///
    /// Safe from any phase, including after a partially-failed prepare. The
    /// emulator is shut down only when configured; otherwise its handle is
    /// detached and the process left running for inspection or reuse.
    pub async fn complete(&mut self) -> Result<()> {
        info!("Cleaning up device environment...");

        self.supervisor.stop(ProcessKind::Logcat).await;

        if self.config.stop_emulator_on_complete {
            if let Err(e) = self.adb.emu_kill().await {
                warn!("Emulator console kill failed: {}", e);
            }
            self.supervisor.stop(ProcessKind::Emulator).await;
        } else {
            self.supervisor.detach(ProcessKind::Emulator);
        }

        self.phase = Phase::Idle;
        Ok(())
    }

    /// Extract the package identifier from an APK
    pub async fn package_identifier(&self, apk_path: &Path) -> Result<String> {
        Ok(self.installer.extract_identifier(apk_path).await?)
    }

    /// Whether a package with the given identifier is installed, observed
    /// fresh from the device
    pub async fn is_installed(&self, identifier: &str) -> Result<bool> {
        Ok(self.installer.is_installed(identifier).await?)
    }

    /// Drive connectivity to the target state (best-effort tiers)
    pub async fn set_network(&self, target: NetworkState) -> Result<()> {
        Ok(self.network.set_state(target).await?)
    }
}
