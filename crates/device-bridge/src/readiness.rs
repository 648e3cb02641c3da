//! Boot Readiness Polling
//!
//! Polls device boot state until the OS reports a finished boot or the
//! attempt budget runs out. Boot state is read fresh on every poll; the
//! device can change underneath us at any time.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::adb::AdbClient;

/// Default poll budget. Boot time is bounded, so the poll uses a fixed
/// interval rather than exponential backoff.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
/// Default delay between poll attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Default settle time after the ready condition first holds, absorbing
/// services that report ready before they finish initializing.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Readiness errors
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("device did not become ready within {attempts} attempts")]
    NotReadyTimeout { attempts: u32 },
}

/// Tunables for the boot poll
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Ready iff the boot-completed property reads "1" and the boot animation
/// service has stopped.
fn is_booted(boot_completed: &str, boot_anim: &str) -> bool {
    boot_completed == "1" && boot_anim == "stopped"
}

/// Readiness poller
#[derive(Debug, Clone, Default)]
pub struct ReadinessPoller {
    settings: PollSettings,
}

impl ReadinessPoller {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    /// Poll until the device reports a finished boot.
    ///
    /// Each attempt blocks on the device transport, then reads the boot
    /// properties fresh. Exhausting the budget is fatal to the caller's
    /// prepare phase; proceeding against an unready device produces
    /// meaningless test results.
    pub async fn wait_until_ready(&self, adb: &AdbClient) -> Result<(), ReadinessError> {
        let settings = &self.settings;

        for attempt in 1..=settings.max_attempts {
            match self.poll_once(adb).await {
                Ok(true) => {
                    info!("Device is fully booted (attempt {})", attempt);
                    tokio::time::sleep(settings.settle_delay).await;
                    return Ok(());
                }
                Ok(false) => {
                    debug!(
                        "Device not ready yet (attempt {}/{})",
                        attempt, settings.max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Boot state query failed (attempt {}/{}): {}",
                        attempt, settings.max_attempts, e
                    );
                }
            }
            tokio::time::sleep(settings.retry_delay).await;
        }

        Err(ReadinessError::NotReadyTimeout {
            attempts: settings.max_attempts,
        })
    }

    async fn poll_once(&self, adb: &AdbClient) -> Result<bool, crate::command::ExecError> {
        adb.wait_for_device().await?;
        let boot_completed = adb.get_prop("sys.boot_completed").await?;
        let boot_anim = adb.get_prop("init.svc.bootanim").await?;
        Ok(is_booted(&boot_completed, &boot_anim))
    }
}
