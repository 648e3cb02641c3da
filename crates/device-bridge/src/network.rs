//! Network Connectivity Control
//!
//! Toggles device connectivity through an ordered list of command tiers:
//! the radio-level `svc` commands first, the system-settings layer as
//! fallback. The controller is stateless and always issues the full
//! sequence for the target state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adb::AdbClient;
use crate::command::ExecError;

/// Logical connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Enabled,
    Disabled,
}

impl NetworkState {
    pub fn label(&self) -> &'static str {
        match self {
            NetworkState::Enabled => "enabled",
            NetworkState::Disabled => "disabled",
        }
    }
}

/// Returned when every command tier failed. Callers must treat connectivity
/// control as best-effort and not abort the run on this.
#[derive(Debug, thiserror::Error)]
#[error("all network command tiers failed toggling to {target:?}: {last_error}")]
pub struct NetworkToggleFailed {
    pub target: NetworkState,
    #[source]
    pub last_error: ExecError,
}

/// One named group of shell commands; the group succeeds only if every
/// command in it succeeds.
struct CommandTier {
    name: &'static str,
    commands: Vec<Vec<&'static str>>,
}

fn command_tiers(target: NetworkState) -> Vec<CommandTier> {
    match target {
        NetworkState::Enabled => vec![
            CommandTier {
                name: "svc",
                commands: vec![
                    vec!["svc", "wifi", "enable"],
                    vec!["svc", "data", "enable"],
                ],
            },
            CommandTier {
                name: "settings",
                commands: vec![
                    vec!["settings", "put", "global", "airplane_mode_on", "0"],
                    vec![
                        "am",
                        "broadcast",
                        "-a",
                        "android.intent.action.AIRPLANE_MODE",
                        "--ez",
                        "state",
                        "false",
                    ],
                ],
            },
        ],
        NetworkState::Disabled => vec![
            CommandTier {
                name: "svc",
                commands: vec![
                    vec!["svc", "wifi", "disable"],
                    vec!["svc", "data", "disable"],
                ],
            },
            CommandTier {
                name: "settings",
                commands: vec![
                    vec!["settings", "put", "global", "airplane_mode_on", "1"],
                    vec![
                        "am",
                        "broadcast",
                        "-a",
                        "android.intent.action.AIRPLANE_MODE",
                        "--ez",
                        "state",
                        "true",
                    ],
                ],
            },
        ],
    }
}

/// Network controller
#[derive(Debug, Clone)]
pub struct NetworkController {
    adb: AdbClient,
}

impl NetworkController {
    pub fn new(adb: AdbClient) -> Self {
        Self { adb }
    }

    /// Drive connectivity to the target state.
    ///
    /// Tiers are tried in order; the first tier whose commands all succeed
    /// wins. The failure of every tier is returned as a value, never
    /// panicked, so callers can log and continue.
    pub async fn set_state(&self, target: NetworkState) -> Result<(), NetworkToggleFailed> {
        info!("Setting device network to {}", target.label());

        let mut last_error = None;

        for tier in command_tiers(target) {
            match self.run_tier(&tier).await {
                Ok(()) => {
                    info!("Network {} via {} commands", target.label(), tier.name);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Network {} tier failed ({}), trying next: {}",
                        tier.name,
                        target.label(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(NetworkToggleFailed {
            target,
            // tiers are never empty, so a failure always carries a cause
            last_error: last_error.expect("no command tiers configured"),
        })
    }

    async fn run_tier(&self, tier: &CommandTier) -> Result<(), ExecError> {
        for command in &tier.commands {
            self.adb.shell(command.iter().copied()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedRunner;
    use std::path::Path;
    use std::sync::Arc;

    fn controller(runner: &Arc<ScriptedRunner>) -> NetworkController {
        let runner: Arc<dyn crate::command::CommandRunner> = runner.clone();
        let adb = AdbClient::new(Path::new("/opt/android-sdk"), runner);
        NetworkController::new(adb)
    }

    #[tokio::test]
    async fn test_primary_tier_success_skips_fallback() {
        let runner = Arc::new(ScriptedRunner::new());
        let result = controller(&runner).set_state(NetworkState::Disabled).await;
        assert!(result.is_ok());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("svc wifi disable"));
        assert!(calls[1].contains("svc data disable"));
    }

    #[tokio::test]
    async fn test_fallback_invoked_exactly_once_on_primary_failure() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push_fail(1, "svc: permission denied"); // wifi disable

        let result = controller(&runner).set_state(NetworkState::Disabled).await;
        assert!(result.is_ok());

        let calls = runner.calls();
        // svc tier aborts on its first command; settings tier runs once
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains("svc wifi disable"));
        assert!(calls[1].contains("settings put global airplane_mode_on 1"));
        assert!(calls[2].contains("android.intent.action.AIRPLANE_MODE"));
    }

    #[tokio::test]
    async fn test_both_tiers_failing_returns_error_value() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.push_fail(1, "svc: permission denied");
        runner.push_fail(255, "settings: not allowed");

        let err = controller(&runner)
            .set_state(NetworkState::Enabled)
            .await
            .unwrap_err();
        assert_eq!(err.target, NetworkState::Enabled);
        assert_eq!(err.last_error.exit_code(), Some(255));
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_disable_twice_issues_identical_sequences() {
        let runner = Arc::new(ScriptedRunner::new());
        let controller = controller(&runner);

        controller.set_state(NetworkState::Disabled).await.unwrap();
        controller.set_state(NetworkState::Disabled).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], calls[2]);
        assert_eq!(calls[1], calls[3]);
    }
}
