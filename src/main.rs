//! AvdPilot entry point
//!
//! Wraps an external test command in the device lifecycle: prepare the
//! emulator environment, run the command, tear the environment down, and
//! exit with the command's status.

use std::path::PathBuf;

use anyhow::Result;
use avdpilot::core::{HarnessConfig, Lifecycle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("{} v{} starting...", avdpilot::APP_NAME, avdpilot::VERSION);

    let config_path = std::env::var_os("AVDPILOT_CONFIG").map(PathBuf::from);
    let config = HarnessConfig::load(config_path.as_deref())?;

    let test_command: Vec<String> = std::env::args().skip(1).collect();

    let mut lifecycle = Lifecycle::new(config);

    if let Err(e) = lifecycle.prepare().await {
        error!("Environment preparation failed: {}", e);
        lifecycle.complete().await?;
        std::process::exit(1);
    }

    let status = if test_command.is_empty() {
        info!("No test command given; device environment is ready");
        0
    } else {
        run_test_command(&test_command).await
    };

    lifecycle.complete().await?;
    std::process::exit(status);
}

/// Run the wrapped test command with inherited stdio, returning its exit
/// code (1 if it could not be spawned or was killed by a signal).
async fn run_test_command(argv: &[String]) -> i32 {
    info!("Running test command: {}", argv.join(" "));
    match tokio::process::Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .await
    {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            error!("Failed to run test command: {}", e);
            1
        }
    }
}
