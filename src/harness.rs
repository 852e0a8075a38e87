use tracing::info;

use crate::config::HarnessConfig;
use crate::error::LaunchError;
use crate::runner::{run_session, RunResult, Timing};
use crate::steps::{standard_sequence, Step};
use crate::supervisor::ServerProcess;

/// Launch the configured server and run the standard MCP sequence against it.
pub async fn execute(config: &HarnessConfig) -> Result<RunResult, LaunchError> {
    let steps = standard_sequence(&config.sequence);
    execute_steps(config, &steps).await
}

/// Launch the configured server and run `steps` against it.
///
/// The server is terminated before this returns, whether the run passes,
/// fails, or is interrupted with Ctrl-C.
pub async fn execute_steps(
    config: &HarnessConfig,
    steps: &[Step],
) -> Result<RunResult, LaunchError> {
    let server = ServerProcess::start(&config.server, config.shutdown_timeout)?;

    info!(
        steps = steps.len(),
        grace = ?config.startup_grace,
        "waiting for server startup"
    );

    let timing = Timing {
        startup_grace: config.startup_grace,
        read_timeout: config.read_timeout,
    };
    Ok(run_session(server, steps, timing, interrupt_signal()).await)
}

async fn interrupt_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never interrupt.
        std::future::pending::<()>().await;
    }
}
