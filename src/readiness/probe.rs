//! Readiness probes.
//!
//! # Responsibilities
//! - Decide when a freshly launched auxiliary service is usable
//! - Bound every probe with the service's readiness timeout
//! - Fail early when the probed process dies
//!
//! A process that exits with status 0 during a delay or file probe is taken
//! to have daemonised; its forked half keeps running out of our sight.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::config::ReadinessCheck;
use crate::process::{ExitStatus, ProcessHandle};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error("not ready after {0:?}")]
    Timeout(Duration),

    #[error("process terminated during readiness check ({0})")]
    Exited(ExitStatus),
}

/// Wait until `handle` passes `check`, or fail after `timeout`.
/// No check means ready on launch.
pub async fn wait_ready(
    check: Option<&ReadinessCheck>,
    handle: &ProcessHandle,
    timeout: Duration,
) -> Result<(), ReadinessError> {
    let Some(check) = check else {
        return Ok(());
    };

    tracing::debug!(service = %handle.name(), check = ?check, "Waiting for readiness");

    match time::timeout(timeout, probe(check, handle)).await {
        Ok(result) => result,
        Err(_) => Err(ReadinessError::Timeout(timeout)),
    }
}

async fn probe(check: &ReadinessCheck, handle: &ProcessHandle) -> Result<(), ReadinessError> {
    match check {
        ReadinessCheck::Delay { delay_ms } => {
            time::sleep(Duration::from_millis(*delay_ms)).await;
            check_not_failed(handle)
        }
        ReadinessCheck::FileExists { path, poll_ms } => {
            let interval = Duration::from_millis(*poll_ms);
            loop {
                if file_exists(path).await {
                    return Ok(());
                }
                check_not_failed(handle)?;
                time::sleep(interval).await;
            }
        }
        ReadinessCheck::ProcessAlive { settle_ms } => {
            tokio::select! {
                status = handle.wait() => Err(ReadinessError::Exited(status)),
                _ = time::sleep(Duration::from_millis(*settle_ms)) => Ok(()),
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn check_not_failed(handle: &ProcessHandle) -> Result<(), ReadinessError> {
    match handle.try_status() {
        Some(status) if !status.success() => Err(ReadinessError::Exited(status)),
        _ => Ok(()),
    }
}
