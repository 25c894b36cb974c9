//! Shutdown coordination.
//!
//! # Responsibilities
//! - Stop services in reverse launch order
//! - Escalate SIGTERM to SIGKILL once the grace period is spent
//!
//! # Design Decisions
//! - One deadline shared by all services, so the whole teardown is bounded
//!   by the grace period
//! - A forced kill is logged but never changes the run's exit code

use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::time::{self, Instant};

use crate::process::{ExitStatus, ProcessHandle};
use crate::service::ServiceRecord;

/// How long to wait for the reaper after SIGKILL. A process in
/// uninterruptible sleep may never die.
const KILL_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process was already gone before shutdown reached it.
    AlreadyExited(ExitStatus),
    /// The process exited after SIGTERM.
    Graceful(ExitStatus),
    /// The process ignored SIGTERM until the deadline and was killed.
    ForceKilled(ExitStatus),
}

impl StopOutcome {
    pub fn status(&self) -> ExitStatus {
        match self {
            StopOutcome::AlreadyExited(status)
            | StopOutcome::Graceful(status)
            | StopOutcome::ForceKilled(status) => *status,
        }
    }
}

/// SIGTERM `handle`, then SIGKILL it if it outlives `deadline`.
pub async fn stop_process(handle: &ProcessHandle, deadline: Instant) -> StopOutcome {
    if let Some(status) = handle.try_status() {
        return StopOutcome::AlreadyExited(status);
    }

    if let Err(e) = handle.signal(Signal::SIGTERM) {
        tracing::warn!(service = %handle.name(), error = %e, "Failed to send SIGTERM");
    }

    match time::timeout_at(deadline, handle.wait()).await {
        Ok(status) => StopOutcome::Graceful(status),
        Err(_) => {
            tracing::warn!(service = %handle.name(), pid = %handle.pid(), "Shutdown grace period expired, sending SIGKILL");
            if let Err(e) = handle.signal(Signal::SIGKILL) {
                tracing::warn!(service = %handle.name(), error = %e, "Failed to send SIGKILL");
            }
            match time::timeout(KILL_WAIT, handle.wait()).await {
                Ok(status) => StopOutcome::ForceKilled(status),
                Err(_) => {
                    tracing::error!(service = %handle.name(), pid = %handle.pid(), "Process survived SIGKILL, abandoning it");
                    StopOutcome::ForceKilled(ExitStatus::Unknown)
                }
            }
        }
    }
}

/// Stop every launched service in `records`, last launched first.
pub async fn stop_services(
    records: &mut [ServiceRecord],
    grace: Duration,
) -> Vec<(String, StopOutcome)> {
    let deadline = Instant::now() + grace;
    let mut outcomes = Vec::new();

    for record in records.iter_mut().rev() {
        let Some(handle) = record.handle().cloned() else {
            continue;
        };

        let outcome = stop_process(&handle, deadline).await;
        let status = outcome.status();
        match outcome {
            StopOutcome::ForceKilled(_) => {
                tracing::warn!(service = %record.name(), status = %status, "Service killed after ignoring SIGTERM")
            }
            _ => tracing::info!(service = %record.name(), status = %status, "Service stopped"),
        }

        record.mark_exited(status);
        outcomes.push((record.name().to_string(), outcome));
    }

    outcomes
}
