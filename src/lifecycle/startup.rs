//! Startup orchestration.
//!
//! # Responsibilities
//! - Launch auxiliary services one by one, in list order
//! - Wait for each readiness check before launching the next
//! - Abort on a termination signal or a failed required service
//!
//! # Design Decisions
//! - Fail fast: a required service that does not become ready is fatal
//! - Services start in order, not concurrently
//! - The foreground service starts last (only once dependencies are ready)

use crate::error::SupervisorError;
use crate::lifecycle::signals::{is_termination, SignalRelay};
use crate::process::{command_for, ProcessTable, Role};
use crate::readiness::wait_ready;
use crate::service::{ServiceRecord, ServiceState};

/// Bring every record in `auxiliaries` to Ready, in order.
pub async fn start_auxiliaries(
    auxiliaries: &mut [ServiceRecord],
    table: &'static ProcessTable,
    relay: &mut SignalRelay,
) -> Result<(), SupervisorError> {
    for record in auxiliaries.iter_mut() {
        start_auxiliary(record, table, relay).await?;
    }
    Ok(())
}

async fn start_auxiliary(
    record: &mut ServiceRecord,
    table: &'static ProcessTable,
    relay: &mut SignalRelay,
) -> Result<(), SupervisorError> {
    let spec = record.spec.clone();
    record.transition(ServiceState::Starting);

    let launched = command_for(&spec, Role::Auxiliary).and_then(|c| table.spawn(&spec.name, c));
    let handle = match launched {
        Ok(handle) => handle,
        Err(source) => {
            record.transition(ServiceState::Failed(format!("launch failed: {}", source)));
            if spec.required {
                return Err(SupervisorError::Launch {
                    service: spec.name,
                    foreground: false,
                    source,
                });
            }
            tracing::warn!(service = %spec.name, error = %source, "Optional service failed to launch, continuing");
            return Ok(());
        }
    };

    tracing::info!(service = %spec.name, pid = %handle.pid(), "Service launched");
    record.attach(handle.clone());

    let result = {
        let readiness = wait_ready(spec.readiness.as_ref(), &handle, spec.ready_timeout());
        tokio::pin!(readiness);

        loop {
            tokio::select! {
                result = &mut readiness => break result,
                signal = relay.recv() => {
                    if is_termination(signal) {
                        tracing::warn!(service = %spec.name, signal = ?signal, "Termination requested during startup");
                        return Err(SupervisorError::Interrupted(signal));
                    }
                    tracing::debug!(signal = ?signal, "Ignoring signal during startup");
                }
            }
        }
    };

    match result {
        Ok(()) => {
            record.transition(ServiceState::Ready);
            Ok(())
        }
        Err(reason) => {
            record.transition(ServiceState::Failed(reason.to_string()));
            if spec.required {
                tracing::error!(service = %spec.name, error = %reason, "Required service not ready");
                return Err(SupervisorError::Startup {
                    service: spec.name,
                    source: reason,
                });
            }
            tracing::warn!(service = %spec.name, error = %reason, "Optional service not ready, continuing");
            Ok(())
        }
    }
}
