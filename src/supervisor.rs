//! The entrypoint supervisor.
//!
//! # Data Flow
//! ```text
//! SupervisorPlan
//!     → startup: auxiliaries launched and probed in order
//!     → foreground launched, auxiliaries marked Running
//!     → signals relayed to the foreground until it exits
//!     → shutdown: auxiliaries stopped in reverse order, orphans swept
//!     → RunReport (foreground exit status) or SupervisorError
//! ```

use std::time::Duration;

use nix::sys::signal::Signal;
use serde::Serialize;

use crate::config::validation::ValidationError;
use crate::config::{SupervisorConfig, SupervisorSettings};
use crate::error::SupervisorError;
use crate::lifecycle::shutdown::stop_services;
use crate::lifecycle::signals::{is_termination, SignalRelay};
use crate::lifecycle::startup::start_auxiliaries;
use crate::process::orphans::sweep_orphans;
use crate::process::{command_for, ExitStatus, ProcessHandle, ProcessTable, Role};
use crate::service::{ServiceRecord, ServiceState, ServiceSummary, SupervisorPlan};

/// Runtime knobs that are not part of the service plan.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Time between SIGTERM and SIGKILL for the whole teardown.
    pub shutdown_grace: Duration,
    /// Terminate unmanaged children after the managed ones.
    pub sweep_orphans: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self::from(&SupervisorSettings::default())
    }
}

impl From<&SupervisorSettings> for SupervisorOptions {
    fn from(settings: &SupervisorSettings) -> Self {
        Self {
            shutdown_grace: settings.shutdown_grace(),
            sweep_orphans: settings.sweep_orphans,
        }
    }
}

/// Outcome of a run in which the foreground service was launched.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub exit_code: i32,
    pub services: Vec<ServiceSummary>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSummary> {
        self.services.iter().find(|s| s.name == name)
    }
}

pub struct Supervisor {
    plan: SupervisorPlan,
    options: SupervisorOptions,
    table: &'static ProcessTable,
}

impl Supervisor {
    pub fn new(plan: SupervisorPlan, options: SupervisorOptions) -> Self {
        Self {
            plan,
            options,
            table: ProcessTable::global(),
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Result<Self, Vec<ValidationError>> {
        let plan = SupervisorPlan::new(config.services.clone())?;
        Ok(Self::new(plan, SupervisorOptions::from(&config.supervisor)))
    }

    pub fn plan(&self) -> &SupervisorPlan {
        &self.plan
    }

    /// Start the auxiliaries, run the foreground service to completion and
    /// tear everything down again.
    pub async fn run(self, mut relay: SignalRelay) -> Result<RunReport, SupervisorError> {
        let Supervisor {
            plan,
            options,
            table,
        } = self;

        let mut records: Vec<ServiceRecord> = plan
            .into_services()
            .into_iter()
            .map(ServiceRecord::new)
            .collect();
        tracing::info!(services = records.len(), "Starting services");

        let last = records.len() - 1;
        let (auxiliaries, foreground) = records.split_at_mut(last);
        let foreground = &mut foreground[0];

        if let Err(e) = start_auxiliaries(auxiliaries, table, &mut relay).await {
            tracing::error!(error = %e, "Startup failed, stopping started services");
            finish(auxiliaries, &options, table).await;
            return Err(e);
        }

        let handle = match launch_foreground(foreground, table) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Foreground launch failed, stopping services");
                finish(auxiliaries, &options, table).await;
                return Err(e);
            }
        };

        for record in auxiliaries.iter_mut() {
            if record.state() == &ServiceState::Ready {
                record.transition(ServiceState::Running);
            }
        }

        let status = supervise(&handle, &mut relay).await;
        tracing::info!(service = %foreground.name(), status = %status, "Foreground service exited");
        foreground.mark_exited(status);

        finish(auxiliaries, &options, table).await;

        Ok(RunReport {
            exit_code: status.code(),
            services: records.iter().map(ServiceRecord::summary).collect(),
        })
    }
}

fn launch_foreground(
    record: &mut ServiceRecord,
    table: &'static ProcessTable,
) -> Result<ProcessHandle, SupervisorError> {
    record.transition(ServiceState::Starting);

    let launched = command_for(&record.spec, Role::Foreground)
        .and_then(|c| table.spawn(&record.spec.name, c));
    let handle = match launched {
        Ok(handle) => handle,
        Err(source) => {
            record.transition(ServiceState::Failed(format!("launch failed: {}", source)));
            return Err(SupervisorError::Launch {
                service: record.spec.name.clone(),
                foreground: true,
                source,
            });
        }
    };

    tracing::info!(service = %record.name(), pid = %handle.pid(), "Foreground service launched");
    record.attach(handle.clone());
    record.transition(ServiceState::Ready);
    record.transition(ServiceState::Running);
    Ok(handle)
}

/// Relay signals to the foreground until it exits. A second termination
/// signal is escalated to SIGKILL.
async fn supervise(handle: &ProcessHandle, relay: &mut SignalRelay) -> ExitStatus {
    let exit = handle.wait();
    tokio::pin!(exit);
    let mut terminations = 0u32;

    loop {
        tokio::select! {
            status = &mut exit => return status,
            received = relay.recv() => {
                let mut forwarded = received;
                if is_termination(received) {
                    terminations += 1;
                    if terminations > 1 {
                        tracing::warn!(signal = ?received, "Repeated termination request, killing foreground service");
                        forwarded = Signal::SIGKILL;
                    }
                }

                tracing::info!(service = %handle.name(), signal = ?forwarded, "Forwarding signal");
                if let Err(e) = handle.signal(forwarded) {
                    tracing::warn!(service = %handle.name(), signal = ?forwarded, error = %e, "Failed to forward signal");
                }
            }
        }
    }
}

async fn finish(auxiliaries: &mut [ServiceRecord], options: &SupervisorOptions, table: &ProcessTable) {
    stop_services(auxiliaries, options.shutdown_grace).await;

    if options.sweep_orphans {
        let swept = sweep_orphans(table, options.shutdown_grace).await;
        if swept > 0 {
            tracing::info!(count = swept, "Orphaned processes terminated");
        }
    }
}
