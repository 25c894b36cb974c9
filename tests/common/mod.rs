//! Shared utilities for supervisor integration tests.

use std::path::Path;
use std::time::Duration;

use container_init::config::ServiceSpec;
use container_init::service::SupervisorPlan;
use container_init::{RunReport, SignalRelay, SignalSender, Supervisor, SupervisorError, SupervisorOptions};

/// Options used by every test: short grace, no orphan sweep (tests share one process).
pub fn options() -> SupervisorOptions {
    SupervisorOptions {
        shutdown_grace: Duration::from_secs(2),
        sweep_orphans: false,
    }
}

/// An auxiliary service running a shell script.
pub fn sh_aux(name: &str, script: &str) -> ServiceSpec {
    ServiceSpec::auxiliary(name, ["/bin/sh", "-c", script])
}

/// The foreground service running a shell script.
pub fn sh_fg(name: &str, script: &str) -> ServiceSpec {
    ServiceSpec::foreground(name, ["/bin/sh", "-c", script])
}

/// Build a supervisor for `specs` and return it with the sender feeding its relay.
pub fn supervisor(
    specs: Vec<ServiceSpec>,
    options: SupervisorOptions,
) -> (Supervisor, SignalSender, SignalRelay) {
    let plan = SupervisorPlan::new(specs).expect("valid plan");
    let (sender, relay) = SignalRelay::channel();
    (Supervisor::new(plan, options), sender, relay)
}

/// Run `specs` to completion with no signals.
pub async fn run(specs: Vec<ServiceSpec>) -> Result<RunReport, SupervisorError> {
    let (supervisor, _sender, relay) = supervisor(specs, options());
    supervisor.run(relay).await
}

/// Send `signal` through `sender` after `delay`.
#[allow(dead_code)]
pub fn send_later(sender: SignalSender, delay: Duration, signal: nix::sys::signal::Signal) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        sender.send(signal);
    });
}

/// Lines of a text file, or nothing if it does not exist.
#[allow(dead_code)]
pub fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
