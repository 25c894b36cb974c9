//! Service lifecycle state machine.
//!
//! # States
//! - Pending: not launched yet
//! - Starting: process launched, readiness check in progress
//! - Ready: readiness check passed
//! - Running: the foreground service has been launched on top of it
//! - Exited(code) / Failed(reason): terminal
//!
//! # State Transitions
//! ```text
//! Pending  → Starting: launch attempt
//! Starting → Ready:    readiness check passed
//! Starting → Failed:   launch or readiness failure
//! Ready    → Running:  foreground launched (same OS process)
//! Ready | Running → Exited | Failed: process terminated
//! ```

use std::fmt;

use serde::Serialize;

use crate::config::ServiceSpec;
use crate::process::{ExitStatus, ProcessHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ServiceState {
    Pending,
    Starting,
    Ready,
    Running,
    Exited(i32),
    Failed(String),
}

impl ServiceState {
    pub fn can_transition_to(&self, next: &ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (Pending, Starting)
                | (Starting, Ready)
                | (Starting, Failed(_))
                | (Starting, Exited(_))
                | (Ready, Running)
                | (Ready, Exited(_))
                | (Ready, Failed(_))
                | (Running, Exited(_))
                | (Running, Failed(_))
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Pending => write!(f, "pending"),
            ServiceState::Starting => write!(f, "starting"),
            ServiceState::Ready => write!(f, "ready"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::Exited(code) => write!(f, "exited({})", code),
            ServiceState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A service spec together with its live state and process, owned by the supervisor.
#[derive(Debug)]
pub struct ServiceRecord {
    pub spec: ServiceSpec,
    state: ServiceState,
    handle: Option<ProcessHandle>,
}

impl ServiceRecord {
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            state: ServiceState::Pending,
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn handle(&self) -> Option<&ProcessHandle> {
        self.handle.as_ref()
    }

    pub fn attach(&mut self, handle: ProcessHandle) {
        self.handle = Some(handle);
    }

    /// Move to `next`, logging the change. Returns false (and leaves the
    /// state alone) when the transition is not allowed.
    pub fn transition(&mut self, next: ServiceState) -> bool {
        if !self.state.can_transition_to(&next) {
            tracing::debug!(
                service = %self.spec.name,
                from = %self.state,
                to = %next,
                "Ignoring state transition"
            );
            return false;
        }

        tracing::info!(
            service = %self.spec.name,
            from = %self.state,
            to = %next,
            "Service state changed"
        );
        self.state = next;
        true
    }

    /// Record termination of the underlying process.
    pub fn mark_exited(&mut self, status: ExitStatus) {
        self.transition(ServiceState::Exited(status.code()));
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            name: self.spec.name.clone(),
            state: self.state.clone(),
        }
    }
}

/// Final view of one service, reported after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub state: ServiceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ServiceRecord {
        ServiceRecord::new(ServiceSpec::auxiliary("haveged", ["/usr/sbin/haveged"]))
    }

    #[test]
    fn follows_the_happy_path() {
        let mut r = record();
        assert_eq!(r.state(), &ServiceState::Pending);
        assert!(r.transition(ServiceState::Starting));
        assert!(r.transition(ServiceState::Ready));
        assert!(r.transition(ServiceState::Running));
        r.mark_exited(ExitStatus::Exited(0));
        assert_eq!(r.state(), &ServiceState::Exited(0));
        assert!(!r.transition(ServiceState::Running));
    }

    #[test]
    fn rejects_skipping_launch() {
        let mut r = record();
        assert!(!r.transition(ServiceState::Ready));
        assert_eq!(r.state(), &ServiceState::Pending);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut r = record();
        r.transition(ServiceState::Starting);
        r.transition(ServiceState::Failed("timed out".into()));
        r.mark_exited(ExitStatus::Exited(143));
        assert_eq!(r.state(), &ServiceState::Failed("timed out".into()));
    }

    #[test]
    fn display_includes_detail() {
        assert_eq!(ServiceState::Exited(3).to_string(), "exited(3)");
        assert_eq!(
            ServiceState::Failed("not found".into()).to_string(),
            "failed: not found"
        );
    }
}
