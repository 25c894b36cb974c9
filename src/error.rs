//! Supervisor error taxonomy and exit codes.

use std::io;

use nix::sys::signal::Signal;
use thiserror::Error;

use crate::readiness::ReadinessError;

/// Exit codes reserved by the supervisor itself.
pub mod exit_code {
    /// A required auxiliary service failed to launch or become ready.
    pub const STARTUP_FAILURE: i32 = 69;
    /// The foreground executable exists but could not be launched.
    pub const LAUNCH_FAILURE: i32 = 126;
    /// The foreground executable was not found.
    pub const LAUNCH_NOT_FOUND: i32 = 127;
    /// The configuration could not be read or is invalid.
    pub const CONFIG: i32 = 78;
    /// Base added to a signal number, as shells do.
    pub const SIGNAL_BASE: i32 = 128;
}

/// Fatal conditions that end a run before the foreground service exits on its own.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required auxiliary service never became ready.
    #[error("required service `{service}` failed to become ready: {source}")]
    Startup {
        service: String,
        #[source]
        source: ReadinessError,
    },

    /// The OS refused to create the process.
    #[error("failed to launch service `{service}`: {source}")]
    Launch {
        service: String,
        foreground: bool,
        #[source]
        source: io::Error,
    },

    /// A termination signal arrived while auxiliaries were starting.
    #[error("startup interrupted by {0:?}")]
    Interrupted(Signal),
}

impl SupervisorError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Startup { .. } => exit_code::STARTUP_FAILURE,
            SupervisorError::Launch {
                foreground: false, ..
            } => exit_code::STARTUP_FAILURE,
            SupervisorError::Launch { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                exit_code::LAUNCH_NOT_FOUND
            }
            SupervisorError::Launch { .. } => exit_code::LAUNCH_FAILURE,
            SupervisorError::Interrupted(signal) => exit_code::SIGNAL_BASE + *signal as i32,
        }
    }
}
