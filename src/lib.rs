//! Container entrypoint supervisor library.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod process;
pub mod readiness;
pub mod service;
pub mod supervisor;

pub use config::schema::SupervisorConfig;
pub use error::SupervisorError;
pub use lifecycle::signals::{SignalRelay, SignalSender};
pub use supervisor::{RunReport, Supervisor, SupervisorOptions};
