//! Readiness checking subsystem.
//!
//! # Data Flow
//! ```text
//! Auxiliary launched (lifecycle/startup.rs)
//!     → probe.rs (delay | file exists | process alive)
//!     → Ok: service marked Ready
//!     → Err: startup aborted (required) or warning (optional)
//! ```
//!
//! # Design Decisions
//! - Probes run one at a time, in launch order
//! - Every probe is bounded by the service's timeout
//! - A dead process fails its probe without waiting for the timeout

pub mod probe;

pub use probe::{wait_ready, ReadinessError};
