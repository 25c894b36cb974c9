//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     for each auxiliary → launch → readiness check → Ready
//!
//! Shutdown (shutdown.rs):
//!     Foreground exited → SIGTERM auxiliaries (reverse order) → SIGKILL stragglers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/SIGQUIT during startup → abort, tear down
//!     any forwarded signal while running → foreground process group
//! ```
//!
//! # Design Decisions
//! - Ordered startup: auxiliaries first, foreground last
//! - Ordered shutdown: reverse launch order
//! - Shutdown has timeout: forced kill after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
