//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with service / pid / signal fields
//!
//! Consumers:
//!     → stderr (container log driver)
//!     → optional log file
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Children write straight to the inherited stdout/stderr, not through us

pub mod logging;
