//! Service model.
//!
//! # Data Flow
//! ```text
//! Vec<ServiceSpec> (config)
//!     → plan.rs (validated SupervisorPlan)
//!     → state.rs (one ServiceRecord per spec, owned by the supervisor)
//! ```

pub mod plan;
pub mod state;

pub use plan::SupervisorPlan;
pub use state::{ServiceRecord, ServiceState, ServiceSummary};
