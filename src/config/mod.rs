//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in default plan
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SupervisorConfig (validated, immutable)
//!     → handed to the supervisor by value
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::LogFormat;
pub use schema::LoggingConfig;
pub use schema::ReadinessCheck;
pub use schema::ServiceSpec;
pub use schema::SupervisorConfig;
pub use schema::SupervisorSettings;
