//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the init.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the container init.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Process-wide supervisor settings.
    pub supervisor: SupervisorSettings,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Ordered service list. The foreground service comes last.
    pub services: Vec<ServiceSpec>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorSettings::default(),
            logging: LoggingConfig::default(),
            services: default_services(),
        }
    }
}

/// The plan used when no configuration file is present: device manager,
/// then entropy daemon, then sshd in the foreground.
pub fn default_services() -> Vec<ServiceSpec> {
    vec![
        ServiceSpec::auxiliary("udevd", ["/sbin/udevd", "--daemon"])
            .with_readiness(ReadinessCheck::FileExists {
                path: PathBuf::from("/run/udev/control"),
                poll_ms: default_poll_ms(),
            })
            .optional(),
        ServiceSpec::auxiliary("haveged", ["/usr/sbin/haveged", "-F"])
            .with_readiness(ReadinessCheck::ProcessAlive { settle_ms: 500 }),
        ServiceSpec::foreground("sshd", ["/usr/sbin/sshd", "-D", "-e"]),
    ]
}

/// Supervisor-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorSettings {
    /// Time granted to services between SIGTERM and SIGKILL at shutdown.
    pub shutdown_grace_ms: u64,

    /// Register as child subreaper when not running as PID 1.
    pub subreaper: bool,

    /// Terminate unmanaged children (daemonised forks) at shutdown.
    pub sweep_orphans: bool,
}

impl SupervisorSettings {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 5_000,
            subreaper: true,
            sweep_orphans: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub level: String,

    /// Output format on stderr.
    pub format: LogFormat,

    /// Optional file that receives a copy of every log line.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Declarative description of one managed service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceSpec {
    /// Unique service identifier used in logs.
    pub name: String,

    /// Executable path followed by its arguments.
    pub command: Vec<String>,

    /// Extra environment variables for the child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// How to decide the service is usable. `None` means ready on launch.
    #[serde(default)]
    pub readiness: Option<ReadinessCheck>,

    /// Upper bound on the readiness check in milliseconds.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Abort startup if this service fails to become ready.
    #[serde(default = "default_required")]
    pub required: bool,

    /// The service whose exit ends the run. Exactly one per plan.
    #[serde(default)]
    pub foreground: bool,
}

fn default_ready_timeout_ms() -> u64 {
    10_000
}

fn default_required() -> bool {
    true
}

fn default_poll_ms() -> u64 {
    50
}

fn default_settle_ms() -> u64 {
    200
}

impl ServiceSpec {
    fn new<I, S>(name: &str, command: I, foreground: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            command: command.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            readiness: None,
            ready_timeout_ms: default_ready_timeout_ms(),
            required: default_required(),
            foreground,
        }
    }

    /// A required auxiliary service with no readiness check.
    pub fn auxiliary<I, S>(name: &str, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, command, false)
    }

    /// The foreground service.
    pub fn foreground<I, S>(name: &str, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, command, true)
    }

    pub fn with_readiness(mut self, check: ReadinessCheck) -> Self {
        self.readiness = Some(check);
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Failure to become ready is logged instead of aborting startup.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Executable path, if the command is non-empty.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or(&[])
    }
}

/// Readiness probe applied after an auxiliary service is launched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadinessCheck {
    /// Ready once the delay elapsed, unless the process failed meanwhile.
    Delay { delay_ms: u64 },

    /// Ready once `path` exists.
    FileExists {
        path: PathBuf,
        #[serde(default = "default_poll_ms")]
        poll_ms: u64,
    },

    /// Ready if the process is still running after the settle window.
    ProcessAlive {
        #[serde(default = "default_settle_ms")]
        settle_ms: u64,
    },
}
