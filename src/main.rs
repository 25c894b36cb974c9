//! container-init
//!
//! Entrypoint for a container that needs a few system daemons running before
//! its main service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   CONTAINER-INIT                      │
//!                 │                                                       │
//!  config.toml ──▶│  config ──▶ service plan ──▶ lifecycle::startup       │
//!                 │                                   │                   │
//!                 │                                   ▼                   │
//!                 │   aux #1 ──▶ readiness ──▶ aux #2 ──▶ ... ──▶ fg      │
//!                 │                                               │       │
//!   SIGTERM ─────▶│  lifecycle::signals ──── forward ────────────▶│       │
//!                 │                                               ▼       │
//!                 │  lifecycle::shutdown ◀── foreground exit status       │
//!                 │  (reverse order, grace, SIGKILL)                      │
//!                 │                                                       │
//!                 │  process::table reaper thread: reaps every child      │
//!                 └──────────────────────────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                                 exit code of foreground
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use container_init::config::loader::{load_config, load_config_or_default, ConfigError};
use container_init::config::SupervisorConfig;
use container_init::error::exit_code;
use container_init::observability::logging;
use container_init::process::{become_subreaper, is_pid1};
use container_init::{SignalRelay, Supervisor};

const DEFAULT_CONFIG_PATH: &str = "/etc/container-init.toml";

#[derive(Parser)]
#[command(name = "container-init")]
#[command(about = "Starts auxiliary services in order, then supervises the foreground one", long_about = None)]
struct Cli {
    /// Configuration file. The built-in plan is used if the default path does not exist.
    #[arg(short, long, env = "CONTAINER_INIT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level or filter directives, overriding `RUST_LOG` and the configuration file.
    #[arg(long, env = "CONTAINER_INIT_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start services and supervise the foreground one (default)
    Run,
    /// Validate the configuration and print the resolved plan
    Check,
}

fn load(path: &Path) -> Result<SupervisorConfig, ConfigError> {
    if path == Path::new(DEFAULT_CONFIG_PATH) {
        load_config_or_default(path)
    } else {
        load_config(path)
    }
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(&Default::default(), cli.log_level.as_deref());
            tracing::error!(path = %cli.config.display(), error = %e, "Invalid configuration");
            return exit_with(exit_code::CONFIG);
        }
    };

    if let Err(e) = logging::init(&config.logging, cli.log_level.as_deref()) {
        eprintln!("container-init: {}", e);
        return exit_with(exit_code::CONFIG);
    }

    if let Some(Commands::Check) = cli.command {
        return match serde_json::to_string_pretty(&config) {
            Ok(plan) => {
                println!("{}", plan);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to render configuration");
                exit_with(exit_code::CONFIG)
            }
        };
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid1 = is_pid1(),
        services = config.services.len(),
        "container-init starting"
    );

    if config.supervisor.subreaper && !is_pid1() {
        if let Err(e) = become_subreaper() {
            tracing::warn!(error = %e, "Unable to become child subreaper");
        }
    }

    let relay = match SignalRelay::from_os() {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return exit_with(exit_code::STARTUP_FAILURE);
        }
    };

    let supervisor = match Supervisor::from_config(&config) {
        Ok(supervisor) => supervisor,
        Err(errors) => {
            let e = ConfigError::Validation(errors);
            tracing::error!(error = %e, "Invalid service plan");
            return exit_with(exit_code::CONFIG);
        }
    };

    let plan = supervisor.plan();
    let auxiliaries: Vec<&str> = plan.auxiliaries().iter().map(|s| s.name.as_str()).collect();
    tracing::info!(
        auxiliaries = ?auxiliaries,
        foreground = %plan.foreground().name,
        "Service plan loaded"
    );

    let code = match supervisor.run(relay).await {
        Ok(report) => {
            tracing::info!(exit_code = report.exit_code(), "Shutdown complete");
            report.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "Supervisor failed");
            e.exit_code()
        }
    };

    exit_with(code)
}
