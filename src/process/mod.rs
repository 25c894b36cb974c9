//! Child process management.
//!
//! # Data Flow
//! ```text
//! ServiceSpec → spawn.rs (Command) → table.rs (spawn + register)
//!     → ProcessHandle (pid, exit status channel)
//!
//! Child exit:
//!     reaper thread (table.rs) → waitpid → ProcessHandle / orphan log
//!
//! Shutdown:
//!     orphans.rs → /proc scan → SIGTERM → SIGKILL
//! ```
//!
//! # Design Decisions
//! - Every child runs in its own process group; signals go to the group
//! - The reaper reaps everything so no zombie survives, even as PID 1

pub mod handle;
pub mod orphans;
pub mod spawn;
pub mod table;

pub use handle::{ExitStatus, ProcessHandle};
pub use spawn::{command_for, Role};
pub use table::ProcessTable;

use nix::unistd::Pid;

/// Whether this process is the container's PID 1.
pub fn is_pid1() -> bool {
    Pid::this().as_raw() == 1
}

/// Adopt orphaned descendants, as PID 1 would.
pub fn become_subreaper() -> nix::Result<()> {
    nix::sys::prctl::set_child_subreaper(true)
}
