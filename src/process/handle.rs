//! Handles to managed child processes.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tokio::sync::watch;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with a status code.
    Exited(i32),
    /// Killed by a signal.
    Signaled(Signal),
    /// The status could not be collected.
    Unknown,
}

impl ExitStatus {
    /// Shell-style exit code: the status itself, or 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Signaled(signal) => 128 + *signal as i32,
            ExitStatus::Unknown => 255,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit code {}", code),
            ExitStatus::Signaled(signal) => write!(f, "signal {:?}", signal),
            ExitStatus::Unknown => write!(f, "unknown status"),
        }
    }
}

/// A running (or finished) child registered in the process table.
///
/// Children spawned through `command_for` lead their own process group, so
/// signals are delivered to the whole group.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    name: String,
    pid: Pid,
    status: watch::Receiver<Option<ExitStatus>>,
}

impl ProcessHandle {
    pub(crate) fn new(name: &str, pid: Pid, status: watch::Receiver<Option<ExitStatus>>) -> Self {
        Self {
            name: name.to_string(),
            pid,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Exit status, if the process has already been reaped.
    pub fn try_status(&self) -> Option<ExitStatus> {
        *self.status.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.try_status().is_some()
    }

    /// Wait until the reaper collects this process.
    pub async fn wait(&self) -> ExitStatus {
        let mut status = self.status.clone();
        let result = match status.wait_for(Option::is_some).await {
            Ok(status) => (*status).unwrap_or(ExitStatus::Unknown),
            Err(_) => {
                tracing::warn!(service = %self.name, pid = %self.pid, "Exit status channel closed");
                ExitStatus::Unknown
            }
        };
        result
    }

    /// Send `signal` to the process group, or to the process alone when it
    /// does not lead a group. A process that is already gone is not an error.
    pub fn signal(&self, signal: Signal) -> nix::Result<()> {
        if self.has_exited() {
            return Ok(());
        }

        tracing::debug!(service = %self.name, pid = %self.pid, signal = ?signal, "Sending signal");
        match killpg(self.pid, signal) {
            Err(Errno::ESRCH) => match kill(self.pid, signal) {
                Err(Errno::ESRCH) => Ok(()),
                other => other,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_shell_convention() {
        assert_eq!(ExitStatus::Exited(3).code(), 3);
        assert_eq!(ExitStatus::Signaled(Signal::SIGTERM).code(), 143);
        assert_eq!(ExitStatus::Signaled(Signal::SIGKILL).code(), 137);
        assert!(ExitStatus::Exited(0).success());
        assert!(!ExitStatus::Signaled(Signal::SIGINT).success());
    }

    #[tokio::test]
    async fn wait_returns_delivered_status() {
        let (tx, rx) = watch::channel(None);
        let handle = ProcessHandle::new("test", Pid::from_raw(1), rx);
        assert_eq!(handle.try_status(), None);

        tx.send_replace(Some(ExitStatus::Exited(7)));
        assert_eq!(handle.wait().await, ExitStatus::Exited(7));
        assert!(handle.has_exited());
    }

    #[tokio::test]
    async fn wait_reports_unknown_when_channel_closes() {
        let (tx, rx) = watch::channel(None);
        let handle = ProcessHandle::new("test", Pid::from_raw(1), rx);
        drop(tx);
        assert_eq!(handle.wait().await, ExitStatus::Unknown);
    }

    #[tokio::test]
    async fn signal_reaches_child_outside_its_own_group() {
        let mut command = std::process::Command::new("/bin/sh");
        command.arg("-c").arg("exec sleep 30");
        let handle = crate::process::ProcessTable::global()
            .spawn("same-group", command)
            .unwrap();

        handle.signal(Signal::SIGTERM).unwrap();
        let status = tokio::time::timeout(std::time::Duration::from_secs(5), handle.wait())
            .await
            .expect("child should exit after SIGTERM");
        assert_eq!(status, ExitStatus::Signaled(Signal::SIGTERM));
    }
}
