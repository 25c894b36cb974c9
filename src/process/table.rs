//! Process table and zombie reaper.
//!
//! # Responsibilities
//! - Spawn every managed child and remember its PID
//! - Reap every child of this process, managed or not
//! - Deliver exit statuses to the matching `ProcessHandle`
//!
//! # Design Decisions
//! - One table per process: `waitpid` is process-wide, so two tables would
//!   steal each other's children
//! - The reaper peeks with `waitid(WNOWAIT)` and only reaps while holding the
//!   table lock. `spawn` holds the same lock around `Command::spawn`, so a PID
//!   is always registered before its status can be looked up, and a child whose
//!   exec failed is left for std to collect
//! - All children must be spawned through the table

use std::collections::HashMap;
use std::io;
use std::process::Command;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::wait::{waitid, waitpid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::sync::watch;

use crate::process::handle::{ExitStatus, ProcessHandle};

static TABLE: OnceLock<ProcessTable> = OnceLock::new();

pub struct ProcessTable {
    inner: Mutex<Inner>,
    spawned: Condvar,
}

#[derive(Default)]
struct Inner {
    waiters: HashMap<Pid, watch::Sender<Option<ExitStatus>>>,
    /// Bumped on every spawn so an idle reaper knows to look again.
    generation: u64,
    reaper_running: bool,
}

impl ProcessTable {
    /// The table for this process.
    pub fn global() -> &'static ProcessTable {
        TABLE.get_or_init(|| ProcessTable {
            inner: Mutex::new(Inner::default()),
            spawned: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `command` and register it. The reaper thread is started on first use.
    pub fn spawn(&'static self, name: &str, mut command: Command) -> io::Result<ProcessHandle> {
        let mut inner = self.lock();

        if !inner.reaper_running {
            thread::Builder::new()
                .name("reaper".to_string())
                .spawn(move || self.reap_forever())?;
            inner.reaper_running = true;
        }

        let child = command.spawn()?;
        let pid = Pid::from_raw(child.id() as i32);
        let (tx, rx) = watch::channel(None);
        inner.waiters.insert(pid, tx);
        inner.generation += 1;
        drop(inner);
        self.spawned.notify_all();

        tracing::debug!(service = %name, pid = %pid, "Spawned child");
        Ok(ProcessHandle::new(name, pid, rx))
    }

    /// Whether `pid` was spawned through the table and has not been reaped yet.
    pub fn is_managed(&self, pid: Pid) -> bool {
        self.lock().waiters.contains_key(&pid)
    }

    fn reap_forever(&self) {
        loop {
            let generation = self.lock().generation;

            match waitid(Id::All, WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
                Ok(status) => {
                    if let Some(pid) = status.pid() {
                        self.collect(pid);
                    }
                }
                Err(Errno::EINTR) => {}
                Err(Errno::ECHILD) => self.wait_for_spawn(generation),
                Err(e) => {
                    tracing::error!(error = %e, "waitid failed");
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }

    fn wait_for_spawn(&self, generation: u64) {
        let inner = self.lock();
        let _ = self
            .spawned
            .wait_timeout_while(inner, Duration::from_secs(1), |inner| {
                inner.generation == generation
            });
    }

    fn collect(&self, pid: Pid) {
        let mut inner = self.lock();

        let status = match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => ExitStatus::Exited(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => ExitStatus::Signaled(signal),
            // collected by std after a failed exec
            Ok(_) | Err(Errno::ECHILD) => return,
            Err(e) => {
                tracing::warn!(pid = %pid, error = %e, "waitpid failed");
                return;
            }
        };

        match inner.waiters.remove(&pid) {
            Some(tx) => {
                tracing::debug!(pid = %pid, status = %status, "Reaped managed child");
                tx.send_replace(Some(status));
            }
            None => tracing::debug!(pid = %pid, status = %status, "Reaped orphan"),
        }
    }
}
