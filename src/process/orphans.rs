//! Orphan discovery and termination.
//!
//! Daemonising services fork and let the parent exit; the surviving half is
//! re-parented to us (as PID 1 or as subreaper) without ever being registered
//! in the process table. At shutdown these orphans are found through `/proc`
//! and driven through SIGTERM, then SIGKILL.
//!
//! # State Transitions
//! ```text
//! Alive → TermSent:    SIGTERM delivered
//! TermSent → KillSent: still alive when the grace period ends
//! any → Gone:          process disappeared (or was reaped)
//! any → Errored:       signal delivery failed
//! ```

use std::fs::{self, File};
use std::io::Read;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::time::{sleep, Instant};

use crate::process::table::ProcessTable;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fields of `/proc/<pid>/stat` we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcStat {
    pub state: char,
    pub ppid: i32,
}

/// Parse the contents of a `/proc/<pid>/stat` file.
///
/// The command name is wrapped in parentheses and may itself contain spaces
/// or parentheses, so parsing starts after the last `)`.
pub fn parse_stat(contents: &str) -> Option<ProcStat> {
    let rest = &contents[contents.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let ppid = fields.next()?.parse().ok()?;
    Some(ProcStat { state, ppid })
}

fn read_stat(pid: Pid) -> Option<ProcStat> {
    let path = format!("/proc/{}/stat", pid);
    let mut contents = String::new();
    match File::open(&path).and_then(|mut f| f.read_to_string(&mut contents)) {
        Ok(_) => {
            let stat = parse_stat(&contents);
            if stat.is_none() {
                tracing::warn!(path = %path, "Unable to interpret stat file");
            }
            stat
        }
        Err(_) => None,
    }
}

/// Live (non-zombie) direct children of `parent`.
pub fn list_children(parent: Pid) -> Vec<Pid> {
    let entries = match fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Unable to list /proc");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
        .map(Pid::from_raw)
        .filter(|pid| {
            read_stat(*pid).is_some_and(|stat| stat.ppid == parent.as_raw() && stat.state != 'Z')
        })
        .collect()
}

fn is_alive(pid: Pid) -> bool {
    read_stat(pid).is_some_and(|stat| stat.state != 'Z')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrphanState {
    Alive,
    TermSent,
    KillSent,
    Gone,
    Errored,
}

fn send(pid: Pid, signal: Signal, next: OrphanState) -> OrphanState {
    tracing::info!(pid = %pid, signal = ?signal, "Signalling orphan");
    match kill(pid, signal) {
        Ok(()) => next,
        Err(Errno::ESRCH) => OrphanState::Gone,
        Err(e) => {
            tracing::warn!(pid = %pid, signal = ?signal, error = %e, "Unable to signal orphan");
            OrphanState::Errored
        }
    }
}

fn transition(pid: Pid, state: OrphanState) -> OrphanState {
    match state {
        OrphanState::Alive => send(pid, Signal::SIGTERM, OrphanState::TermSent),
        OrphanState::TermSent => send(pid, Signal::SIGKILL, OrphanState::KillSent),
        OrphanState::KillSent => {
            tracing::warn!(pid = %pid, "Orphan lingering after SIGKILL");
            state
        }
        OrphanState::Gone | OrphanState::Errored => state,
    }
}

/// Terminate every unmanaged child of this process. Returns how many were found.
pub async fn sweep_orphans(table: &ProcessTable, grace: Duration) -> usize {
    let mut orphans: Vec<(Pid, OrphanState)> = list_children(Pid::this())
        .into_iter()
        .filter(|pid| !table.is_managed(*pid))
        .map(|pid| (pid, OrphanState::Alive))
        .collect();

    if orphans.is_empty() {
        return 0;
    }

    tracing::info!(count = orphans.len(), "Sweeping orphaned processes");
    advance(&mut orphans);

    let deadline = Instant::now() + grace;
    loop {
        for (pid, state) in orphans.iter_mut() {
            if *state == OrphanState::TermSent && !is_alive(*pid) {
                *state = OrphanState::Gone;
            }
        }

        let pending = orphans
            .iter()
            .any(|(_, state)| *state == OrphanState::TermSent);
        if !pending || Instant::now() >= deadline {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    advance(&mut orphans);
    orphans.len()
}

fn advance(orphans: &mut [(Pid, OrphanState)]) {
    for (pid, state) in orphans.iter_mut() {
        *state = transition(*pid, *state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_stat_line() {
        let stat = parse_stat("1234 (sshd) S 1 1234 1234 0 -1 4194560").unwrap();
        assert_eq!(stat, ProcStat { state: 'S', ppid: 1 });
    }

    #[test]
    fn parses_command_names_with_spaces_and_parens() {
        let stat = parse_stat("77 (evil) name (x)) Z 42 77 77 0").unwrap();
        assert_eq!(stat, ProcStat { state: 'Z', ppid: 42 });
    }

    #[test]
    fn rejects_truncated_lines() {
        assert_eq!(parse_stat("12 (sh"), None);
        assert_eq!(parse_stat("12 (sh) R"), None);
        assert_eq!(parse_stat(""), None);
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_alive(Pid::this()));
    }

    #[test]
    fn orphan_states_only_move_forward() {
        let pid = Pid::from_raw(i32::MAX);
        assert_eq!(transition(pid, OrphanState::Gone), OrphanState::Gone);
        assert_eq!(transition(pid, OrphanState::Errored), OrphanState::Errored);
        assert_eq!(transition(pid, OrphanState::KillSent), OrphanState::KillSent);
    }
}
