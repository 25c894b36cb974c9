//! Orphan sweep tests. Kept in their own binary: the sweep scans every child
//! of the test process, so nothing else may spawn while it runs.

use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tokio::sync::Mutex;

use container_init::process::orphans::{list_children, sweep_orphans};
use container_init::process::ProcessTable;

static SWEEP: Mutex<()> = Mutex::const_new(());

fn spawn_unmanaged(script: &str) -> Child {
    Command::new("/bin/sh")
        .arg("-c")
        .arg(script)
        .process_group(0)
        .spawn()
        .unwrap()
}

#[tokio::test]
async fn test_sweep_terminates_unmanaged_child() {
    let _guard = SWEEP.lock().await;
    let mut child = spawn_unmanaged("exec sleep 30");
    assert!(list_children(Pid::this()).contains(&Pid::from_raw(child.id() as i32)));

    let started = Instant::now();
    let swept = sweep_orphans(ProcessTable::global(), Duration::from_secs(5)).await;

    assert_eq!(swept, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));
    assert!(list_children(Pid::this()).is_empty());
}

#[tokio::test]
async fn test_sweep_kills_child_ignoring_sigterm() {
    let _guard = SWEEP.lock().await;
    let mut child = spawn_unmanaged("trap '' TERM; while :; do sleep 0.05; done");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let swept = sweep_orphans(ProcessTable::global(), Duration::from_millis(300)).await;

    assert_eq!(swept, 1);
    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
}

#[tokio::test]
async fn test_sweep_without_children_is_a_no_op() {
    let _guard = SWEEP.lock().await;
    assert_eq!(sweep_orphans(ProcessTable::global(), Duration::from_millis(100)).await, 0);
}
