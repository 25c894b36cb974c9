//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGQUIT, SIGHUP, SIGUSR1, SIGUSR2)
//! - Funnel them into one ordered channel, the `SignalRelay`
//! - Classify signals that mean "shut down"
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The supervisor only ever sees the relay, so tests inject signals
//!   through a `SignalSender` instead of signalling the test process
//! - SIGHUP and SIGUSR* are forwarded, never acted upon

use std::io;

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Signals caught by the supervisor and forwarded to the foreground service.
pub const FORWARDED_SIGNALS: [Signal; 6] = [
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGHUP,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

/// Whether `signal` asks the container to stop.
pub fn is_termination(signal: Signal) -> bool {
    matches!(signal, Signal::SIGTERM | Signal::SIGINT | Signal::SIGQUIT)
}

/// Producer side of a relay.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSender {
    pub fn send(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!(signal = ?signal, "Signal relay closed, dropping signal");
        }
    }
}

/// Ordered stream of signals received by the supervisor.
#[derive(Debug)]
pub struct SignalRelay {
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl SignalRelay {
    pub fn channel() -> (SignalSender, SignalRelay) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSender { tx }, SignalRelay { rx })
    }

    /// A relay fed by the process's own signal handlers. Must be called
    /// from within a Tokio runtime.
    pub fn from_os() -> io::Result<SignalRelay> {
        let (sender, relay) = Self::channel();
        listen(sender)?;
        Ok(relay)
    }

    /// Next signal. Never resolves once every sender is gone.
    pub async fn recv(&mut self) -> Signal {
        match self.rx.recv().await {
            Some(signal) => signal,
            None => std::future::pending().await,
        }
    }
}

/// Install handlers for [`FORWARDED_SIGNALS`] that feed `sender`.
pub fn listen(sender: SignalSender) -> io::Result<()> {
    for forwarded in FORWARDED_SIGNALS {
        let mut stream = signal(SignalKind::from_raw(forwarded as i32))?;
        let sender = sender.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                tracing::debug!(signal = ?forwarded, "Caught signal");
                sender.send(forwarded);
            }
        });
    }

    tracing::debug!(signals = ?FORWARDED_SIGNALS, "Signal handlers installed");
    Ok(())
}
