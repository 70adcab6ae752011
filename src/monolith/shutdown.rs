//! Termination signal handling
//!
//! Signal handlers are installed up front so a failure surfaces before the
//! listener binds. A background task then waits for the first signal and
//! hands it to the server over a oneshot channel.

use super::{MonolithError, Result};
use tokio::sync::oneshot;
use tracing::Span;

/// The signal that ended the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Termination {
    #[strum(serialize = "SIGINT")]
    Interrupt,
    #[strum(serialize = "SIGTERM")]
    Terminate,
}

/// Installed SIGINT/SIGTERM listeners
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(MonolithError::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(MonolithError::Signal)?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Termination {
        tokio::select! {
            _ = self.interrupt.recv() => Termination::Interrupt,
            _ = self.terminate.recv() => Termination::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Termination {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        Termination::Interrupt
    }

    /// Move the listeners onto a background task.
    ///
    /// The returned receiver yields the first signal caught; it is read
    /// exactly once by the server.
    pub fn spawn(mut self, logger: Span) -> oneshot::Receiver<Termination> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let signal = self.recv().await;
            tracing::info!(parent: &logger, signal = %signal, "shutting down server");
            // Nobody is listening if the server already stopped on its own.
            let _ = tx.send(signal);
        });
        rx
    }
}

/// Resolve once `rx` yields a signal. A dropped sender never resolves.
pub async fn wait_for(rx: oneshot::Receiver<Termination>) {
    if rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}
