//! Unix signal handling for the daemon.
//!
//! - SIGTERM/SIGINT: graceful shutdown
//! - SIGHUP: force a refresh of every server

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// Turns process signals into shutdown and refresh requests.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Counts refresh requests so none are lost between polls.
    refresh_tx: Arc<watch::Sender<u64>>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (refresh_tx, _) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            refresh_tx: Arc::new(refresh_tx),
        }
    }

    /// Installs the signal handlers and spawns the listener task.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler cannot be installed.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let handler = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating shutdown");
                        handler.trigger_shutdown();
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, initiating shutdown");
                        handler.trigger_shutdown();
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, refreshing all servers");
                        handler.trigger_refresh();
                    }
                }
            }

            debug!("Signal listener stopped");
        });

        Ok(())
    }

    /// Ctrl+C only outside Unix.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let handler = self.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, initiating shutdown");
                handler.trigger_shutdown();
            }
        });

        Ok(())
    }

    /// Returns a future-like signal that completes on shutdown.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns a stream of refresh requests made after this call.
    pub fn refresh_requests(&self) -> RefreshRequests {
        RefreshRequests {
            rx: self.refresh_tx.subscribe(),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Programmatically requests a refresh of all servers.
    pub fn trigger_refresh(&self) {
        self.refresh_tx.send_modify(|n| *n = n.wrapping_add(1));
    }
}

/// Completes when shutdown is signaled.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn wait(mut self) {
        // An Err means the handler is gone, which also ends the wait.
        let _ = self.rx.wait_for(|down| *down).await;
    }
}

/// Refresh requests raised by SIGHUP or [`SignalHandler::trigger_refresh`].
#[derive(Debug)]
pub struct RefreshRequests {
    rx: watch::Receiver<u64>,
}

impl RefreshRequests {
    /// Waits for the next request. Requests raised while the caller was busy
    /// are merged into one.
    ///
    /// Returns `false` once the handler has been dropped.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
