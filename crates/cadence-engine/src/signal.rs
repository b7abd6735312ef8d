//! Stop signal for the schedule loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::EngineError;

/// Cloneable stop handle, tripped by SIGINT/SIGTERM or by hand.
///
/// Backed by a watch channel so waiters that subscribe after the request
/// still see it.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        debug!("Shutdown requested");
        self.sender.send_replace(true);
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender lives as long as self, so this only returns on a request
        let _ = receiver.wait_for(|requested| *requested).await;
    }

    /// Set up OS signal handlers (Unix only).
    #[cfg(unix)]
    pub fn install_os_handlers(&self) -> Result<(), EngineError> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| EngineError::SignalSetup(e.to_string()))?;
        let sigterm_handler = self.clone();
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                info!("Received SIGTERM");
                sigterm_handler.request_shutdown();
            }
        });

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| EngineError::SignalSetup(e.to_string()))?;
        let sigint_handler = self.clone();
        tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                info!("Received SIGINT");
                sigint_handler.request_shutdown();
            }
        });

        info!("OS signal handlers installed (SIGTERM, SIGINT)");
        Ok(())
    }

    /// Set up OS signal handlers (non-Unix fallback).
    #[cfg(not(unix))]
    pub fn install_os_handlers(&self) -> Result<(), EngineError> {
        let handler = self.clone();

        // Only Ctrl+C is available on non-Unix
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
                handler.request_shutdown();
            }
        });

        info!("OS signal handler installed (Ctrl+C)");
        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
