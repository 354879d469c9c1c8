use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;

/// Represents different shutdown reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Graceful shutdown requested (SIGTERM, SIGINT)
    Graceful,
    /// Drain abandoned: grace period exceeded or the signal source went away
    Force,
}

/// Manages graceful shutdown of the front door
pub struct GracefulShutdown {
    /// Broadcast sender for shutdown signals
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    /// Flag indicating if shutdown has been initiated
    shutdown_initiated: AtomicBool,
    /// How long in-flight requests may keep running after the signal
    grace_period: Duration,
}

impl GracefulShutdown {
    /// Create a new GracefulShutdown manager with the default 15-second grace period
    pub fn new() -> Self {
        Self::with_grace_period(Duration::from_secs(15))
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            shutdown_initiated: AtomicBool::new(false),
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Get a receiver for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger shutdown without an OS signal. Only the first call broadcasts.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            tracing::info!("Shutdown triggered: {:?}", reason);
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::warn!("Shutdown already in progress, ignoring {:?}", reason);
        }
    }

    /// Wait for SIGINT or SIGTERM and broadcast a graceful shutdown
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Signal handler started. Listening for SIGTERM, SIGINT (graceful shutdown)");

        let signal = wait_for_signal().await?;
        tracing::info!(
            "Received shutdown signal ({}), initiating graceful shutdown...",
            signal
        );
        self.trigger_shutdown(ShutdownReason::Graceful);

        tracing::info!("Signal handler shutting down");
        Ok(())
    }

    /// Create a shutdown token that can be used to cancel operations
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            receiver: self.subscribe(),
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

/// A token that resolves once shutdown is signalled
pub struct ShutdownToken {
    receiver: broadcast::Receiver<ShutdownReason>,
}

impl Clone for ShutdownToken {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
        }
    }
}

impl ShutdownToken {
    /// Wait for shutdown signal
    pub async fn cancelled(&mut self) -> ShutdownReason {
        match self.receiver.recv().await {
            Ok(reason) => reason,
            Err(_) => ShutdownReason::Force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_shutdown_trigger() {
        let shutdown = GracefulShutdown::new();
        let mut receiver = shutdown.subscribe();

        shutdown.trigger_shutdown(ShutdownReason::Graceful);

        let reason = receiver.recv().await.unwrap();
        assert_eq!(reason, ShutdownReason::Graceful);
    }

    #[tokio::test]
    async fn test_only_first_trigger_is_broadcast() {
        let shutdown = GracefulShutdown::new();
        let mut receiver = shutdown.subscribe();

        shutdown.trigger_shutdown(ShutdownReason::Graceful);
        shutdown.trigger_shutdown(ShutdownReason::Force);

        assert_eq!(receiver.recv().await.unwrap(), ShutdownReason::Graceful);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_token() {
        let shutdown = GracefulShutdown::with_grace_period(Duration::from_millis(100));
        let mut token = shutdown.shutdown_token();
        let mut cloned = token.clone();

        shutdown.trigger_shutdown(ShutdownReason::Graceful);

        assert_eq!(token.cancelled().await, ShutdownReason::Graceful);
        assert_eq!(cloned.cancelled().await, ShutdownReason::Graceful);
        assert_eq!(shutdown.grace_period(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_dropped_manager_forces_tokens() {
        let shutdown = GracefulShutdown::new();
        let mut token = shutdown.shutdown_token();
        drop(shutdown);

        assert_eq!(token.cancelled().await, ShutdownReason::Force);
    }
}
