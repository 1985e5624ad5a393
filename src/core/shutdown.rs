//! Daemon shutdown coordination
//!
//! One broadcast channel fans the stop signal out to the accept loop, every
//! connection task, the dispatcher and the grace timer. OS signals feed the
//! same channel; a second signal forces an immediate exit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across the daemon's tasks
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };
        (coordinator, shutdown_rx)
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger shutdown
    pub fn trigger_shutdown(&self) {
        // Release pairs with the Acquire in is_shutdown_requested
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested
    ///
    /// Returns immediately if it already was, so late subscribers cannot
    /// miss the signal.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Run `future_fn` with OS signal handlers installed
    ///
    /// The closure gets the coordinator and a receiver already subscribed to
    /// the stop signal.
    pub async fn guard_with_coordinator<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(Self, broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, shutdown_rx) = Self::new();
        setup_signal_handlers(coordinator.clone());
        future_fn(coordinator, shutdown_rx).await
    }
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(coordinator: ShutdownCoordinator) {
    let signal_count = Arc::new(AtomicUsize::new(0));

    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal, SignalKind};
        let signals = [
            ("SIGINT", SignalKind::interrupt()),
            ("SIGTERM", SignalKind::terminate()),
            ("SIGHUP", SignalKind::hangup()),
        ];

        for (name, kind) in signals {
            let coordinator = coordinator.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                let Ok(mut sig) = signal(kind) else {
                    log::warn!("Unable to install {name} handler");
                    return;
                };
                while sig.recv().await.is_some() {
                    let prev = sig_ctr.fetch_add(1, Ordering::AcqRel);
                    if prev >= 1 {
                        log::warn!("{name} received again; exiting immediately");
                        std::process::exit(130);
                    }
                    log::info!("{name} received; shutting down");
                    coordinator.trigger_shutdown();
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if signal_count.fetch_add(1, Ordering::AcqRel) >= 1 {
                    std::process::exit(130);
                }
                log::info!("Ctrl-C received; shutting down");
                coordinator.trigger_shutdown();
            }
        });
    }
}
