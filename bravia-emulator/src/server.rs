//! Connection acceptor.
//!
//! Owns the listening socket and the shared device state, and spawns one
//! [`Session`] task per accepted connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use bravia_core::{BraviaError, CloseReason, DeviceStateStore, Session};

use crate::config::EmulatorConfig;

// ── EmulatorServer ───────────────────────────────────────────────

pub struct EmulatorServer {
    config: EmulatorConfig,
    store: Arc<DeviceStateStore>,
    running: Arc<AtomicBool>,
}

impl EmulatorServer {
    /// Open the state file named in `config`. Failing to read or create it
    /// is fatal: there is no initial state to serve.
    pub fn new(config: EmulatorConfig) -> Result<Self, BraviaError> {
        let store = DeviceStateStore::open(&config.storage.state_file)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: EmulatorConfig, store: Arc<DeviceStateStore>) -> Self {
        Self {
            config,
            store,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<DeviceStateStore> {
        &self.store
    }

    /// Obtain a handle that can be used to stop the server from another
    /// task (the Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the server to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config.bind_address()).await
    }

    /// Bind, then accept until stopped.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until stopped. Sessions still open
    /// at that point are aborted.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "waiting for a client connection on {}",
            listener.local_addr()?
        );

        let session_config = self.config.to_session_config();
        let mut sessions: JoinSet<CloseReason> = JoinSet::new();

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                accept = listener.accept() => {
                    let (stream, peer) = match accept {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("issue accepting connection: {e}");
                            continue;
                        }
                    };
                    let session = Session::new(
                        stream,
                        peer,
                        Arc::clone(&self.store),
                        session_config.clone(),
                    );
                    sessions.spawn(session.run());
                }
                Some(done) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = done {
                        error!("session task failed: {e}");
                    }
                }
                _ = Self::wait_for_stop(&self.running) => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        if !sessions.is_empty() {
            info!("closing {} open session(s)", sessions.len());
        }
        sessions.shutdown().await;
        info!("emulator stopped");
        Ok(())
    }

    /// Resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
