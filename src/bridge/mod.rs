//! Browser-facing relay: one WebSocket client, one TCP stream to the game
//! server, newline framing in between.

mod connection;
mod pending;
mod registry;

pub use connection::CloseReason;
pub use pending::{PendingWrites, WriteOverflow};
pub use registry::{ConnectionId, ConnectionInfo, ConnectionRegistry, LinkState, Registration};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;

use crate::config::RelayConfig;
use connection::Connection;

/// Triggers shutdown of a running [`Bridge`] from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

pub struct Bridge {
    config: Arc<RelayConfig>,
    registry: ConnectionRegistry,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Bridge {
    pub fn new(config: RelayConfig) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            config: Arc::new(config),
            registry: ConnectionRegistry::new(),
            shutdown: Arc::new(tx),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.config.listen_addr))
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept browser connections on `listener` until shutdown is triggered,
    /// then wait for every connection task to tear down.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        let mut tasks = JoinSet::new();
        info!(
            "[Bridge] listening on {}, upstream {}",
            listener.local_addr()?,
            self.config.upstream_addr
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let config = Arc::clone(&self.config);
                        let registry = self.registry.clone();
                        let shutdown = self.shutdown.subscribe();
                        tasks.spawn(handle_browser(stream, peer, config, registry, shutdown));
                    }
                    Err(e) => error!("[Bridge] accept failed: {}", e),
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("[Bridge] connection task failed: {}", e);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("[Bridge] shutting down {} connection(s)", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("[Bridge] connection task failed: {}", e);
            }
        }
        Ok(())
    }
}

async fn handle_browser(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<RelayConfig>,
    registry: ConnectionRegistry,
    shutdown: watch::Receiver<bool>,
) {
    let ws = match timeout(config.connect_timeout, accept_async(stream)).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!("[Bridge] rejected handshake from {}: {}", peer, e);
            return;
        }
        Err(_) => {
            warn!("[Bridge] handshake from {} timed out", peer);
            return;
        }
    };

    let registration = registry.register(peer);
    info!("[conn {}] browser connected from {}", registration.id(), peer);
    Connection::new(ws, config, registration, shutdown).run().await;
}
