use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::vhost::VirtualHosts;

/// Pause after a failed accept, so a full fd table is not polled in a
/// tight loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and runs each one as a task in a `JoinSet`, so
/// that shutdown can wait for every open connection to finish.
pub struct Listener {
    inner: TcpListener,
    hosts: Arc<VirtualHosts>,
    read_timeout: Duration,
}

impl Listener {
    pub async fn bind(
        addr: &str,
        hosts: Arc<VirtualHosts>,
        read_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let inner = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        Ok(Self {
            inner,
            hosts,
            read_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts connections until `shutdown` resolves, then stops accepting
    /// and waits for the open connections. Those end on their own within
    /// one read timeout.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                accepted = self.inner.accept() => {
                    if !self.admit(accepted, &mut connections) {
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    reap(joined);
                }
            }
        }

        drop(self.inner);

        if !connections.is_empty() {
            info!(open = connections.len(), "Waiting for open connections");
        }
        while let Some(joined) = connections.join_next().await {
            reap(joined);
        }

        Ok(())
    }

    /// Spawns the task for an accepted socket. A failed accept is logged and
    /// reported as `false`; open connections and the listener are untouched.
    fn admit(
        &self,
        accepted: std::io::Result<(TcpStream, SocketAddr)>,
        connections: &mut JoinSet<()>,
    ) -> bool {
        let (socket, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                return false;
            }
        };
        info!("Accepted connection from {}", peer);

        let conn = Connection::new(socket, self.hosts.clone(), self.read_timeout);
        connections.spawn(
            async move {
                if let Err(e) = conn.run().await {
                    tracing::warn!(error = %format!("{e:#}"), "Connection error");
                }
            }
            .instrument(tracing::info_span!("conn", %peer)),
        );
        true
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Connection task failed");
    }
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let hosts = Arc::new(cfg.virtual_hosts()?);
    info!(hosts = ?hosts.hosts().collect::<Vec<_>>(), "Virtual hosts ready");

    let listener = Listener::bind(&cfg.server.listen_addr, hosts, cfg.read_timeout()).await?;
    info!("Listening on {}", listener.local_addr()?);

    listener
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
