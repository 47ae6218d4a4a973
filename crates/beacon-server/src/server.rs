//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured address/port.
//! - Polls for new connections, so the shutdown flag is rechecked at
//!   least once per poll interval.
//! - Assigns each connection a `ClientId` and applies admission
//!   control against the registry's capacity.
//! - Spawns a session task per admitted client and reaps finished
//!   ones.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::config::{Config, POLL_INTERVAL};
use crate::context::ServerContext;
use crate::session;
use crate::shutdown;
use crate::types::ClientId;

/// Line pushed to a connection that arrives while the server is full.
const REJECT_LINE: &[u8] = b"server full\n";

/// A bound listener plus the state its tasks will share.
pub struct Server {
    ctx: Arc<ServerContext>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the listen socket without accepting anything yet.
    pub async fn bind(config: Config) -> anyhow::Result<Server> {
        let addr: SocketAddr = config
            .socket_addr_string()
            .parse()
            .context("invalid listen address")?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .context("socket creation failed")?;

        // Lets a restarted server rebind the fixed port while old
        // connections linger in TIME_WAIT.
        socket
            .set_reuseaddr(true)
            .context("setting SO_REUSEADDR failed")?;
        socket
            .bind(addr)
            .with_context(|| format!("bind to {} failed", addr))?;

        // Backlog sized to the client capacity; connections queued
        // beyond it would only be admitted or rejected later anyway.
        let listener = socket
            .listen(config.max_clients as u32)
            .context("listen failed")?;
        let local_addr = listener
            .local_addr()
            .context("reading local address failed")?;

        Ok(Server {
            ctx: Arc::new(ServerContext::new(&config)),
            listener,
            local_addr,
        })
    }

    /// The actual bound address (useful when the port was 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the shared state, e.g. for an interrupt watcher.
    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Accept clients until shutdown is requested, then tear down.
    pub async fn run(self) -> anyhow::Result<()> {
        let Server {
            ctx,
            listener,
            local_addr,
        } = self;

        tracing::info!(
            addr = %local_addr,
            capacity = ctx.registry().capacity(),
            "listening"
        );

        let mut sessions: JoinSet<()> = JoinSet::new();
        let mut next_client_id: u64 = 1;

        while ctx.is_running() {
            // Reap sessions that ended on their own (client went away).
            while sessions.try_join_next().is_some() {}

            let (stream, peer_addr) = match timeout(POLL_INTERVAL, listener.accept()).await {
                // Quiet second; recheck the running flag.
                Err(_elapsed) => continue,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
                Ok(Ok(pair)) => pair,
            };

            // The shutdown request may have landed while this accept
            // was pending; a member registered now would miss the
            // farewell that already went out.
            if !ctx.is_running() {
                tracing::debug!(peer = %peer_addr, "dropping connection accepted during shutdown");
                break;
            }

            let id = ClientId(next_client_id);
            next_client_id += 1;

            let (reader, writer) = stream.into_split();
            match ctx.registry().try_admit(id, writer) {
                Ok(()) => {
                    tracing::info!(
                        client = %id,
                        peer = %peer_addr,
                        count = ctx.registry().count(),
                        "client connected"
                    );
                    let ctx = Arc::clone(&ctx);
                    sessions.spawn(session::serve(ctx, id, reader));
                }
                Err(writer) => {
                    tracing::info!(peer = %peer_addr, "rejecting connection: server full");
                    // Best effort; both halves drop right after, which
                    // closes the connection without it ever joining
                    // the registry.
                    let _ = writer.try_write(REJECT_LINE);
                }
            }
        }

        shutdown::run_teardown(&mut sessions).await;

        drop(listener);
        tracing::info!("listener closed");
        Ok(())
    }
}

/// Bind, install the interrupt watcher and serve until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let server = Server::bind(config).await?;
    tokio::spawn(shutdown::watch_interrupt(server.context()));
    server.run().await
}
