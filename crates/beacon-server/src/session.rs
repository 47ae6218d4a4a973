//! Per-client session loop.
//!
//! Each session owns the read half of its connection and runs the
//! second-by-second cadence: push one fresh token, then wait up to
//! one poll interval for inbound data. Every newline byte in the
//! inbound stream triggers a member-count broadcast.

use std::io;
use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;

use crate::config::POLL_INTERVAL;
use crate::context::ServerContext;
use crate::types::ClientId;

/// Inbound scratch buffer size per session.
const READ_BUFFER_SIZE: usize = 1024;

/// Drive one client until it disconnects or the server shuts down.
pub(crate) async fn serve(ctx: Arc<ServerContext>, id: ClientId, reader: OwnedReadHalf) {
    let mut buf = [0u8; READ_BUFFER_SIZE];

    while ctx.is_running() {
        let token = ctx.generator().generate();
        let line = format!("{}\n", token);
        if !ctx.registry().send_to(id, line.as_bytes()) {
            tracing::debug!(client = %id, "token write failed, closing session");
            break;
        }

        match timeout(POLL_INTERVAL, reader.readable()).await {
            // Nothing from the client this second; the next token is due.
            Err(_elapsed) => continue,
            Ok(Err(e)) => {
                tracing::debug!(client = %id, error = %e, "readiness wait failed");
                break;
            }
            Ok(Ok(())) => match reader.try_read(&mut buf) {
                // Clean EOF from the peer.
                Ok(0) => break,
                Ok(n) => {
                    for &byte in &buf[..n] {
                        if byte == b'\n' {
                            ctx.registry().broadcast_count();
                        }
                    }
                }
                // Readiness was a false positive; same as the quiet case.
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    tracing::debug!(client = %id, error = %e, "read failed");
                    break;
                }
            },
        }
    }

    // Deregister before the halves drop, so a concurrent broadcast
    // never addresses a connection that is already closing.
    ctx.registry().remove(id);
    tracing::info!(client = %id, "client disconnected");
}
