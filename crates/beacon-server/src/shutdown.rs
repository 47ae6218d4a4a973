//! Shutdown signalling and teardown.
//!
//! An interrupt (Ctrl-C) triggers `ServerContext::request_shutdown`,
//! which flips the running flag, broadcasts the farewell line and
//! closes every member connection in the requester's task context.
//! The accept loop observes the flag within one poll interval and
//! finishes the teardown: join every session task, then close the
//! listener.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::context::ServerContext;

/// Wait for Ctrl-C and request shutdown.
pub async fn watch_interrupt(ctx: Arc<ServerContext>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("interrupt received, shutting down");
            ctx.request_shutdown();
        }
        Err(e) => {
            // Without the handler the server can still be stopped
            // through `ServerContext::request_shutdown`.
            tracing::warn!(error = %e, "failed to install interrupt handler");
        }
    }
}

/// Run after the accept loop exits: wait for the session tasks to
/// finish. Member connections were already closed by
/// `ServerContext::request_shutdown`.
pub(crate) async fn run_teardown(sessions: &mut JoinSet<()>) {
    // Each session notices the stopped flag or its closed socket
    // within one poll interval.
    while sessions.join_next().await.is_some() {}
    tracing::info!("all sessions finished");
}
