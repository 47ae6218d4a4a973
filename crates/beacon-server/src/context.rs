//! State shared by the accept loop, the session tasks and the
//! interrupt watcher.

use std::sync::atomic::{AtomicBool, Ordering};

use beacon_core::{CounterStore, TokenGenerator};

use crate::config::Config;
use crate::registry::ClientRegistry;

/// Line broadcast to every connected client right before their
/// connections close.
const FAREWELL_LINE: &[u8] = b"Thank you\n";

pub struct ServerContext {
    running: AtomicBool,
    registry: ClientRegistry,
    generator: TokenGenerator,
}

impl ServerContext {
    pub fn new(config: &Config) -> Self {
        let store = CounterStore::new(config.id_file.clone());
        ServerContext {
            running: AtomicBool::new(true),
            registry: ClientRegistry::new(config.max_clients),
            generator: TokenGenerator::from_policy(config.token_policy, store),
        }
    }

    /// Whether the server should keep accepting and serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin shutdown. Returns `true` for the caller that performed
    /// the transition, `false` if shutdown was already requested.
    ///
    /// The first caller also broadcasts the farewell line and closes
    /// every member connection. A session self-evicts as soon as its
    /// own poll observes the stopped flag, up to a full poll interval
    /// before the accept loop wakes, so the goodbye must happen while
    /// every member is still registered rather than in the accept
    /// loop's teardown.
    pub fn request_shutdown(&self) -> bool {
        let first = self.running.swap(false, Ordering::SeqCst);
        if first {
            tracing::info!(clients = self.registry.count(), "shutting down");
            self.registry.broadcast(FAREWELL_LINE);
            let closed = self.registry.close_all();
            tracing::debug!(closed, "client connections closed");
        }
        first
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &TokenGenerator {
        &self.generator
    }
}
