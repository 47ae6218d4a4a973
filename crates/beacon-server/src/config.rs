//! Configuration for the beacon TCP server.
//!
//! For now this is intentionally simple: you can either use defaults
//! or override via a few environment variables:
//!
//! - `BEACON_BIND_ADDR`    (default: "0.0.0.0")
//! - `BEACON_PORT`         (default: "12345")
//! - `BEACON_MAX_CLIENTS`  (default: "6")
//! - `BEACON_TOKEN_POLICY` (default: "sequential")
//! - `BEACON_ID_FILE`      (default: "./last_id")

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use beacon_core::TokenPolicy;

/// Interval of every readiness poll in the server: the accept loop's
/// wait for new connections and each session's wait for inbound data.
/// It is therefore also the token cadence and the worst-case delay
/// before a loop observes the shutdown flag.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// How the low 16 bits of each token are chosen.
    pub token_policy: TokenPolicy,

    /// Side file the sequential policy persists its counter to.
    pub id_file: PathBuf,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BEACON_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = read_env_or_default("BEACON_PORT", 12345u16)?;
        let max_clients = read_env_or_default("BEACON_MAX_CLIENTS", 6usize)?;
        let token_policy = read_env_or_default("BEACON_TOKEN_POLICY", TokenPolicy::Sequential)?;
        let id_file = env::var("BEACON_ID_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./last_id"));

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            token_policy,
            id_file,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", key, val)),
        Err(_) => Ok(default),
    }
}
