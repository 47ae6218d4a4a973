//! Binary TCP server for the token beacon.

use beacon_server::config::Config;
use beacon_server::server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "beacon_server=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        policy = %config.token_policy,
        "starting beacon-server"
    );

    server::run(config).await
}
