//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;

use beacon_core::TokenPolicy;
use beacon_server::config::Config;

const VARS: [&str; 5] = [
    "BEACON_BIND_ADDR",
    "BEACON_PORT",
    "BEACON_MAX_CLIENTS",
    "BEACON_TOKEN_POLICY",
    "BEACON_ID_FILE",
];

// Environment variables are process-global, so everything lives in
// one test function. Each file under tests/ is its own binary, which
// keeps the other test files unaffected.
#[test]
fn defaults_and_overrides_come_from_the_environment() {
    for var in VARS {
        env::remove_var(var);
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.bind_addr, "0.0.0.0");
    assert_eq!(config.port, 12345);
    assert_eq!(config.max_clients, 6);
    assert_eq!(config.token_policy, TokenPolicy::Sequential);
    assert_eq!(config.id_file, PathBuf::from("./last_id"));
    assert_eq!(config.socket_addr_string(), "0.0.0.0:12345");

    env::set_var("BEACON_BIND_ADDR", "127.0.0.1");
    env::set_var("BEACON_PORT", "9999");
    env::set_var("BEACON_MAX_CLIENTS", "2");
    env::set_var("BEACON_TOKEN_POLICY", "random");
    env::set_var("BEACON_ID_FILE", "/tmp/beacon-test-id");

    let config = Config::from_env().unwrap();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 9999);
    assert_eq!(config.max_clients, 2);
    assert_eq!(config.token_policy, TokenPolicy::Random);
    assert_eq!(config.id_file, PathBuf::from("/tmp/beacon-test-id"));
    assert_eq!(config.socket_addr_string(), "127.0.0.1:9999");

    env::set_var("BEACON_PORT", "not-a-port");
    assert!(Config::from_env().is_err());

    for var in VARS {
        env::remove_var(var);
    }
}
