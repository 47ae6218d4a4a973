//! beacon-server
//!
//! Multi-client async TCP server that pushes one fresh token per
//! second to every client and answers inbound newlines with the
//! current member count.

pub mod config;
pub mod context;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod types;

// internal module: the per-connection loop
mod session;
