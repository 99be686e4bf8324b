//! HTTP relay surfaced only in `relay_http` feature builds.
//!
//! A lightweight Axum server that lets remote viewers follow a session's
//! gestures as Server-Sent Events, next to health and telemetry endpoints.
//! It reads from the same [`SessionHub`] the pipeline publishes into.

mod routes;
mod sse;

pub use routes::{build_router, run_http_server, HttpServerError, RelayHttpState};

use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::managers::SessionHub;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";

/// Resolve the bind address from `GESTURE_RELAY_HTTP_ADDR`, falling back to
/// [`DEFAULT_ADDR`] when unset or unparsable.
pub fn addr_from_env() -> SocketAddr {
    std::env::var("GESTURE_RELAY_HTTP_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8787)))
}

/// Serve the relay on a dedicated thread with its own multi-thread runtime.
///
/// The thread runs until the server stops; bind failures are logged there.
pub fn spawn_relay_server(
    hub: SessionHub,
    addr: SocketAddr,
    token: Option<String>,
) -> std::io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("relay-http".to_string())
        .spawn(move || {
            match token.as_deref() {
                Some(token) => {
                    let preview = token.chars().take(4).collect::<String>();
                    info!("[RelayHttp] Binding {} (token prefix {}***)", addr, preview);
                }
                None => info!("[RelayHttp] Binding {} without token", addr),
            }

            runtime.block_on(async move {
                let state = RelayHttpState::new(hub, token);
                if let Err(err) = run_http_server(state, addr).await {
                    error!("[RelayHttp] Server stopped: {:#}", err);
                }
            });
        })
}
