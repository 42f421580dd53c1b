use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod ipc;
pub mod logging;
pub mod rpc;

use domain::echo::Echo;
use ipc::{
    command::CommandRegistry, connection::ConnectionRegistry, listeners::CallListeners,
    scope::ActiveCallScope, session::InMemorySessionProvider,
};
use rpc::{ProtocolRegistry, Services};

#[derive(Clone)]
pub struct AppState {
    pub protocols: Arc<ProtocolRegistry>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(protocols: ProtocolRegistry) -> Self {
        Self {
            protocols: Arc::new(protocols),
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}

/// In-process collaborators with the built-in commands registered.
pub fn default_services() -> Services {
    let commands = CommandRegistry::new().with_command("Echo", Arc::new(Echo));

    Services {
        executor: Arc::new(commands),
        sessions: Arc::new(InMemorySessionProvider::new()),
        scope: Arc::new(ActiveCallScope::new()),
        listeners: Arc::new(CallListeners::new()),
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/jsonrpc", get(http::handlers::discovery))
        .route("/rpc", post(http::handlers::rpc_endpoint))
        .route(
            "/connections/{id}",
            delete(http::handlers::close_connection),
        )
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
