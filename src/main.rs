use jsonrpc_ipc::{
    build_app, config::Config, default_services, logging, rpc::ProtocolRegistry, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let protocols = ProtocolRegistry::new(default_services(), config.enable_v1);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(protocols);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        enable_v1 = config.enable_v1,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
