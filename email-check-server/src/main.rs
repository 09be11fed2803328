//! email-check-server: HTTP API over the email validation client.
//!
//! Configuration comes from discovered config files and the environment
//! (`ZERO_BOUNCE_API_KEY`, `PORT`, `EC_*`). Listens on `0.0.0.0:PORT`.

use email_check_lib::{
    apply_env_config, apply_file_config, load_env_config, resolve_port, ConfigManager,
    EmailValidator, ValidatorConfig,
};
use email_check_server::{create_router, AppState};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let file_config = ConfigManager::new(false).discover_and_load()?;
    let env_config = load_env_config();

    let config = apply_file_config(ValidatorConfig::default(), &file_config);
    let config = apply_env_config(config, &env_config);

    if config.api_key.trim().is_empty() {
        return Err("No provider API key. Set ZERO_BOUNCE_API_KEY or EC_API_KEY".into());
    }

    let port = resolve_port(&file_config, &env_config);
    let bind = file_config
        .server
        .as_ref()
        .and_then(|server| server.bind.clone())
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;

    let validator = EmailValidator::with_config(config)?;
    info!(
        provider = validator.provider_name(),
        rate_limit = validator.config().rate_limit,
        burst = validator.config().burst,
        "Validator ready"
    );

    let app = create_router(AppState::new(validator));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
