mod api_error;
mod payloads;
mod routes;

use std::env;
use std::sync::Arc;
use tutor_pipeline::{Session, TutorConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = TutorConfig::from_env();
    log::info!(
        "Using model {} (default language {:?})",
        config.gateway.model,
        config.language
    );

    let session = Arc::new(Session::from_config(&config));
    let app = routes::router(session);

    let bind_addr = env::var("TUTOR_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
