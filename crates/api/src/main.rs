use anyhow::Context;
use modhub_ai::{AiGateway, GatewayConfig};

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    modhub_observability::init();

    let config = GatewayConfig::from_env();
    if config.providers.is_empty() {
        tracing::warn!("no AI provider configured; every AI call will use the local fallback");
    }
    let app = modhub_api::app::build_app(AiGateway::from_config(&config));

    let bind = std::env::var("MODHUB_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
