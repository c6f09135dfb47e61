use anyhow::Context;

use studypass_access::SessionRefresher;
use studypass_infra::{AppConfig, PostgresTenantConnector, connect_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    studypass_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(
        stage = %config.stage,
        default_tenant = ?config.refresh.default_tenant_for_missing_claim,
        "configuration loaded"
    );

    let pool = connect_pool(&config.database_url, config.db_max_connections)
        .await
        .context("connecting to database")?;

    let refresher =
        SessionRefresher::new(PostgresTenantConnector::new(pool), config.refresh.clone());
    let app = studypass_api::app::build_app(refresher, config.signing_secret().clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
