use anyhow::Context;
use tracing_subscriber::EnvFilter;

use charge_predictor::{
    config::ServerConfig,
    http::{create_router, AppState},
    model, FeatureVector,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    // No model, no service: refuse to start rather than answer with errors
    let mdl = model::load(&config.model)
        .with_context(|| format!("model unavailable ({:?})", config.model))?;
    tracing::info!(
        "loaded {} model; feat_list[{}]: {:?}",
        mdl.kind(),
        mdl.feature_names().len(),
        mdl.feature_names()
    );

    let warm = mdl
        .predict(&FeatureVector::zeros())
        .context("warmup prediction failed")?;
    tracing::info!("warmup forward ok ({:.4})", warm);

    let state = AppState::new(mdl, &config);
    let app = create_router(state);

    let addr = config.bind_addr()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
