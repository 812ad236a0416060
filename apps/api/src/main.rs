mod ats;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod state;
mod taxonomy;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ats::features::FeatureExtractor;
use crate::ats::ranking::RankingEngine;
use crate::ats::scoring::WeightedScorer;
use crate::ats::source::PgRankingSource;
use crate::config::{Config, TaxonomySourceKind};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::taxonomy::store::{BuiltinTaxonomySource, PgTaxonomySource, TaxonomySource, TaxonomyStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("ats_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    if config.ranking_workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.ranking_workers)
            .thread_name(|i| format!("ats-rank-{i}"))
            .build_global()
            .context("Failed to configure the ranking thread pool")?;
    }
    info!("Ranking pool: {} threads", rayon::current_num_threads());

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize taxonomy store
    let taxonomy_source: Arc<dyn TaxonomySource> = match config.taxonomy_source {
        TaxonomySourceKind::Database => Arc::new(PgTaxonomySource::new(db.clone())),
        TaxonomySourceKind::Builtin => Arc::new(BuiltinTaxonomySource),
    };
    let taxonomy = Arc::new(TaxonomyStore::new(
        taxonomy_source,
        config.fuzzy_skill_matching,
    ));
    if let Err(e) = taxonomy.refresh().await {
        // Ranking answers 503 until a later refresh succeeds.
        warn!("Initial taxonomy load failed: {e}");
    }
    if let Some(every) = config.taxonomy_refresh_interval() {
        taxonomy.clone().spawn_refresh_loop(every);
        info!("Taxonomy refresh every {}s", every.as_secs());
    }

    // Initialize scoring engine
    let scorer = WeightedScorer::new(config.scoring.clone())?;
    let engine = Arc::new(RankingEngine::new(
        FeatureExtractor::new(config.scoring.bonuses.clone()),
        Arc::new(scorer),
    ));
    info!("Scorer backend: {}", engine.scorer_backend());

    // Build app state
    let state = AppState {
        source: Arc::new(PgRankingSource::new(db, &config.excluded_stages)),
        taxonomy,
        engine,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the recruiter dashboard host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
