use std::sync::Arc;

use crate::ats::ranking::{RankingEngine, RankingSource};
use crate::config::Config;
use crate::taxonomy::store::TaxonomyStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Job / application / resume rows. Postgres in production.
    pub source: Arc<dyn RankingSource>,
    pub taxonomy: Arc<TaxonomyStore>,
    pub engine: Arc<RankingEngine>,
}
