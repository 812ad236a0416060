//! Refreshable taxonomy snapshot.
//!
//! Ranking calls read whatever snapshot is current; refreshes swap in a new
//! compiled `Taxonomy` without coordinating with in-flight requests. A failed
//! refresh keeps serving the previous snapshot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::skill::CanonicalSkillRow;
use crate::taxonomy::{CanonicalSkill, Taxonomy};

const BUILTIN_TAXONOMY: &str = include_str!("../../data/taxonomy.json");

/// Where canonical skills come from. Implement this to plug in another store.
#[async_trait]
pub trait TaxonomySource: Send + Sync {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError>;

    /// Short label for logs and the refresh endpoint.
    fn name(&self) -> &'static str;
}

/// Reads the `canonical_skills` table.
pub struct PgTaxonomySource {
    pool: PgPool,
}

impl PgTaxonomySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomySource for PgTaxonomySource {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError> {
        let rows = sqlx::query_as::<_, CanonicalSkillRow>(
            r#"
            SELECT slug,
                   COALESCE(aliases, '{}') AS aliases,
                   kind,
                   COALESCE(weight, 1.0) AS weight
            FROM canonical_skills
            ORDER BY slug
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CanonicalSkill::from).collect())
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

/// The seed taxonomy bundled with the binary.
pub struct BuiltinTaxonomySource;

#[async_trait]
impl TaxonomySource for BuiltinTaxonomySource {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError> {
        serde_json::from_str(BUILTIN_TAXONOMY)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("builtin taxonomy is invalid: {e}")))
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

#[derive(Debug, Clone)]
pub struct TaxonomySnapshot {
    pub taxonomy: Arc<Taxonomy>,
    pub loaded_at: DateTime<Utc>,
}

pub struct TaxonomyStore {
    source: Arc<dyn TaxonomySource>,
    snapshot: RwLock<Option<TaxonomySnapshot>>,
    fuzzy: bool,
}

impl TaxonomyStore {
    pub fn new(source: Arc<dyn TaxonomySource>, fuzzy: bool) -> Self {
        Self {
            source,
            snapshot: RwLock::new(None),
            fuzzy,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Loads and compiles the taxonomy, replacing the current snapshot.
    ///
    /// Any failure leaves the previous snapshot in place and surfaces as
    /// `TaxonomyUnavailable`.
    pub async fn refresh(&self) -> Result<TaxonomySnapshot, AppError> {
        let skills = self.source.load().await.map_err(|e| {
            warn!(source = self.source.name(), "Taxonomy load failed: {e}");
            AppError::TaxonomyUnavailable(e.to_string())
        })?;

        let taxonomy = Taxonomy::new(skills)
            .map_err(|e| {
                warn!(source = self.source.name(), "Taxonomy rejected: {e}");
                AppError::TaxonomyUnavailable(e.to_string())
            })?
            .with_fuzzy(self.fuzzy);
        if taxonomy.is_empty() {
            warn!(source = self.source.name(), "Taxonomy has no skills; nothing will match");
        }

        let snapshot = TaxonomySnapshot {
            taxonomy: Arc::new(taxonomy),
            loaded_at: Utc::now(),
        };
        info!(
            source = self.source.name(),
            skills = snapshot.taxonomy.len(),
            "Taxonomy refreshed"
        );
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Current snapshot, loading one on demand if none has succeeded yet.
    pub async fn current(&self) -> Result<TaxonomySnapshot, AppError> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(snapshot.clone());
        }
        self.refresh().await
    }

    /// Periodically refreshes the snapshot until the runtime shuts down.
    pub fn spawn_refresh_loop(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick fires immediately; startup already attempted a load.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // Failures are logged in refresh(); the stale snapshot stays.
                let _ = self.refresh().await;
            }
        })
    }
}
