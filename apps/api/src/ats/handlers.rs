use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ats::profile::JobRequirementProfile;
use crate::ats::ranking::{rank_job, RankingRequest, RankingResponse};
use crate::ats::scoring::ScoreBreakdown;
use crate::errors::AppError;
use crate::state::AppState;
use crate::taxonomy::{CanonicalSkill, SkillMention};

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub resume_id: Option<i64>,
    pub dedupe: Option<bool>,
}

/// GET|POST /api/v1/jobs/:job_id/ranking
pub async fn handle_rank_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<RankingQuery>,
) -> Result<Json<RankingResponse>, AppError> {
    let job_id: i64 = job_id.trim().parse().map_err(|_| {
        AppError::Validation(format!("job_id must be a positive integer, got '{job_id}'"))
    })?;
    let request = RankingRequest {
        job_id,
        resume_id: params.resume_id,
        dedupe: params.dedupe.unwrap_or(true),
    };
    let response = rank_job(
        state.source.as_ref(),
        &state.taxonomy,
        state.engine.clone(),
        request,
    )
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub mentions: Vec<SkillMention>,
}

/// POST /api/v1/ats/preview
///
/// Scores one pasted resume against an ad-hoc job. Nothing is persisted.
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let snapshot = state.taxonomy.current().await?;
    let profile = JobRequirementProfile::build(&req.skills, &req.description, &snapshot.taxonomy);
    let matching = profile
        .matching_taxonomy(&snapshot.taxonomy)
        .map_err(|e| AppError::Validation(format!("unusable skill list: {e}")))?;

    let card = state.engine.score_text(&req.resume_text, &matching, &profile)?;
    Ok(Json(PreviewResponse {
        score: card.score,
        breakdown: card.breakdown,
        mentions: matching.lookup(&req.resume_text),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyRefreshResponse {
    pub ok: bool,
    pub skills: usize,
    pub source: &'static str,
    pub loaded_at: DateTime<Utc>,
}

/// POST /api/v1/taxonomy/refresh
pub async fn handle_taxonomy_refresh(
    State(state): State<AppState>,
) -> Result<Json<TaxonomyRefreshResponse>, AppError> {
    let snapshot = state.taxonomy.refresh().await?;
    Ok(Json(TaxonomyRefreshResponse {
        ok: true,
        skills: snapshot.taxonomy.len(),
        source: state.taxonomy.source_name(),
        loaded_at: snapshot.loaded_at,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyListResponse {
    pub source: &'static str,
    pub loaded_at: DateTime<Utc>,
    pub fuzzy_matching: bool,
    pub skills: Vec<CanonicalSkill>,
}

/// GET /api/v1/taxonomy
pub async fn handle_list_taxonomy(
    State(state): State<AppState>,
) -> Result<Json<TaxonomyListResponse>, AppError> {
    let snapshot = state.taxonomy.current().await?;
    Ok(Json(TaxonomyListResponse {
        source: state.taxonomy.source_name(),
        loaded_at: snapshot.loaded_at,
        fuzzy_matching: state.config.fuzzy_skill_matching,
        skills: snapshot.taxonomy.skills().to_vec(),
    }))
}
