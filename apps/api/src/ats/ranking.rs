//! Ranking aggregator: scores every applicant for a job and orders them.
//!
//! The aggregator owns all derived data (profile, feature vectors, score
//! cards) for the lifetime of one request. Job, application and resume rows
//! belong to the persistence layer and are read through `RankingSource`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, Span};
use uuid::Uuid;

use crate::ats::features::FeatureExtractor;
use crate::ats::profile::JobRequirementProfile;
use crate::ats::scoring::{ResumeScorer, ScoreBreakdown, ScoreCard, ScoringError};
use crate::ats::text::content_fingerprint;
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::Taxonomy;

// ────────────────────────────────────────────────────────────────────────────
// Persistence collaborator
// ────────────────────────────────────────────────────────────────────────────

/// Read-only view of the rows the ranking needs.
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn fetch_job(&self, job_id: i64) -> Result<Option<JobRow>, AppError>;

    /// Applications for the job, excluding withdrawn / terminal stages.
    async fn fetch_active_applications(&self, job_id: i64) -> Result<Vec<ApplicationRow>, AppError>;

    /// Resume rows for the given ids; missing ids are simply absent.
    async fn fetch_resumes(&self, resume_ids: &[i64]) -> Result<Vec<ResumeRow>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RankingRequest {
    pub job_id: i64,
    /// Restrict the returned list to entries backed by this resume.
    pub resume_id: Option<i64>,
    pub dedupe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    /// 1-based position in the full ranking.
    pub rank: usize,
    pub resume_id: i64,
    pub application_id: i64,
    pub candidate_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Other applications backed by the same resume content.
    pub deduped: bool,
    pub duplicate_application_ids: Vec<i64>,
    /// Resumes behind the collapsed duplicates, for the focus filter.
    #[serde(skip)]
    pub duplicate_resume_ids: Vec<i64>,
}

impl RankedCandidate {
    /// Whether this entry, or anything collapsed into it, uses `resume_id`.
    pub fn is_backed_by(&self, resume_id: i64) -> bool {
        self.resume_id == resume_id || self.duplicate_resume_ids.contains(&resume_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResponse {
    pub ok: bool,
    pub job_id: i64,
    pub deduped: bool,
    pub resume_id: Option<i64>,
    pub run_id: Uuid,
    /// Applications left out because no resume is on file.
    pub omitted: usize,
    pub ranked: Vec<RankedCandidate>,
}

/// One application paired with the text of its resume.
#[derive(Debug, Clone)]
pub struct CandidateInput {
    pub application: ApplicationRow,
    pub resume_id: i64,
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Extractor + scorer pair shared by every ranking request.
pub struct RankingEngine {
    extractor: FeatureExtractor,
    scorer: Arc<dyn ResumeScorer>,
}

impl RankingEngine {
    pub fn new(extractor: FeatureExtractor, scorer: Arc<dyn ResumeScorer>) -> Self {
        Self { extractor, scorer }
    }

    pub fn scorer_backend(&self) -> &'static str {
        self.scorer.backend()
    }

    /// Extracts features from one resume and scores them.
    pub fn score_text(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        profile: &JobRequirementProfile,
    ) -> Result<ScoreCard, ScoringError> {
        let features = self.extractor.extract(text, taxonomy, profile);
        self.scorer.score(&features, profile)
    }

    /// Scores, de-duplicates and orders candidates. Pure and deterministic.
    ///
    /// Scoring fans out over the rayon pool; the output order depends only on
    /// (score desc, created_at asc, application id asc).
    pub fn rank_candidates(
        &self,
        inputs: Vec<CandidateInput>,
        taxonomy: &Taxonomy,
        profile: &JobRequirementProfile,
        dedupe: bool,
    ) -> Result<Vec<RankedCandidate>, ScoringError> {
        let groups = if dedupe {
            group_by_content(inputs)
        } else {
            inputs.into_iter().map(|i| (i, Vec::new())).collect()
        };

        let mut ranked: Vec<RankedCandidate> = groups
            .into_par_iter()
            .map(|(input, duplicates)| -> Result<RankedCandidate, ScoringError> {
                let card = self.score_text(&input.text, taxonomy, profile)?;
                Ok(RankedCandidate {
                    rank: 0,
                    resume_id: input.resume_id,
                    application_id: input.application.id,
                    candidate_id: input.application.candidate_id,
                    created_at: input.application.created_at,
                    score: card.score,
                    breakdown: card.breakdown,
                    deduped: !duplicates.is_empty(),
                    duplicate_application_ids: duplicates.iter().map(|(app, _)| *app).collect(),
                    duplicate_resume_ids: duplicates.iter().map(|(_, resume)| *resume).collect(),
                })
            })
            .collect::<Result<_, ScoringError>>()?;

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        for (idx, candidate) in ranked.iter_mut().enumerate() {
            candidate.rank = idx + 1;
        }
        Ok(ranked)
    }
}

/// Collapses inputs whose resume content is identical. The earliest
/// application represents the group; the rest are listed as duplicates.
/// Blank resumes are never collapsed.
fn group_by_content(inputs: Vec<CandidateInput>) -> Vec<(CandidateInput, Vec<(i64, i64)>)> {
    let mut inputs = inputs;
    inputs.sort_by(|a, b| {
        a.application
            .created_at
            .cmp(&b.application.created_at)
            .then_with(|| a.application.id.cmp(&b.application.id))
    });

    let mut groups: Vec<(CandidateInput, Vec<(i64, i64)>)> = Vec::with_capacity(inputs.len());
    let mut by_fingerprint: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        match content_fingerprint(&input.text) {
            Some(fp) => match by_fingerprint.get(&fp) {
                Some(&idx) => groups[idx].1.push((input.application.id, input.resume_id)),
                None => {
                    by_fingerprint.insert(fp, groups.len());
                    groups.push((input, Vec::new()));
                }
            },
            None => groups.push((input, Vec::new())),
        }
    }
    groups
}

// ────────────────────────────────────────────────────────────────────────────
// Request pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Loads everything for one job, ranks it and shapes the response.
#[instrument(
    skip(source, taxonomy, engine),
    fields(job_id = request.job_id, run_id = tracing::field::Empty)
)]
pub async fn rank_job(
    source: &dyn RankingSource,
    taxonomy: &TaxonomyStore,
    engine: Arc<RankingEngine>,
    request: RankingRequest,
) -> Result<RankingResponse, AppError> {
    let run_id = Uuid::new_v4();
    Span::current().record("run_id", tracing::field::display(run_id));

    if request.job_id <= 0 {
        return Err(AppError::Validation(
            "job_id must be a positive integer".to_string(),
        ));
    }

    let job = source
        .fetch_job(request.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", request.job_id)))?;

    // No skill universe, no scoring: fail the whole call as retryable.
    let snapshot = taxonomy.current().await?;

    let applications = source.fetch_active_applications(job.id).await?;
    if applications.is_empty() {
        info!("No applications to rank");
        return Ok(RankingResponse {
            ok: true,
            job_id: job.id,
            deduped: false,
            resume_id: request.resume_id,
            run_id,
            omitted: 0,
            ranked: Vec::new(),
        });
    }

    let (inputs, omitted) = attach_resumes(source, applications).await?;

    let profile = JobRequirementProfile::build(&job.skills, &job.description, &snapshot.taxonomy);
    let matching = profile
        .matching_taxonomy(&snapshot.taxonomy)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("custom skills rejected: {e}")))?;

    let candidate_count = inputs.len();
    let ranked = tokio::task::spawn_blocking(move || {
        engine.rank_candidates(inputs, &matching, &profile, request.dedupe)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("ranking task failed: {e}")))??;

    info!(
        candidates = candidate_count,
        ranked = ranked.len(),
        omitted,
        "Ranking complete"
    );

    let ranked: Vec<RankedCandidate> = match request.resume_id {
        Some(focus) => ranked.into_iter().filter(|c| c.is_backed_by(focus)).collect(),
        None => ranked,
    };
    // Describes the entries actually returned.
    let deduped = ranked.iter().any(|c| c.deduped);

    Ok(RankingResponse {
        ok: true,
        job_id: job.id,
        deduped,
        resume_id: request.resume_id,
        run_id,
        omitted,
        ranked,
    })
}

/// Pairs applications with resume text. Applications without a resume row
/// are dropped and counted; a resume with no extracted text scores as blank.
async fn attach_resumes(
    source: &dyn RankingSource,
    applications: Vec<ApplicationRow>,
) -> Result<(Vec<CandidateInput>, usize), AppError> {
    let mut resume_ids: Vec<i64> = applications.iter().filter_map(|a| a.resume_id).collect();
    resume_ids.sort_unstable();
    resume_ids.dedup();

    let resumes: BTreeMap<i64, ResumeRow> = if resume_ids.is_empty() {
        BTreeMap::new()
    } else {
        source
            .fetch_resumes(&resume_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect()
    };

    let total = applications.len();
    let inputs: Vec<CandidateInput> = applications
        .into_iter()
        .filter_map(|application| {
            let resume = resumes.get(&application.resume_id?)?;
            Some(CandidateInput {
                resume_id: resume.id,
                text: resume.extracted_text.clone().unwrap_or_default(),
                application,
            })
        })
        .collect();
    let omitted = total - inputs.len();
    Ok((inputs, omitted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::scoring::WeightedScorer;
    use crate::testing::{
        application, fixture_taxonomy, FailingTaxonomySource, InMemoryRankingSource,
        StaticTaxonomySource,
    };
    use chrono::TimeZone;

    fn engine() -> Arc<RankingEngine> {
        Arc::new(RankingEngine::new(
            FeatureExtractor::default(),
            Arc::new(WeightedScorer::default()),
        ))
    }

    fn store() -> TaxonomyStore {
        TaxonomyStore::new(Arc::new(StaticTaxonomySource(fixture_taxonomy())), false)
    }

    fn request(job_id: i64) -> RankingRequest {
        RankingRequest {
            job_id,
            resume_id: None,
            dedupe: true,
        }
    }

    fn python_sql_job() -> JobRow {
        JobRow {
            id: 1,
            title: "Data Engineer".to_string(),
            description: String::new(),
            skills: vec!["python".to_string(), "sql".to_string()],
        }
    }

    #[tokio::test]
    async fn test_alias_match_gives_full_coverage() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(10, Some(100), 0))
            .with_resume(100, "Senior Python engineer. Tuned PostgreSQL for years.");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        let top = &response.ranked[0];
        assert_eq!(top.breakdown.matched_skills_count, 2);
        assert_eq!(top.breakdown.required_skills_total, 2);
        assert_eq!(top.breakdown.skill_coverage, 1.0);
    }

    #[tokio::test]
    async fn test_no_matching_skills_scores_low_but_ranks() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(10, Some(100), 0))
            .with_resume(100, "Experience: pastry chef\nEducation: culinary school");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        let only = &response.ranked[0];
        assert_eq!(only.breakdown.skill_coverage, 0.0);
        assert!(only.score > 0.0, "format/presence still count");
        assert!(only.score < 0.5);
    }

    #[tokio::test]
    async fn test_equal_scores_rank_earlier_application_first() {
        let text = "Experience in retail";
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(21, Some(201), 60))
            .with_application(application(20, Some(200), 0))
            .with_resume(200, text)
            .with_resume(201, text);

        // Same content would collapse; rank without de-duplication.
        let mut req = request(1);
        req.dedupe = false;
        let response = rank_job(&source, &store(), engine(), req).await.unwrap();
        let order: Vec<i64> = response.ranked.iter().map(|c| c.application_id).collect();
        assert_eq!(order, vec![20, 21]);
        assert_eq!(response.ranked[0].score, response.ranked[1].score);
        assert_eq!(response.ranked[0].rank, 1);
        assert_eq!(response.ranked[1].rank, 2);
    }

    #[tokio::test]
    async fn test_empty_job_uses_neutral_coverage_for_everyone() {
        let job = JobRow {
            id: 2,
            title: "Generalist".to_string(),
            description: String::new(),
            skills: vec![],
        };
        let source = InMemoryRankingSource::new(job)
            .with_application(application(30, Some(300), 0))
            .with_application(application(31, Some(301), 5))
            .with_resume(300, "Python, SQL, Docker")
            .with_resume(301, "Experience\nEducation\nSkills\nProjects\nSummary");

        let response = rank_job(&source, &store(), engine(), request(2)).await.unwrap();
        assert!(response.ranked.iter().all(|c| c.breakdown.skill_coverage == 0.5));
        // Structure, not skills, separates them.
        assert_eq!(response.ranked[0].application_id, 31);
    }

    #[tokio::test]
    async fn test_applications_without_resume_are_omitted() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(40, Some(400), 0))
            .with_application(application(41, None, 1))
            .with_application(application(42, Some(402), 2))
            .with_application(application(43, Some(999), 3)) // row missing
            .with_resume(400, "Python")
            .with_resume(402, "SQL");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert_eq!(response.ranked.len(), 2);
        assert_eq!(response.omitted, 2);
        assert!(response
            .ranked
            .iter()
            .all(|c| c.application_id == 40 || c.application_id == 42));
    }

    #[tokio::test]
    async fn test_resume_without_text_scores_at_floor() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(50, Some(500), 0))
            .with_resume_row(ResumeRow {
                id: 500,
                extracted_text: None,
            });

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert_eq!(response.ranked.len(), 1);
        assert_eq!(response.ranked[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_duplicate_content_collapses_to_earliest() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(61, Some(601), 10))
            .with_application(application(60, Some(600), 0))
            .with_application(application(62, Some(600), 20))
            .with_resume(600, "Python and SQL")
            .with_resume(601, "python   AND sql");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert!(response.deduped);
        assert_eq!(response.ranked.len(), 1);
        let rep = &response.ranked[0];
        assert_eq!(rep.application_id, 60);
        assert!(rep.deduped);
        assert_eq!(rep.duplicate_application_ids, vec![61, 62]);
    }

    #[tokio::test]
    async fn test_blank_resumes_are_not_collapsed() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(70, Some(700), 0))
            .with_application(application(71, Some(701), 1))
            .with_resume(700, "")
            .with_resume(701, "  ");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert!(!response.deduped);
        assert_eq!(response.ranked.len(), 2);
    }

    #[tokio::test]
    async fn test_ranking_twice_gives_identical_order() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(80, Some(800), 0))
            .with_application(application(81, Some(801), 1))
            .with_application(application(82, Some(802), 2))
            .with_resume(800, "Python")
            .with_resume(801, "Python, PostgreSQL\nReduced costs by 20%")
            .with_resume(802, "Welding");

        let first = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        let second = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert_eq!(first.ranked, second.ranked);
        assert_eq!(first.ranked[0].application_id, 81);
    }

    #[tokio::test]
    async fn test_focus_resume_keeps_global_rank() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(90, Some(900), 0))
            .with_application(application(91, Some(901), 1))
            .with_resume(900, "Python and SQL")
            .with_resume(901, "Gardening");

        let mut req = request(1);
        req.resume_id = Some(901);
        let response = rank_job(&source, &store(), engine(), req).await.unwrap();
        assert_eq!(response.resume_id, Some(901));
        assert_eq!(response.ranked.len(), 1);
        assert_eq!(response.ranked[0].rank, 2);
    }

    #[tokio::test]
    async fn test_focus_resume_matches_collapsed_duplicate() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(95, Some(950), 0))
            .with_application(application(96, Some(951), 1))
            .with_resume(950, "Python")
            .with_resume(951, "python");

        let mut req = request(1);
        req.resume_id = Some(951);
        let response = rank_job(&source, &store(), engine(), req).await.unwrap();
        assert_eq!(response.ranked.len(), 1);
        assert_eq!(response.ranked[0].application_id, 95);
        assert_eq!(response.ranked[0].duplicate_application_ids, vec![96]);
    }

    #[tokio::test]
    async fn test_deduped_flag_follows_focus_filter() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(110, Some(1100), 0))
            .with_application(application(111, Some(1101), 1))
            .with_application(application(112, Some(1102), 2))
            .with_resume(1100, "Python")
            .with_resume(1101, "python")
            .with_resume(1102, "SQL");

        let whole = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert!(whole.deduped);

        let mut req = request(1);
        req.resume_id = Some(1102);
        let focused = rank_job(&source, &store(), engine(), req).await.unwrap();
        assert_eq!(focused.ranked.len(), 1);
        assert!(!focused.deduped);
    }

    #[tokio::test]
    async fn test_withdrawn_applications_are_not_ranked() {
        let mut withdrawn = application(98, Some(980), 0);
        withdrawn.stage = "Withdrawn".to_string();
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(withdrawn)
            .with_application(application(99, Some(990), 1))
            .with_resume(980, "Python and SQL")
            .with_resume(990, "Python");

        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert_eq!(response.ranked.len(), 1);
        assert_eq!(response.ranked[0].application_id, 99);
        assert_eq!(response.omitted, 0);
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let source = InMemoryRankingSource::new(python_sql_job());
        let err = rank_job(&source, &store(), engine(), request(77)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_job_id_is_rejected() {
        let source = InMemoryRankingSource::new(python_sql_job());
        let err = rank_job(&source, &store(), engine(), request(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_no_applications_is_ok_and_empty() {
        let source = InMemoryRankingSource::new(python_sql_job());
        let response = rank_job(&source, &store(), engine(), request(1)).await.unwrap();
        assert!(response.ok);
        assert!(response.ranked.is_empty());
    }

    #[tokio::test]
    async fn test_taxonomy_outage_fails_whole_call() {
        let source = InMemoryRankingSource::new(python_sql_job())
            .with_application(application(10, Some(100), 0))
            .with_resume(100, "Python");
        let store = TaxonomyStore::new(Arc::new(FailingTaxonomySource), false);

        let err = rank_job(&source, &store, engine(), request(1)).await.unwrap_err();
        assert!(matches!(err, AppError::TaxonomyUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_adding_a_matched_skill_never_lowers_score() {
        let taxonomy = Taxonomy::new(fixture_taxonomy()).unwrap();
        let skills: Vec<String> = ["python", "sql", "docker"].iter().map(|s| s.to_string()).collect();
        let profile = JobRequirementProfile::build(&skills, "", &taxonomy);
        let engine = engine();

        let base = "Experience\nWorked with Python";
        let more = "Experience\nWorked with Python and SQL";
        let a = engine.score_text(base, &taxonomy, &profile).unwrap();
        let b = engine.score_text(more, &taxonomy, &profile).unwrap();
        assert!(b.score >= a.score);
        assert_eq!(b.breakdown.matched_skills_count, 2);
    }

    #[test]
    fn test_empty_resume_hits_the_floor() {
        let taxonomy = Taxonomy::new(fixture_taxonomy()).unwrap();
        let skills = vec!["python".to_string()];
        let profile =
            JobRequirementProfile::build(&skills, "Build Python data services", &taxonomy);
        let card = engine().score_text("", &taxonomy, &profile).unwrap();
        assert_eq!(card.score, 0.0);
        assert_eq!(card.breakdown.cert_bonus + card.breakdown.tool_bonus, 0.0);
    }

    #[test]
    fn test_created_at_helper_orders_minutes() {
        let a = application(1, None, 0);
        let b = application(2, None, 1);
        assert!(a.created_at < b.created_at);
        assert_eq!(a.created_at, Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap());
    }
}
