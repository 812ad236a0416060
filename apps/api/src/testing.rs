//! In-memory collaborators and fixtures for unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ats::features::FeatureExtractor;
use crate::ats::ranking::{RankingEngine, RankingSource};
use crate::ats::scoring::WeightedScorer;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;
use crate::state::AppState;
use crate::taxonomy::store::{TaxonomySource, TaxonomyStore};
use crate::taxonomy::{CanonicalSkill, SkillKind};

/// Small taxonomy covering every skill kind.
pub fn fixture_taxonomy() -> Vec<CanonicalSkill> {
    vec![
        CanonicalSkill::new("python", &["python"], SkillKind::Skill),
        CanonicalSkill::new("sql", &["sql", "postgresql", "postgres", "mysql"], SkillKind::Skill),
        CanonicalSkill::new("docker", &["docker"], SkillKind::Tool),
        CanonicalSkill::new("aws", &["aws", "amazon web services"], SkillKind::Platform),
        CanonicalSkill::new("pmp", &["pmp"], SkillKind::Cert),
        CanonicalSkill::new("communication", &["communication skills"], SkillKind::Soft),
    ]
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
}

/// An active application created `minutes` after the fixture epoch.
pub fn application(id: i64, resume_id: Option<i64>, minutes: i64) -> ApplicationRow {
    ApplicationRow {
        id,
        job_id: 0,
        candidate_id: Some(id + 1000),
        resume_id,
        stage: "applied".to_string(),
        created_at: epoch() + Duration::minutes(minutes),
    }
}

/// One job plus its applications and resumes, held in memory.
pub struct InMemoryRankingSource {
    job: JobRow,
    applications: Vec<ApplicationRow>,
    resumes: HashMap<i64, ResumeRow>,
}

impl InMemoryRankingSource {
    pub fn new(job: JobRow) -> Self {
        Self {
            job,
            applications: Vec::new(),
            resumes: HashMap::new(),
        }
    }

    pub fn with_application(mut self, mut application: ApplicationRow) -> Self {
        application.job_id = self.job.id;
        self.applications.push(application);
        self
    }

    pub fn with_resume(self, id: i64, text: &str) -> Self {
        self.with_resume_row(ResumeRow {
            id,
            extracted_text: Some(text.to_string()),
        })
    }

    pub fn with_resume_row(mut self, row: ResumeRow) -> Self {
        self.resumes.insert(row.id, row);
        self
    }
}

#[async_trait]
impl RankingSource for InMemoryRankingSource {
    async fn fetch_job(&self, job_id: i64) -> Result<Option<JobRow>, AppError> {
        Ok((self.job.id == job_id).then(|| self.job.clone()))
    }

    async fn fetch_active_applications(&self, job_id: i64) -> Result<Vec<ApplicationRow>, AppError> {
        Ok(self
            .applications
            .iter()
            .filter(|a| a.job_id == job_id && !a.stage.eq_ignore_ascii_case("withdrawn"))
            .cloned()
            .collect())
    }

    async fn fetch_resumes(&self, resume_ids: &[i64]) -> Result<Vec<ResumeRow>, AppError> {
        Ok(resume_ids
            .iter()
            .filter_map(|id| self.resumes.get(id).cloned())
            .collect())
    }
}

pub struct StaticTaxonomySource(pub Vec<CanonicalSkill>);

#[async_trait]
impl TaxonomySource for StaticTaxonomySource {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct FailingTaxonomySource;

#[async_trait]
impl TaxonomySource for FailingTaxonomySource {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError> {
        Err(AppError::Internal(anyhow::anyhow!("connection refused")))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Serves its skills until switched into failure mode.
pub struct FlakyTaxonomySource {
    skills: Vec<CanonicalSkill>,
    failing: AtomicBool,
}

impl FlakyTaxonomySource {
    pub fn new(skills: Vec<CanonicalSkill>) -> Self {
        Self {
            skills,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaxonomySource for FlakyTaxonomySource {
    async fn load(&self) -> Result<Vec<CanonicalSkill>, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("store went away")));
        }
        Ok(self.skills.clone())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| (key == "DATABASE_URL").then(|| "postgres://test".to_string()))
        .unwrap()
}

pub fn test_state(source: InMemoryRankingSource, taxonomy: Arc<dyn TaxonomySource>) -> AppState {
    AppState {
        config: test_config(),
        source: Arc::new(source),
        taxonomy: Arc::new(TaxonomyStore::new(taxonomy, false)),
        engine: Arc::new(RankingEngine::new(
            FeatureExtractor::default(),
            Arc::new(WeightedScorer::default()),
        )),
    }
}
