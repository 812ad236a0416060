use async_trait::async_trait;
use sqlx::PgPool;

use crate::ats::ranking::RankingSource;
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;

/// `RankingSource` over the jobs / applications / resumes tables.
pub struct PgRankingSource {
    pool: PgPool,
    /// Lower-cased stages that never take part in a ranking.
    excluded_stages: Vec<String>,
}

impl PgRankingSource {
    pub fn new(pool: PgPool, excluded_stages: &[String]) -> Self {
        Self {
            pool,
            excluded_stages: excluded_stages.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl RankingSource for PgRankingSource {
    async fn fetch_job(&self, job_id: i64) -> Result<Option<JobRow>, AppError> {
        let job = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id,
                   title,
                   COALESCE(description, '') AS description,
                   COALESCE(skills, '{}') AS skills
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn fetch_active_applications(&self, job_id: i64) -> Result<Vec<ApplicationRow>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, job_id, candidate_id, resume_id, stage, created_at
            FROM applications
            WHERE job_id = $1
              AND lower(stage) <> ALL($2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(job_id)
        .bind(&self.excluded_stages)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_resumes(&self, resume_ids: &[i64]) -> Result<Vec<ResumeRow>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, extracted_text FROM resumes WHERE id = ANY($1)",
        )
        .bind(resume_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
