use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub job_id: i64,
    pub candidate_id: Option<i64>,
    pub resume_id: Option<i64>,
    pub stage: String,
    pub created_at: DateTime<Utc>,
}
