use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The slice of a job posting the ranking engine reads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Explicitly declared skills, as typed by the employer.
    pub skills: Vec<String>,
}
