use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    /// Plain text extracted from the uploaded file; null when extraction never ran.
    pub extracted_text: Option<String>,
}
