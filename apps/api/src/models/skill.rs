use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

use crate::taxonomy::{CanonicalSkill, SkillKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CanonicalSkillRow {
    pub slug: String,
    pub aliases: Vec<String>,
    pub kind: String,
    pub weight: f64,
}

impl From<CanonicalSkillRow> for CanonicalSkill {
    fn from(row: CanonicalSkillRow) -> Self {
        let kind = row.kind.parse::<SkillKind>().unwrap_or_else(|e| {
            warn!(slug = %row.slug, "{e}, treating as skill");
            SkillKind::Skill
        });
        CanonicalSkill {
            slug: row.slug,
            aliases: row.aliases,
            kind,
            weight: row.weight,
        }
    }
}
