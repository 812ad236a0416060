use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::ats::scoring::{ScoringPolicy, ScoringWeights};

/// Where the skill taxonomy is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomySourceKind {
    /// The `canonical_skills` table.
    Database,
    /// The JSON seed compiled into the binary.
    Builtin,
}

impl FromStr for TaxonomySourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "builtin" => Ok(Self::Builtin),
            other => bail!("TAXONOMY_SOURCE must be 'database' or 'builtin', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub taxonomy_source: TaxonomySourceKind,
    /// Zero disables the background refresh loop.
    pub taxonomy_refresh_secs: u64,
    pub fuzzy_skill_matching: bool,
    /// Rayon worker threads for scoring; zero keeps rayon's default.
    pub ranking_workers: usize,
    pub excluded_stages: Vec<String>,
    pub scoring: ScoringPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let defaults = ScoringWeights::default();
        let default_policy = ScoringPolicy::default();
        let scoring = ScoringPolicy {
            weights: ScoringWeights {
                skill_coverage: env.parse_or("ATS_WEIGHT_SKILLS", defaults.skill_coverage)?,
                text_similarity: env.parse_or("ATS_WEIGHT_TEXT", defaults.text_similarity)?,
                format: env.parse_or("ATS_WEIGHT_FORMAT", defaults.format)?,
                presence: env.parse_or("ATS_WEIGHT_PRESENCE", defaults.presence)?,
                impact: env.parse_or("ATS_WEIGHT_IMPACT", defaults.impact)?,
            },
            neutral_coverage: env
                .parse_or("ATS_NEUTRAL_COVERAGE", default_policy.neutral_coverage)?,
            bonuses: default_policy.bonuses,
        };
        scoring
            .validate()
            .context("Invalid ATS scoring configuration")?;

        let excluded_stages = env
            .get("EXCLUDED_STAGES")
            .unwrap_or_else(|| "withdrawn".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            taxonomy_source: env.parse_or("TAXONOMY_SOURCE", TaxonomySourceKind::Database)?,
            taxonomy_refresh_secs: env.parse_or("TAXONOMY_REFRESH_SECS", 300)?,
            fuzzy_skill_matching: env.parse_or("FUZZY_SKILL_MATCHING", false)?,
            ranking_workers: env.parse_or("RANKING_WORKERS", 0)?,
            excluded_stages,
            scoring,
        })
    }

    pub fn taxonomy_refresh_interval(&self) -> Option<Duration> {
        (self.taxonomy_refresh_secs > 0).then(|| Duration::from_secs(self.taxonomy_refresh_secs))
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are treated the same.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/ats")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.taxonomy_source, TaxonomySourceKind::Database);
        assert_eq!(config.taxonomy_refresh_interval(), Some(Duration::from_secs(300)));
        assert!(!config.fuzzy_skill_matching);
        assert_eq!(config.ranking_workers, 0);
        assert_eq!(config.excluded_stages, vec!["withdrawn"]);
        assert_eq!(config.scoring, ScoringPolicy::default());
    }

    #[test]
    fn test_database_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("PORT", "9000"),
            ("TAXONOMY_SOURCE", "Builtin"),
            ("TAXONOMY_REFRESH_SECS", "0"),
            ("FUZZY_SKILL_MATCHING", "true"),
            ("EXCLUDED_STAGES", "Withdrawn, rejected ,"),
            ("ATS_WEIGHT_SKILLS", "0.5"),
            ("ATS_WEIGHT_TEXT", "0.2"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.taxonomy_source, TaxonomySourceKind::Builtin);
        assert_eq!(config.taxonomy_refresh_interval(), None);
        assert!(config.fuzzy_skill_matching);
        assert_eq!(config.excluded_stages, vec!["withdrawn", "rejected"]);
        assert_eq!(config.scoring.weights.skill_coverage, 0.5);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("ATS_WEIGHT_SKILLS", "0.9"),
        ])
        .unwrap_err();
        assert!(format!("{err:#}").contains("sum to 1.0"));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(load(&[("DATABASE_URL", "x"), ("PORT", "eighty")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("TAXONOMY_SOURCE", "s3")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("ATS_NEUTRAL_COVERAGE", "1.5")]).is_err());
    }
}
