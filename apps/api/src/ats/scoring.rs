//! Scoring: combines a resume's feature vector with a job profile into one
//! bounded score plus a breakdown that explains it.
//!
//! Default: `WeightedScorer` (pure weighted sum, deterministic, no I/O).
//! `RankingEngine` holds an `Arc<dyn ResumeScorer>` so the formula can be
//! swapped without touching the aggregator or handlers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ats::features::ResumeFeatureVector;
use crate::ats::profile::JobRequirementProfile;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// Weights of the bounded core sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill_coverage: f64,
    pub text_similarity: f64,
    pub format: f64,
    pub presence: f64,
    pub impact: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_coverage: 0.45,
            text_similarity: 0.25,
            format: 0.10,
            presence: 0.05,
            impact: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), ScoringError> {
        let all = [
            ("skill_coverage", self.skill_coverage),
            ("text_similarity", self.text_similarity),
            ("format", self.format),
            ("presence", self.presence),
            ("impact", self.impact),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                return Err(ScoringError::InvalidWeights(format!(
                    "{name} must be a finite non-negative number, got {w}"
                )));
            }
        }
        let sum: f64 = all.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringError::InvalidWeights(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Additive bonuses for over-qualification, applied after the weighted sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusPolicy {
    pub cert_per_match: f64,
    pub cert_cap: f64,
    pub tool_per_match: f64,
    pub tool_cap: f64,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        Self {
            cert_per_match: 0.02,
            cert_cap: 0.06,
            tool_per_match: 0.01,
            tool_cap: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: ScoringWeights,
    /// Coverage credited when a job requires no skills at all.
    pub neutral_coverage: f64,
    pub bonuses: BonusPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            neutral_coverage: 0.5,
            bonuses: BonusPolicy::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), ScoringError> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.neutral_coverage) {
            return Err(ScoringError::InvalidWeights(format!(
                "neutral coverage must be within [0, 1], got {}",
                self.neutral_coverage
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// Every sub-score that went into a candidate's score, for transparency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Coverage value actually used (neutral default when nothing is required).
    pub skill_coverage: f64,
    pub skill_coverage_ratio: Option<f64>,
    pub text_similarity: f64,
    pub format_score: f64,
    pub presence_score: f64,
    pub impact_score: f64,
    pub cert_bonus: f64,
    pub tool_bonus: f64,
    /// Weighted sum before bonuses.
    pub base_score: f64,
    pub matched_skills_count: usize,
    pub required_skills_total: usize,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub years_experience: Option<f64>,
    pub quantified_statements: usize,
    pub vague_statements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("non-finite {0} produced by scorer")]
    NonFinite(&'static str),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap the scoring formula. Must be pure: identical
/// inputs give identical outputs.
pub trait ResumeScorer: Send + Sync {
    fn score(
        &self,
        features: &ResumeFeatureVector,
        profile: &JobRequirementProfile,
    ) -> Result<ScoreCard, ScoringError>;

    /// "weighted" etc., for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// WeightedScorer
// ────────────────────────────────────────────────────────────────────────────

/// score = clamp(Σ wᵢ·subᵢ + cert_bonus + tool_bonus, 0, 1)
#[derive(Debug, Clone, Default)]
pub struct WeightedScorer {
    policy: ScoringPolicy,
}

impl WeightedScorer {
    pub fn new(policy: ScoringPolicy) -> Result<Self, ScoringError> {
        policy.validate()?;
        Ok(Self { policy })
    }
}

impl ResumeScorer for WeightedScorer {
    fn score(
        &self,
        features: &ResumeFeatureVector,
        profile: &JobRequirementProfile,
    ) -> Result<ScoreCard, ScoringError> {
        let w = &self.policy.weights;

        let skill_coverage = match features.skill_coverage_ratio {
            _ if profile.is_empty() => self.policy.neutral_coverage,
            Some(ratio) => unit(ratio),
            None => 0.0,
        };
        let text_similarity = unit(features.text_similarity);
        let format_score = unit(features.format_score);
        let presence_score = unit(features.presence_score);
        let impact_score = unit(features.impact_score);
        let cert_bonus = non_negative(features.cert_bonus);
        let tool_bonus = non_negative(features.tool_bonus);

        let base_score = compute_combined_score(
            &[
                (w.skill_coverage, skill_coverage),
                (w.text_similarity, text_similarity),
                (w.format, format_score),
                (w.presence, presence_score),
                (w.impact, impact_score),
            ],
        );
        if !base_score.is_finite() {
            return Err(ScoringError::NonFinite("base score"));
        }
        let score = (base_score + cert_bonus + tool_bonus).clamp(0.0, 1.0);
        if !score.is_finite() {
            return Err(ScoringError::NonFinite("score"));
        }

        let matched_skills: Vec<String> = features.matched_skill_ids.iter().cloned().collect();
        let missing_skills: Vec<String> = profile
            .required_skills
            .iter()
            .filter(|s| !features.matched_skill_ids.contains(*s))
            .cloned()
            .collect();

        Ok(ScoreCard {
            score,
            breakdown: ScoreBreakdown {
                skill_coverage,
                skill_coverage_ratio: features.skill_coverage_ratio.map(unit),
                text_similarity,
                format_score,
                presence_score,
                impact_score,
                cert_bonus,
                tool_bonus,
                base_score,
                matched_skills_count: matched_skills.len(),
                required_skills_total: profile.required_skills.len(),
                matched_skills,
                missing_skills,
                years_experience: features.years_experience.filter(|y| y.is_finite()),
                quantified_statements: features.quantified_statements,
                vague_statements: features.vague_statements,
            },
        })
    }

    fn backend(&self) -> &'static str {
        "weighted"
    }
}

/// Weighted sum of (weight, value) pairs.
pub fn compute_combined_score(parts: &[(f64, f64)]) -> f64 {
    parts.iter().map(|(w, v)| w * v).sum()
}

/// Malformed sub-scores count as zero rather than aborting the ranking.
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
