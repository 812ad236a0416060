//! Resume feature extraction: raw resume text → bounded numeric signals.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ats::impact::assess_impact;
use crate::ats::profile::JobRequirementProfile;
use crate::ats::scoring::BonusPolicy;
use crate::ats::structure::assess_structure;
use crate::ats::text::content_terms;
use crate::taxonomy::{SkillKind, SkillMention, Taxonomy};

/// Signals extracted from one resume against one job profile.
///
/// Computed on demand, never mutated afterwards, safe to discard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeFeatureVector {
    /// Every canonical skill the resume mentions, with match confidence.
    pub mentions: BTreeMap<String, f64>,
    /// Mentions that are also required by the job.
    pub matched_skill_ids: BTreeSet<String>,
    /// Weighted share of required skills covered; `None` when the job requires none.
    pub skill_coverage_ratio: Option<f64>,
    pub text_similarity: f64,
    pub format_score: f64,
    pub impact_score: f64,
    pub cert_bonus: f64,
    pub tool_bonus: f64,
    pub presence_score: f64,
    pub years_experience: Option<f64>,
    pub quantified_statements: usize,
    pub vague_statements: usize,
}

/// Pure extractor. Holds only the bonus policy; taxonomy and profile are
/// passed per call so one instance serves every request.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    bonuses: BonusPolicy,
}

impl FeatureExtractor {
    pub fn new(bonuses: BonusPolicy) -> Self {
        Self { bonuses }
    }

    pub fn extract(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
        profile: &JobRequirementProfile,
    ) -> ResumeFeatureVector {
        if text.trim().is_empty() {
            return ResumeFeatureVector {
                skill_coverage_ratio: (!profile.is_empty()).then_some(0.0),
                ..Default::default()
            };
        }

        let found = taxonomy.lookup(text);
        let structure = assess_structure(text);
        let impact = assess_impact(text);

        let matched_skill_ids: BTreeSet<String> = found
            .iter()
            .filter(|m| profile.required_skills.contains(&m.slug))
            .map(|m| m.slug.clone())
            .collect();

        let (cert_bonus, tool_bonus) = self.bonuses(&found, profile);

        ResumeFeatureVector {
            skill_coverage_ratio: coverage(&found, profile),
            text_similarity: text_similarity(text, profile),
            format_score: structure.format_score,
            impact_score: impact.score,
            cert_bonus,
            tool_bonus,
            presence_score: structure.presence_score,
            years_experience: structure.years_experience,
            quantified_statements: impact.quantified_statements,
            vague_statements: impact.vague_statements,
            matched_skill_ids,
            mentions: found.into_iter().map(|m| (m.slug, m.confidence)).collect(),
        }
    }

    /// Rewards cert- and tool-kind skills the job did not ask for.
    fn bonuses(&self, found: &[SkillMention], profile: &JobRequirementProfile) -> (f64, f64) {
        let extra = found
            .iter()
            .filter(|m| !profile.required_skills.contains(&m.slug));
        let (mut certs, mut tools) = (0usize, 0usize);
        for mention in extra {
            match mention.kind {
                SkillKind::Cert => certs += 1,
                SkillKind::Tool | SkillKind::Platform => tools += 1,
                SkillKind::Skill | SkillKind::Soft => {}
            }
        }
        let b = &self.bonuses;
        (
            (certs as f64 * b.cert_per_match).min(b.cert_cap),
            (tools as f64 * b.tool_per_match).min(b.tool_cap),
        )
    }
}

/// Σ(weight × confidence) over matched required skills ÷ Σ weight of required skills.
fn coverage(found: &[SkillMention], profile: &JobRequirementProfile) -> Option<f64> {
    if profile.is_empty() {
        return None;
    }
    let total = profile.total_weight();
    if total <= 0.0 {
        return Some(0.0);
    }
    let matched: f64 = found
        .iter()
        .filter(|m| profile.required_skills.contains(&m.slug))
        .map(|m| profile.weight_of(&m.slug) * m.confidence)
        .sum();
    Some((matched / total).clamp(0.0, 1.0))
}

/// Share of the description's content terms that also appear in the resume.
fn text_similarity(text: &str, profile: &JobRequirementProfile) -> f64 {
    let wanted = &profile.description_terms;
    if wanted.is_empty() {
        return 0.0;
    }
    let have = content_terms(text);
    let shared = wanted.intersection(&have).count();
    shared as f64 / wanted.len() as f64
}
