//! Job requirement profile: what a job asks for, as weighted canonical skills.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ats::text::{content_terms, normalize, word_spans};
use crate::taxonomy::{CanonicalSkill, SkillKind, Taxonomy, TaxonomyError};

/// Source weight for skills the employer listed explicitly.
pub const EXPLICIT_SKILL_WEIGHT: f64 = 1.0;
/// Source weight for skills only mentioned in the description prose.
pub const DESCRIPTION_SKILL_WEIGHT: f64 = 0.5;
/// Slug namespace for explicit entries that match no canonical skill.
pub const CUSTOM_SLUG_PREFIX: &str = "custom:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequirementProfile {
    pub required_skills: BTreeSet<String>,
    pub skill_weights: BTreeMap<String, f64>,
    pub raw_description_text: String,
    /// Content terms of the description, for lexical similarity.
    pub description_terms: BTreeSet<String>,
    /// Ad-hoc requirements the taxonomy does not know about.
    pub custom_skills: Vec<CanonicalSkill>,
}

impl JobRequirementProfile {
    /// Builds the profile from a job's declared skill list and description.
    ///
    /// Each explicit entry is resolved on its own text: an entry that equals a
    /// known alias maps to that skill, an entry containing known aliases maps
    /// to all of them, and anything else becomes a `custom:` requirement that
    /// is matched literally.
    pub fn build(explicit_skills: &[String], description: &str, taxonomy: &Taxonomy) -> Self {
        let mut weights: BTreeMap<String, f64> = BTreeMap::new();
        let mut custom_skills = Vec::new();

        for entry in explicit_skills {
            let normalized = normalize(entry);
            // Bare punctuation ("-", "/", "&") names no skill.
            if word_spans(&normalized).is_empty() {
                continue;
            }
            let mentions = taxonomy.lookup(&normalized);
            if mentions.is_empty() {
                let slug = format!("{CUSTOM_SLUG_PREFIX}{normalized}");
                if !weights.contains_key(&slug) {
                    custom_skills.push(CanonicalSkill {
                        slug: slug.clone(),
                        aliases: vec![normalized],
                        kind: SkillKind::Skill,
                        weight: 1.0,
                    });
                }
                weights.insert(slug, EXPLICIT_SKILL_WEIGHT);
                continue;
            }
            for mention in mentions {
                let weight = EXPLICIT_SKILL_WEIGHT * skill_weight(taxonomy, &mention.slug);
                raise(&mut weights, mention.slug, weight);
            }
        }

        for mention in taxonomy.lookup(description) {
            let weight = DESCRIPTION_SKILL_WEIGHT * skill_weight(taxonomy, &mention.slug);
            raise(&mut weights, mention.slug, weight);
        }

        Self {
            required_skills: weights.keys().cloned().collect(),
            skill_weights: weights,
            raw_description_text: description.to_string(),
            description_terms: content_terms(description),
            custom_skills,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required_skills.is_empty()
    }

    pub fn weight_of(&self, slug: &str) -> f64 {
        self.skill_weights.get(slug).copied().unwrap_or(0.0)
    }

    pub fn total_weight(&self) -> f64 {
        self.skill_weights.values().sum()
    }

    /// Taxonomy to match resumes with: the base plus this job's custom skills.
    pub fn matching_taxonomy(&self, base: &Arc<Taxonomy>) -> Result<Arc<Taxonomy>, TaxonomyError> {
        if self.custom_skills.is_empty() {
            return Ok(Arc::clone(base));
        }
        Ok(Arc::new(base.extended(self.custom_skills.clone())?))
    }
}

fn skill_weight(taxonomy: &Taxonomy, slug: &str) -> f64 {
    taxonomy.get(slug).map(|s| s.weight).unwrap_or(1.0)
}

/// Explicit listing beats incidental description phrasing, never the reverse.
fn raise(weights: &mut BTreeMap<String, f64>, slug: String, weight: f64) {
    let entry = weights.entry(slug).or_insert(weight);
    if weight > *entry {
        *entry = weight;
    }
}
