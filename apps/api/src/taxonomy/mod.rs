//! Skill taxonomy: resolves free-text skill mentions to canonical slugs.
//!
//! All aliases are compiled into one Aho-Corasick automaton over normalised
//! text. Every hit must sit on word boundaries, and overlapping hits are
//! resolved longest-first, so `"javascript"` never also yields `"java"` and
//! `"postgresql"` never also yields `"sql"`.

pub mod store;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};
use strsim::damerau_levenshtein;
use thiserror::Error;
use tracing::warn;

use crate::ats::text::{is_word_char, normalize, word_spans};

/// Confidence attached to an exact (normalised) alias hit.
pub const EXACT_CONFIDENCE: f64 = 1.0;
/// Confidence attached to an edit-distance-1 hit when fuzzy matching is on.
pub const FUZZY_CONFIDENCE: f64 = 0.8;
/// Minimum char length of both token and alias for fuzzy matching.
const FUZZY_MIN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Skill,
    Tool,
    Platform,
    Cert,
    Soft,
}

impl SkillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKind::Skill => "skill",
            SkillKind::Tool => "tool",
            SkillKind::Platform => "platform",
            SkillKind::Cert => "cert",
            SkillKind::Soft => "soft",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillKind {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skill" => Ok(SkillKind::Skill),
            "tool" => Ok(SkillKind::Tool),
            "platform" => Ok(SkillKind::Platform),
            "cert" | "certification" => Ok(SkillKind::Cert),
            "soft" => Ok(SkillKind::Soft),
            other => Err(TaxonomyError::UnknownKind(other.to_string())),
        }
    }
}

/// A persisted taxonomy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSkill {
    pub slug: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub kind: SkillKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl CanonicalSkill {
    pub fn new(slug: &str, aliases: &[&str], kind: SkillKind) -> Self {
        Self {
            slug: slug.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            kind,
            weight: 1.0,
        }
    }
}

/// One canonical skill found in a text blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMention {
    pub slug: String,
    pub kind: SkillKind,
    pub confidence: f64,
}

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("canonical skill with empty slug")]
    EmptySlug,

    #[error("duplicate canonical skill slug '{0}'")]
    DuplicateSlug(String),

    #[error("unknown skill kind '{0}'")]
    UnknownKind(String),

    #[error("failed to build alias matcher: {0}")]
    Matcher(String),
}

/// Compiled, read-only alias table. Cheap to share behind an `Arc`.
pub struct Taxonomy {
    skills: Vec<CanonicalSkill>,
    by_slug: HashMap<String, usize>,
    matcher: Option<AhoCorasick>,
    /// Pattern id → index into `skills`.
    pattern_owner: Vec<usize>,
    /// Single-word aliases eligible for fuzzy matching, sorted for determinism.
    fuzzy_aliases: Vec<(String, usize)>,
    fuzzy: bool,
}

impl fmt::Debug for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Taxonomy")
            .field("skills", &self.skills.len())
            .field("patterns", &self.pattern_owner.len())
            .field("fuzzy", &self.fuzzy)
            .finish()
    }
}

impl Taxonomy {
    /// Validates and compiles a skill list.
    ///
    /// Skills are ordered by slug before compiling; when two skills claim the
    /// same normalised alias, the smaller slug keeps it.
    pub fn new(skills: Vec<CanonicalSkill>) -> Result<Self, TaxonomyError> {
        let mut skills = skills;
        for skill in skills.iter_mut() {
            skill.slug = skill.slug.trim().to_string();
        }
        skills.sort_by(|a, b| a.slug.cmp(&b.slug));

        let mut by_slug = HashMap::with_capacity(skills.len());
        for (idx, skill) in skills.iter_mut().enumerate() {
            if skill.slug.is_empty() {
                return Err(TaxonomyError::EmptySlug);
            }
            if by_slug.insert(skill.slug.clone(), idx).is_some() {
                return Err(TaxonomyError::DuplicateSlug(skill.slug.clone()));
            }
            if !skill.weight.is_finite() || skill.weight <= 0.0 {
                warn!(slug = %skill.slug, weight = skill.weight, "Invalid skill weight, using 1.0");
                skill.weight = 1.0;
            }
        }

        let mut owner_of_alias: BTreeMap<String, usize> = BTreeMap::new();
        for (idx, skill) in skills.iter().enumerate() {
            let candidates = std::iter::once(skill.slug.as_str())
                .chain(skill.aliases.iter().map(String::as_str));
            for alias in candidates {
                let alias = normalize(alias);
                if alias.is_empty() {
                    continue;
                }
                match owner_of_alias.get(&alias) {
                    Some(&owner) if owner != idx => warn!(
                        alias = %alias,
                        kept = %skills[owner].slug,
                        dropped = %skill.slug,
                        "Alias claimed by two skills"
                    ),
                    Some(_) => {}
                    None => {
                        owner_of_alias.insert(alias, idx);
                    }
                }
            }
        }

        let patterns: Vec<&String> = owner_of_alias.keys().collect();
        let pattern_owner: Vec<usize> = owner_of_alias.values().copied().collect();
        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::new(patterns)
                    .map_err(|e| TaxonomyError::Matcher(e.to_string()))?,
            )
        };

        let fuzzy_aliases = owner_of_alias
            .iter()
            .filter(|(alias, _)| {
                alias.chars().count() >= FUZZY_MIN_LEN && alias.chars().all(is_word_char)
            })
            .map(|(alias, &idx)| (alias.clone(), idx))
            .collect();

        Ok(Self {
            skills,
            by_slug,
            matcher,
            pattern_owner,
            fuzzy_aliases,
            fuzzy: false,
        })
    }

    pub fn with_fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy = enabled;
        self
    }

    /// Returns a new taxonomy holding these skills plus `extra`.
    pub fn extended(&self, extra: Vec<CanonicalSkill>) -> Result<Self, TaxonomyError> {
        let mut skills = self.skills.clone();
        skills.extend(extra);
        Ok(Self::new(skills)?.with_fuzzy(self.fuzzy))
    }

    pub fn get(&self, slug: &str) -> Option<&CanonicalSkill> {
        self.by_slug.get(slug).map(|&idx| &self.skills[idx])
    }

    pub fn skills(&self) -> &[CanonicalSkill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Canonical skills mentioned in `text`, ordered by slug.
    ///
    /// Unknown words are ignored; empty text yields an empty list.
    pub fn lookup(&self, text: &str) -> Vec<SkillMention> {
        let normalized = normalize(text);
        let mut found: BTreeMap<usize, f64> = BTreeMap::new();
        let claimed = self.exact_matches(&normalized, &mut found);
        if self.fuzzy {
            self.fuzzy_matches(&normalized, &claimed, &mut found);
        }

        found
            .into_iter()
            .map(|(idx, confidence)| SkillMention {
                slug: self.skills[idx].slug.clone(),
                kind: self.skills[idx].kind,
                confidence,
            })
            .collect()
    }

    /// Records word-bounded exact hits and returns the byte mask of claimed spans.
    fn exact_matches(&self, normalized: &str, found: &mut BTreeMap<usize, f64>) -> Vec<bool> {
        let mut claimed = vec![false; normalized.len()];
        let Some(matcher) = &self.matcher else {
            return claimed;
        };

        let mut hits: Vec<(usize, usize, usize)> = matcher
            .find_overlapping_iter(normalized)
            .filter(|m| on_word_boundary(normalized, m.start(), m.end()))
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();

        // Longest first; among equals, leftmost, then lowest pattern id.
        hits.sort_by(|a, b| {
            (b.1 - b.0)
                .cmp(&(a.1 - a.0))
                .then(a.0.cmp(&b.0))
                .then(a.2.cmp(&b.2))
        });

        for (start, end, pattern) in hits {
            if claimed[start..end].iter().any(|&c| c) {
                continue;
            }
            claimed[start..end].iter_mut().for_each(|c| *c = true);
            found.insert(self.pattern_owner[pattern], EXACT_CONFIDENCE);
        }
        claimed
    }

    fn fuzzy_matches(&self, normalized: &str, claimed: &[bool], found: &mut BTreeMap<usize, f64>) {
        for (start, end) in word_spans(normalized) {
            if claimed[start..end].iter().any(|&c| c) {
                continue;
            }
            let token = &normalized[start..end];
            if token.chars().count() < FUZZY_MIN_LEN {
                continue;
            }
            let best = self
                .fuzzy_aliases
                .iter()
                .filter(|(alias, _)| damerau_levenshtein(token, alias) == 1)
                .map(|&(_, idx)| idx)
                .min_by(|a, b| self.skills[*a].slug.cmp(&self.skills[*b].slug));
            if let Some(idx) = best {
                found.entry(idx).or_insert(FUZZY_CONFIDENCE);
            }
        }
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !is_word_char(c));
    let after_ok = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
    before_ok && after_ok
}
