//! Structural heuristics: which resume sections exist and whether contact
//! details are present.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ats::text::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Experience,
    Education,
    Skills,
    Projects,
    Summary,
}

/// Section weights for the format score. Sum to 1.0.
const SECTION_WEIGHTS: &[(Section, f64, &str)] = &[
    (
        Section::Experience,
        0.35,
        r"\b(?:experience|employment|work history|internships?)\b",
    ),
    (
        Section::Education,
        0.25,
        r"\b(?:education|university|college|bachelor'?s?|master'?s?|degree|b\.?sc|m\.?sc)\b",
    ),
    (
        Section::Skills,
        0.20,
        r"\b(?:skills|technologies|tech stack|competencies|proficiencies)\b",
    ),
    (Section::Projects, 0.10, r"\b(?:projects?|portfolio)\b"),
    (
        Section::Summary,
        0.10,
        r"\b(?:summary|objective|profile|about me)\b",
    ),
];

static SECTION_PATTERNS: LazyLock<Vec<(Section, f64, Regex)>> = LazyLock::new(|| {
    SECTION_WEIGHTS
        .iter()
        .map(|(section, weight, pattern)| {
            (
                *section,
                *weight,
                Regex::new(pattern).expect("section pattern is valid"),
            )
        })
        .collect()
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email pattern is valid")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d ().-]{7,}\d").expect("phone pattern is valid"));

static PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:linkedin\.com|github\.com|gitlab\.com|https?://|www\.)")
        .expect("link pattern is valid")
});

static YEARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b").expect("years pattern is valid")
});

/// Cap on the years-of-experience marker; larger numbers are noise.
const MAX_YEARS: f64 = 50.0;

/// Everything the structural heuristics found in one resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSignals {
    pub sections: Vec<Section>,
    pub has_email: bool,
    pub has_phone: bool,
    pub has_profile_link: bool,
    /// Weighted fraction of expected sections present, in [0, 1].
    pub format_score: f64,
    /// Fraction of {email, phone, link, experience, education} present, in [0, 1].
    pub presence_score: f64,
    pub years_experience: Option<f64>,
}

pub fn assess_structure(text: &str) -> StructureSignals {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return StructureSignals::default();
    }

    let mut sections = Vec::new();
    let mut format_score = 0.0;
    for (section, weight, pattern) in SECTION_PATTERNS.iter() {
        if pattern.is_match(&normalized) {
            sections.push(*section);
            format_score += weight;
        }
    }

    let has_email = EMAIL.is_match(&normalized);
    // Per raw line: collapsing whitespace would glue stacked date ranges together.
    let has_phone = text.lines().any(|line| {
        PHONE.find_iter(line).any(|m| {
            let digits = m.as_str().chars().filter(|c| c.is_ascii_digit()).count();
            (10..=15).contains(&digits)
        })
    });
    let has_profile_link = PROFILE_LINK.is_match(&normalized);

    let present = [
        has_email,
        has_phone,
        has_profile_link,
        sections.contains(&Section::Experience),
        sections.contains(&Section::Education),
    ];
    let presence_score = present.iter().filter(|&&p| p).count() as f64 / present.len() as f64;

    let years_experience = YEARS
        .captures_iter(&normalized)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .map(|y| y.min(MAX_YEARS))
        .reduce(f64::max);

    StructureSignals {
        sections,
        has_email,
        has_phone,
        has_profile_link,
        format_score: format_score.clamp(0.0, 1.0),
        presence_score,
        years_experience,
    }
}
