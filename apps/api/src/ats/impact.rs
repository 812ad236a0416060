//! Impact-language heuristic: how much of a resume is written as quantified outcomes.
//!
//! A statement counts as an achievement when an action verb has a quantified
//! token nearby ("increased revenue by 30%", "cut build time from 45 to 8
//! minutes"). Statements that lean on vague verbs or scale words without any
//! number are counted separately for the breakdown.

use serde::{Deserialize, Serialize};

use crate::ats::text::statements;

/// Number of quantified achievements that saturates the score.
const IMPACT_SATURATION: f64 = 4.0;
/// How far before / after an action verb a quantity may sit.
const WINDOW_BEFORE: usize = 3;
const WINDOW_AFTER: usize = 8;

const ACTION_VERBS: &[&str] = &[
    "accelerated", "achieved", "boosted", "built", "closed", "created", "cut", "decreased",
    "delivered", "designed", "doubled", "drove", "eliminated", "expanded", "generated", "grew",
    "improved", "increased", "launched", "led", "lowered", "managed", "migrated", "optimized",
    "optimised", "raised", "reduced", "saved", "scaled", "shipped", "shortened", "tripled",
    "won",
];

const VAGUE_VERBS: &[&str] = &[
    "assisted", "contributed", "enhanced", "helped", "involved", "participated", "supported",
    "worked",
];

const VAGUE_SCALE_WORDS: &[&str] = &[
    "considerable", "great", "huge", "large", "major", "many", "massive", "numerous", "several",
    "significant", "substantial", "various",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSignals {
    pub quantified_statements: usize,
    pub vague_statements: usize,
    /// min(1, quantified_statements / saturation)
    pub score: f64,
}

/// Scans raw resume text for quantified achievement statements.
pub fn assess_impact(text: &str) -> ImpactSignals {
    let mut quantified = 0usize;
    let mut vague = 0usize;

    for statement in statements(text) {
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        if is_quantified_achievement(&tokens) {
            quantified += 1;
        } else if is_vague(&tokens) {
            vague += 1;
        }
    }

    ImpactSignals {
        quantified_statements: quantified,
        vague_statements: vague,
        score: (quantified as f64 / IMPACT_SATURATION).min(1.0),
    }
}

fn bare_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_quantity(token: &str) -> bool {
    token
        .chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '%' | '$' | '€' | '£'))
}

fn is_quantified_achievement(tokens: &[&str]) -> bool {
    tokens.iter().enumerate().any(|(i, token)| {
        if !ACTION_VERBS.contains(&bare_word(token)) {
            return false;
        }
        let from = i.saturating_sub(WINDOW_BEFORE);
        let to = (i + WINDOW_AFTER + 1).min(tokens.len());
        tokens[from..to].iter().any(|t| is_quantity(t))
    })
}

fn is_vague(tokens: &[&str]) -> bool {
    if tokens.iter().any(|t| is_quantity(t)) {
        return false;
    }
    tokens.iter().map(|t| bare_word(t)).any(|w| {
        VAGUE_VERBS.contains(&w) || VAGUE_SCALE_WORDS.contains(&w)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_after_verb_counts() {
        let s = assess_impact("Reduced latency by 40% through caching");
        assert_eq!(s.quantified_statements, 1);
        assert!((s.score - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_currency_counts() {
        assert_eq!(
            assess_impact("Saved $50,000 annually by optimizing queries").quantified_statements,
            1
        );
        assert_eq!(
            assess_impact("Generated €200k in new revenue").quantified_statements,
            1
        );
    }

    #[test]
    fn test_quantity_before_verb_counts() {
        assert_eq!(
            assess_impact("3x throughput, optimized the parser").quantified_statements,
            1
        );
    }

    #[test]
    fn test_number_far_from_verb_does_not_count() {
        let s = assess_impact(
            "Improved the onboarding flow for the whole internal platform team across the company in 2021",
        );
        assert_eq!(s.quantified_statements, 0);
    }

    #[test]
    fn test_number_without_action_verb_does_not_count() {
        assert_eq!(assess_impact("Python 3, SQL, 5 years").quantified_statements, 0);
    }

    #[test]
    fn test_vague_statements_are_counted() {
        let s = assess_impact("Helped the team deliver projects\nAchieved significant improvements");
        assert_eq!(s.quantified_statements, 0);
        assert_eq!(s.vague_statements, 2);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn test_score_saturates_at_one() {
        let text = "Cut costs by 10%\nGrew revenue 2x\nLed 5 engineers\nShipped 3 apps\nSaved $1M";
        let s = assess_impact(text);
        assert_eq!(s.quantified_statements, 5);
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(assess_impact(""), ImpactSignals::default());
    }
}
