//! quality.rs — rule-based FIR completeness scoring.
//!
//! A heuristic gate over the normalized text: does the complaint mention a
//! time, a place, and an action, and is it long enough to work with? This is
//! NOT a legal-validity check; the API surface carries that disclaimer.

use serde::Serialize;

const TIME_TERMS: [&str; 5] = ["am", "pm", "morning", "evening", "night"];
const PLACE_TERMS: [&str; 5] = ["road", "house", "market", "bus", "station"];
const ACTION_TERMS: [&str; 5] = ["stolen", "assault", "hit", "attack", "rob"];

const BREVITY_PENALTY: i32 = 25;
const INDICATOR_PENALTY: i32 = 15;
const MIN_WORDS: usize = 8;

/// Completeness verdict for one FIR. Score is clamped to 0..=100; warnings
/// follow rule-evaluation order (length, time, place, action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub score: u8,
    pub warnings: Vec<String>,
}

fn any_substring(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Evaluate all completeness rules against the normalized text.
///
/// Rules are independent (no short-circuiting); each triggered rule appends
/// exactly one warning and subtracts its fixed penalty. Indicator checks are
/// substring containment over the whole text, matching the trained pipeline.
pub fn assess(normalized: &str) -> QualityReport {
    let mut score: i32 = 100;
    let mut warnings = Vec::new();

    let word_count = normalized.split_whitespace().count();

    if word_count < MIN_WORDS {
        warnings.push("FIR description too short.".to_string());
        score -= BREVITY_PENALTY;
    }

    if !any_substring(normalized, &TIME_TERMS) {
        warnings.push("Time of incident missing.".to_string());
        score -= INDICATOR_PENALTY;
    }

    if !any_substring(normalized, &PLACE_TERMS) {
        warnings.push("Location details missing.".to_string());
        score -= INDICATOR_PENALTY;
    }

    if !any_substring(normalized, &ACTION_TERMS) {
        warnings.push("Action details unclear.".to_string());
        score -= INDICATOR_PENALTY;
    }

    QualityReport {
        score: score.max(0) as u8,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::normalize;

    #[test]
    fn complete_fir_scores_100_with_no_warnings() {
        let text = normalize("someone stole my bag near the bus station at 8 pm");
        let report = assess(&text);
        assert_eq!(report.score, 100);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn bare_plea_triggers_all_four_rules() {
        let report = assess(&normalize("help"));
        // 100 - 25 - 15 - 15 - 15; all four rules fire.
        assert_eq!(report.score, 30);
        assert_eq!(report.warnings.len(), 4);
        assert_eq!(report.warnings[0], "FIR description too short.");
        assert_eq!(report.warnings[1], "Time of incident missing.");
        assert_eq!(report.warnings[2], "Location details missing.");
        assert_eq!(report.warnings[3], "Action details unclear.");
    }

    #[test]
    fn warnings_follow_rule_order_not_severity() {
        // Long enough, has a place, but no time and no action.
        let report = assess("the man went towards the market with my neighbour yesterday afternoon");
        assert_eq!(report.score, 70);
        assert_eq!(
            report.warnings,
            vec![
                "Time of incident missing.".to_string(),
                "Action details unclear.".to_string()
            ]
        );
    }

    #[test]
    fn score_never_leaves_bounds() {
        for text in ["", "help", "a b c", "stolen at night on the road by the market man"] {
            let r = assess(text);
            assert!(r.score <= 100);
        }
    }

    #[test]
    fn indicator_match_is_substring_based() {
        // "am" matches inside "ambush"; this is the trained behavior.
        let report = assess("they ambush people near the station and rob them daily");
        assert!(report.warnings.is_empty(), "got {:?}", report.warnings);
        assert_eq!(report.score, 100);
    }
}
