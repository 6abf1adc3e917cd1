//! Keyword-based ESI classifier.
//!
//! Placeholder for a real backend model. Rules are checked from most to
//! least severe and the first rule with a matching keyword wins, so a
//! level-3 keyword can never hide a level-1 keyword in the same complaint.
//! Matching is a case-insensitive substring test, not tokenisation.

use crate::models::{EsiLevel, Vitals};

struct KeywordRule {
    level: u8,
    keywords: &'static [&'static str],
}

const RULES: &[KeywordRule] = &[
    KeywordRule {
        level: 1,
        keywords: &["unconscious", "not breathing", "cardiac arrest"],
    },
    KeywordRule {
        level: 2,
        keywords: &[
            "chest pain",
            "trouble breathing",
            "shortness of breath",
            "severe bleeding",
        ],
    },
    KeywordRule {
        level: 3,
        keywords: &["fever", "vomit", "fracture"],
    },
];

/// Level returned when no keyword matches.
pub const DEFAULT_LEVEL: EsiLevel = match EsiLevel::new(4) {
    Some(level) => level,
    None => EsiLevel::LEAST_URGENT,
};

/// Classify a complaint. Vitals are accepted for signature compatibility with
/// a real classifier but do not influence the keyword rules.
pub fn mock_esi(complaint: &str, _vitals: Option<&Vitals>) -> EsiLevel {
    let complaint = complaint.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| complaint.contains(k)))
        .and_then(|rule| EsiLevel::new(rule.level))
        .unwrap_or(DEFAULT_LEVEL)
}
