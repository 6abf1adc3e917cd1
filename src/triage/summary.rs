use serde::Serialize;

use super::intake::Intake;
use crate::models::EsiLevel;

/// Shown on the result card when the backend sent no analysis.
pub const FALLBACK_ANALYSIS: &str = "Patient has been triaged. Please follow local triage protocol and reassess if symptoms change.";

/// Shown in the detail panel when a record carries no analysis.
pub const NO_ANALYSIS: &str = "No additional analysis.";

const RECOMMENDATION: &str =
    "Recommended: obtain full vitals, focused assessment, and escalate if deterioration occurs.";

/// Nurse-facing summary generated alongside the mock classification.
pub fn triage_summary(intake: &Intake) -> String {
    let vitals = intake
        .vitals
        .display_text()
        .unwrap_or_else(|| "No vitals provided".to_string());

    format!(
        "Patient: {} ({}y, {}). Symptoms: {} Vitals: {}. {}",
        intake.name, intake.age, intake.sex, intake.complaint, vitals, RECOMMENDATION
    )
}

/// Badge shown next to a triage result or queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EsiBadge {
    pub level: EsiLevel,
    /// `ESI LEVEL 2`
    pub label: String,
    /// Style class; levels 4 and 5 share `esi4`.
    pub class: &'static str,
}

impl EsiBadge {
    pub fn for_level(level: EsiLevel) -> Self {
        let class = match level.get() {
            1 => "esi1",
            2 => "esi2",
            3 => "esi3",
            _ => "esi4",
        };
        Self {
            level,
            label: format!("ESI LEVEL {level}"),
            class,
        }
    }

    /// Compact form used in queue rows: `ESI 2`.
    pub fn short_label(&self) -> String {
        format!("ESI {}", self.level)
    }
}
