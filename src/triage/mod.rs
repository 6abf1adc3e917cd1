//! Intake validation, mock severity classification and summary text.

pub mod classifier;
pub mod intake;
pub mod summary;

pub use classifier::mock_esi;
pub use intake::{collect_intake, Intake, IntakeError, IntakeForm, MISSING_FIELDS_MESSAGE};
pub use summary::{triage_summary, EsiBadge, FALLBACK_ANALYSIS, NO_ANALYSIS};
