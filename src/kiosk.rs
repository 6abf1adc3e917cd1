//! Kiosk intake view: form state, submission lifecycle and result card.
//!
//! Each submission is stamped with a generation. `reset()` bumps the
//! generation, so a result arriving for an older form is dropped instead of
//! rendering over the next patient's screen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::store::{QueueRepository, TriageOutcome};
use crate::triage::{collect_intake, EsiBadge, IntakeError, IntakeForm, FALLBACK_ANALYSIS};

/// Shown in the error region when the submission fails in transit.
pub const SUBMIT_ERROR_MESSAGE: &str =
    "Unable to submit right now. Please try again or ask staff for help.";

/// Triage result as displayed after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub badge: EsiBadge,
    pub analysis: String,
}

impl ResultCard {
    pub fn from_outcome(outcome: &TriageOutcome) -> Self {
        Self {
            badge: EsiBadge::for_level(outcome.esi),
            analysis: outcome
                .analysis
                .clone()
                .unwrap_or_else(|| FALLBACK_ANALYSIS.to_string()),
        }
    }

    /// Clipboard text: badge label, blank line, analysis.
    pub fn copy_text(&self) -> String {
        format!("{}\n\n{}", self.badge.label, self.analysis)
    }
}

/// Everything the kiosk screen renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KioskView {
    pub form: IntakeForm,
    pub loading: bool,
    pub submit_enabled: bool,
    pub validation_message: Option<String>,
    pub error: Option<String>,
    pub result: Option<ResultCard>,
    pub success_visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Required fields missing; nothing was sent.
    Invalid(IntakeError),
    /// The repository call failed; the error region is showing.
    Failed(String),
    Triaged(ResultCard),
    /// The form was reset while the request was in flight.
    Superseded,
    /// A submission is already in flight; nothing was sent.
    Busy,
}

pub struct KioskController {
    repo: Arc<dyn QueueRepository>,
    view: Mutex<KioskView>,
    generation: AtomicU64,
}

impl KioskController {
    pub fn new(repo: Arc<dyn QueueRepository>) -> Self {
        Self {
            repo,
            view: Mutex::new(KioskView {
                submit_enabled: true,
                ..KioskView::default()
            }),
            generation: AtomicU64::new(0),
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, KioskView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current render state.
    pub fn view(&self) -> KioskView {
        self.lock_view().clone()
    }

    /// Apply an edit to the form fields.
    pub fn update_form(&self, edit: impl FnOnce(&mut IntakeForm)) {
        edit(&mut self.lock_view().form);
    }

    /// Validate the form and send it to the repository.
    pub async fn submit(&self) -> SubmitOutcome {
        let (intake, generation) = {
            let mut view = self.lock_view();
            if view.loading {
                tracing::debug!("Submit ignored while a submission is in flight");
                return SubmitOutcome::Busy;
            }
            view.validation_message = None;
            view.error = None;
            view.result = None;
            view.success_visible = false;

            let intake = match collect_intake(&view.form) {
                Ok(intake) => intake,
                Err(e) => {
                    view.validation_message = Some(e.to_string());
                    return SubmitOutcome::Invalid(e);
                }
            };

            view.loading = true;
            view.submit_enabled = false;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (intake, generation)
        };

        let result = self.repo.append(&intake).await;

        let mut view = self.lock_view();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Discarding result for a superseded submission");
            return SubmitOutcome::Superseded;
        }

        view.loading = false;
        view.submit_enabled = true;

        match result {
            Ok(outcome) => {
                let card = ResultCard::from_outcome(&outcome);
                view.result = Some(card.clone());
                view.success_visible = true;
                view.form.complaint.clear();
                SubmitOutcome::Triaged(card)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Intake submission failed");
                view.error = Some(SUBMIT_ERROR_MESSAGE.to_string());
                SubmitOutcome::Failed(e.to_string())
            }
        }
    }

    /// Clear the form and result for the next patient.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut view = self.lock_view();
        *view = KioskView {
            submit_enabled: true,
            ..KioskView::default()
        };
    }

    /// Clipboard text of the current result, if any.
    pub fn copy_summary(&self) -> Option<String> {
        self.lock_view().result.as_ref().map(ResultCard::copy_text)
    }
}
