//! `POST /api/submit`: classify and enqueue one kiosk intake.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{SubmitRequest, SubmitResponse};
use crate::triage::{collect_intake, IntakeForm};

pub async fn submit(
    State(ctx): State<ApiContext>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let intake = collect_intake(&IntakeForm::from(request))?;
    let outcome = ctx.queue.append(&intake).await?;

    Ok(Json(SubmitResponse {
        status: "success".to_string(),
        esi: outcome.esi,
        analysis: outcome.analysis,
    }))
}
