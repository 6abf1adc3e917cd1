//! Queue endpoints.
//!
//! - `GET /api/queue`: every record in dashboard order
//! - `POST /api/complete/:id`: mark one record completed

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{CompleteResponse, PatientRecord};
use crate::store::order_queue;

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<PatientRecord>>, ApiError> {
    let records = ctx.queue.list().await?;
    Ok(Json(order_queue(records)))
}

/// Unknown ids answer `{"success": false}` rather than 404.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let success = ctx.queue.resolve(&id).await?;
    Ok(Json(CompleteResponse { success }))
}
