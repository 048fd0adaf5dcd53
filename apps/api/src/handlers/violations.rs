use axum::Json;
use axum::extract::{Path, State};
use warden_domain::ClientIdentifier;

use crate::dto::{ClearViolationsResponse, ViolationResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_client_violations_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<Vec<ViolationResponse>>> {
    let identifier = ClientIdentifier::new(identifier)?;
    let violations = state
        .rate_limit_service
        .violations_for_client(&identifier)
        .await?
        .into_iter()
        .map(ViolationResponse::from)
        .collect();

    Ok(Json(violations))
}

pub async fn clear_violations_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ClearViolationsResponse>> {
    let cleared = state.rate_limit_service.clear_all_violations().await?;
    Ok(Json(ClearViolationsResponse { cleared }))
}
