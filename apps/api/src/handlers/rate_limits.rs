use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use warden_application::ClientContext;
use warden_core::AppError;
use warden_domain::ClientIdentifier;

use crate::dto::{
    ClientContextRequest, RateLimitCheckResponse, RateLimitResetResponse, RateLimitStatusResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn check_rate_limit_handler(
    State(state): State<AppState>,
    Path(limit_type): Path<String>,
    Extension(caller): Extension<ClientContext>,
    body: Bytes,
) -> ApiResult<Json<RateLimitCheckResponse>> {
    let context = target_context(parse_client_request(&body)?, caller);
    let service = &state.rate_limit_service;

    let allowed = service.check_limit(&limit_type, &context).await;
    let client_identifier = service.identify(&context)?;
    let status = service.get_status(&limit_type, &context).await?;

    Ok(Json(RateLimitCheckResponse {
        allowed,
        client_identifier: client_identifier.to_string(),
        status: RateLimitStatusResponse::from(status),
    }))
}

pub async fn rate_limit_status_handler(
    State(state): State<AppState>,
    Path(limit_type): Path<String>,
    Extension(caller): Extension<ClientContext>,
    Query(query): Query<ClientContextRequest>,
) -> ApiResult<Json<RateLimitStatusResponse>> {
    let context = target_context(query, caller);
    let status = state
        .rate_limit_service
        .get_status(&limit_type, &context)
        .await?;

    Ok(Json(RateLimitStatusResponse::from(status)))
}

pub async fn reset_rate_limit_handler(
    State(state): State<AppState>,
    Path((limit_type, identifier)): Path<(String, String)>,
) -> ApiResult<Json<RateLimitResetResponse>> {
    let identifier = ClientIdentifier::new(identifier)?;
    let reset = state
        .rate_limit_service
        .reset_limit(&limit_type, &identifier)
        .await?;

    Ok(Json(RateLimitResetResponse {
        limit_type,
        client_identifier: identifier.to_string(),
        reset,
    }))
}

/// An absent or blank body describes no client.
fn parse_client_request(body: &[u8]) -> Result<ClientContextRequest, AppError> {
    if body.trim_ascii().is_empty() {
        return Ok(ClientContextRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|error| AppError::Validation(format!("invalid client description: {error}")))
}

/// Uses the described client, or the caller itself when nothing is described.
fn target_context(request: ClientContextRequest, caller: ClientContext) -> ClientContext {
    if request.source_ip.is_none() && request.user_agent.is_none() && request.subject.is_none() {
        return caller;
    }

    let context = ClientContext::new(request.source_ip, request.user_agent);
    match request.subject {
        Some(subject) => context.with_subject(subject),
        None => context,
    }
}
