use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use warden_application::DashboardPeriod;

use crate::dto::{ScoreTrendPointResponse, SecurityDashboardResponse};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_SCORE_TREND_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreTrendQuery {
    pub days: Option<u32>,
}

pub async fn security_dashboard_handler(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<SecurityDashboardResponse>> {
    let period = match query.period.as_deref() {
        Some(value) => DashboardPeriod::parse(value)?,
        None => DashboardPeriod::default(),
    };
    let dashboard = state.security_metrics_service.dashboard_for(period).await?;

    Ok(Json(SecurityDashboardResponse::from(dashboard)))
}

pub async fn score_trend_handler(
    State(state): State<AppState>,
    Query(query): Query<ScoreTrendQuery>,
) -> ApiResult<Json<Vec<ScoreTrendPointResponse>>> {
    let points = state
        .security_metrics_service
        .score_trend(query.days.unwrap_or(DEFAULT_SCORE_TREND_DAYS))
        .await?
        .into_iter()
        .map(ScoreTrendPointResponse::from)
        .collect();

    Ok(Json(points))
}
