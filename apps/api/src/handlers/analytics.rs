use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use warden_domain::{AnomalyReport, HourlyLoginBucket, WeeklyLoginTrend};

use crate::dto::HeatmapResponse;
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HEATMAP_DAYS: u32 = 30;
const DEFAULT_ANOMALY_DAYS: u32 = 7;
const DEFAULT_TREND_WEEKS: u32 = 4;

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WeeksQuery {
    pub weeks: Option<u32>,
}

pub async fn login_heatmap_handler(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> ApiResult<Json<HeatmapResponse>> {
    let report = state
        .login_analytics_service
        .heatmap_report(query.days.unwrap_or(DEFAULT_HEATMAP_DAYS))
        .await?;

    Ok(Json(HeatmapResponse::from(report)))
}

pub async fn hourly_distribution_handler(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> ApiResult<Json<Vec<HourlyLoginBucket>>> {
    let buckets = state
        .login_analytics_service
        .hourly_distribution(query.days.unwrap_or(DEFAULT_HEATMAP_DAYS))
        .await?;

    Ok(Json(buckets))
}

pub async fn weekly_trends_handler(
    State(state): State<AppState>,
    Query(query): Query<WeeksQuery>,
) -> ApiResult<Json<Vec<WeeklyLoginTrend>>> {
    let trends = state
        .login_analytics_service
        .weekly_trends(query.weeks.unwrap_or(DEFAULT_TREND_WEEKS))
        .await?;

    Ok(Json(trends))
}

pub async fn login_anomalies_handler(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> ApiResult<Json<AnomalyReport>> {
    let report = state
        .login_analytics_service
        .detect_anomalies(query.days.unwrap_or(DEFAULT_ANOMALY_DAYS))
        .await?;

    Ok(Json(report))
}
