use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;
use warden_domain::LimitType;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Limit type applied to every route of the admin surface.
pub const ADMIN_LIMIT_TYPE: &str = "admin";

pub fn build_router(app_state: AppState) -> Router {
    let admin_limit = LimitType::new(ADMIN_LIMIT_TYPE).unwrap_or_else(|_| LimitType::global());

    let protected_routes = Router::new()
        .route(
            "/api/rate-limits/{limit_type}/check",
            post(handlers::rate_limits::check_rate_limit_handler),
        )
        .route(
            "/api/rate-limits/{limit_type}/status",
            get(handlers::rate_limits::rate_limit_status_handler),
        )
        .route(
            "/api/rate-limits/{limit_type}/clients/{identifier}",
            delete(handlers::rate_limits::reset_rate_limit_handler),
        )
        .route(
            "/api/violations",
            delete(handlers::violations::clear_violations_handler),
        )
        .route(
            "/api/violations/{identifier}",
            get(handlers::violations::list_client_violations_handler),
        )
        .route(
            "/api/security/dashboard",
            get(handlers::security::security_dashboard_handler),
        )
        .route(
            "/api/security/score-trend",
            get(handlers::security::score_trend_handler),
        )
        .route(
            "/api/analytics/heatmap",
            get(handlers::analytics::login_heatmap_handler),
        )
        .route(
            "/api/analytics/hourly",
            get(handlers::analytics::hourly_distribution_handler),
        )
        .route(
            "/api/analytics/weekly",
            get(handlers::analytics::weekly_trends_handler),
        )
        .route(
            "/api/analytics/anomalies",
            get(handlers::analytics::login_anomalies_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(from_fn_with_state(app_state.clone(), middleware::rate_limit))
        .layer(axum::Extension(admin_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
