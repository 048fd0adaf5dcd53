use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use redis::AsyncCommands;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = check_postgres(state.postgres_pool.clone()).await;
    let redis = check_redis(state.redis_client.clone()).await;

    let ready = is_usable(postgres.status) && is_usable(redis.status);
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            postgres,
            redis,
        }),
    )
}

fn is_usable(status: &str) -> bool {
    status == "ok" || status == "disabled"
}

async fn check_postgres(pool: Option<sqlx::PgPool>) -> HealthDependencyStatus {
    let Some(pool) = pool else {
        return HealthDependencyStatus {
            status: "disabled",
            detail: None,
        };
    };

    let check = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await;

    match check {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}

async fn check_redis(redis_client: Option<redis::Client>) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return HealthDependencyStatus {
            status: "disabled",
            detail: None,
        };
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => {
            return HealthDependencyStatus {
                status: "error",
                detail: Some(format!("redis connection failed: {error}")),
            };
        }
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Ok(value) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("unexpected redis ping response: {value}")),
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("redis ping failed: {error}")),
        },
    }
}
