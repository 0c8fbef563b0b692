//! Reviewer console: pending applications, approve/reject and demo reset.

use crate::digibank::{
    config::FlowConfig,
    error::{ApiError, ErrorBody},
    storage::{self, UserRecord},
};
use crate::onboarding::{otp::codes_match, AccountStatus};
use axum::{
    extract::{Extension, Path},
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ReviewDecision {
    pub id: i64,
    pub status: AccountStatus,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetResponse {
    pub deleted: u64,
}

/// Without a configured token the console is open.
fn authorize(headers: &HeaderMap, config: &FlowConfig) -> Result<(), ApiError> {
    let Some(expected) = config.admin_token() else {
        return Ok(());
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if codes_match(expected.expose_secret(), token) => Ok(()),
        Some(_) => {
            warn!("Rejected admin request with a wrong token");
            Err(ApiError::Unauthorized)
        }
        None => Err(ApiError::Unauthorized),
    }
}

#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Applications waiting for review", body = [UserRecord]),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn admin(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<FlowConfig>>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    authorize(&headers, &config)?;

    let users = storage::list_users_by_status(&pool, AccountStatus::Pending).await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/approve/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Application approved", body = ReviewDecision),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn approve(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<FlowConfig>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    decide(&headers, &pool, &config, id, AccountStatus::Approved).await
}

#[utoipa::path(
    post,
    path = "/reject/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Application rejected", body = ReviewDecision),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn reject(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<FlowConfig>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    decide(&headers, &pool, &config, id, AccountStatus::Rejected).await
}

#[instrument(skip(headers, pool, config))]
async fn decide(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &FlowConfig,
    id: i64,
    status: AccountStatus,
) -> Result<Json<ReviewDecision>, ApiError> {
    authorize(headers, config)?;

    if !storage::set_status_by_id(pool, id, status).await? {
        return Err(ApiError::UserNotFound(id));
    }

    info!("User {} is now {}", id, status);

    Ok(Json(ReviewDecision { id, status }))
}

#[utoipa::path(
    post,
    path = "/reset-demo",
    responses(
        (status = 200, description = "All users deleted", body = ResetResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn reset_demo(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    config: Extension<Arc<FlowConfig>>,
) -> Result<Json<ResetResponse>, ApiError> {
    authorize(&headers, &config)?;

    let deleted = storage::delete_all_users(&pool).await?;
    warn!("Demo reset, deleted {} users", deleted);

    Ok(Json(ResetResponse { deleted }))
}
