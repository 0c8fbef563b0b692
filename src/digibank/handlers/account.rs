use super::payload;
use crate::digibank::{
    error::{ApiError, ErrorBody},
    session::FlowSession,
    storage,
};
use crate::onboarding::{
    catalog::{self, ServiceOffer},
    AccountStatus, OnboardingSession, Step,
};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DashboardResponse {
    pub phone: Option<String>,
    /// True only on the first visit after signing up.
    pub new_user: bool,
    pub status: Option<AccountStatus>,
    pub services: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ServicesRequest {
    pub services: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ActivationResponse {
    pub activated: Vec<String>,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Account overview", body = DashboardResponse),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "account"
)]
pub async fn dashboard(mut session: FlowSession, pool: Extension<PgPool>) -> impl IntoResponse {
    let result = overview(&mut session.state, &pool).await;
    (session.commit().await, result)
}

async fn overview(
    state: &mut OnboardingSession,
    pool: &PgPool,
) -> Result<Json<DashboardResponse>, ApiError> {
    let new_user = state.dashboard()?;

    let status = match state.phone() {
        Some(phone) => storage::find_user_by_phone(pool, phone)
            .await?
            .map(|user| user.status),
        None => None,
    };

    Ok(Json(DashboardResponse {
        phone: state.phone().map(ToString::to_string),
        new_user,
        status,
        services: state.services().to_vec(),
    }))
}

#[utoipa::path(
    get,
    path = "/activate-services",
    responses(
        (status = 200, description = "Services that can be activated", body = [ServiceOffer]),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "account"
)]
pub async fn service_catalog(session: FlowSession) -> impl IntoResponse {
    let result = session
        .state
        .require_logged_in(Step::Login)
        .map(|()| Json(catalog::offers()))
        .map_err(ApiError::from);
    (session.commit().await, result)
}

#[utoipa::path(
    post,
    path = "/activate-services",
    request_body = ServicesRequest,
    responses(
        (status = 200, description = "Services activated", body = ActivationResponse),
        (status = 400, description = "Unknown service", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "account"
)]
#[instrument(skip_all)]
pub async fn activate_services(
    mut session: FlowSession,
    request: Option<Json<ServicesRequest>>,
) -> impl IntoResponse {
    let result = payload(request).and_then(|request| {
        let activated = session.state.activate_services(&request.services)?;
        info!("Activated services: {}", activated.join(", "));
        Ok(Json(ActivationResponse {
            message: format!("{} service(s) activated", activated.len()),
            activated,
        }))
    });
    (session.commit().await, result)
}
