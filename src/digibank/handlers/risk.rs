use super::{payload, FlowResponse};
use crate::digibank::{
    error::{ApiError, ErrorBody},
    session::FlowSession,
    storage,
};
use crate::onboarding::{
    risk::RiskFactors, AccountStatus, DigiLockerRecord, FlowError, OnboardingSession, RiskLevel,
    Step,
};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RiskResponse {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: RiskFactors,
    pub next: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct IdentityRequest {
    pub pan: String,
    /// Same format as the DigiLocker record, `YYYY-MM-DD`.
    pub dob: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: Option<AccountStatus>,
    pub next: String,
}

async fn linked_record(
    state: &OnboardingSession,
    pool: &PgPool,
) -> Result<Option<DigiLockerRecord>, ApiError> {
    Ok(match state.digilocker_id() {
        Some(dl_id) => storage::find_digilocker_record(pool, dl_id).await?,
        None => None,
    })
}

#[utoipa::path(
    get,
    path = "/risk-check",
    responses(
        (status = 200, description = "Risk score and the step it leads to", body = RiskResponse),
        (status = 409, description = "KYC not fetched yet", body = ErrorBody)
    ),
    tag = "risk"
)]
#[instrument(skip_all)]
pub async fn risk_check(mut session: FlowSession, pool: Extension<PgPool>) -> impl IntoResponse {
    let result = check(&mut session.state, &pool).await;
    (session.commit().await, result)
}

async fn check(
    state: &mut OnboardingSession,
    pool: &PgPool,
) -> Result<Json<RiskResponse>, ApiError> {
    // a memoized score needs no directory lookup
    let record = if state.risk().is_some() {
        None
    } else {
        linked_record(state, pool).await?
    };

    let outcome = state.assess_risk(record.as_ref(), &mut rand::thread_rng())?;

    if outcome.fresh {
        let phone = state.phone().ok_or(FlowError::MissingPhone)?;

        // keep the score only after its status is stored; a failed write is
        // scored again on the next request
        if let Some(status) = outcome.assessment.level.status_after_assessment() {
            let updated = storage::set_status_by_phone(pool, phone, status).await?;
            debug!("Account status set to {} (row updated: {})", status, updated);
        }

        state.record_risk(outcome.assessment.clone());

        info!(
            score = outcome.assessment.score,
            level = %outcome.assessment.level,
            "Risk assessed"
        );
    }

    Ok(Json(RiskResponse {
        score: outcome.assessment.score,
        level: outcome.assessment.level,
        factors: outcome.assessment.factors,
        next: outcome.next().path().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/extra-verification",
    request_body = IdentityRequest,
    responses(
        (status = 200, description = "Identity confirmed, account approved", body = FlowResponse),
        (status = 409, description = "Not a medium-risk application", body = ErrorBody),
        (status = 422, description = "PAN or date of birth do not match", body = ErrorBody)
    ),
    tag = "risk"
)]
#[instrument(skip_all)]
pub async fn extra_verification(
    session: FlowSession,
    pool: Extension<PgPool>,
    request: Option<Json<IdentityRequest>>,
) -> impl IntoResponse {
    let result = verify_identity(&session.state, &pool, request).await;
    (session.commit().await, result)
}

async fn verify_identity(
    state: &OnboardingSession,
    pool: &PgPool,
    request: Option<Json<IdentityRequest>>,
) -> Result<Json<FlowResponse>, ApiError> {
    let request = payload(request)?;
    let record = linked_record(state, pool).await?;

    let next = state.extra_verification(&request.pan, &request.dob, record.as_ref())?;

    let phone = state.phone().ok_or(FlowError::MissingPhone)?;
    storage::set_status_by_phone(pool, phone, AccountStatus::Approved).await?;

    info!("Extra verification passed");

    Ok(Json(
        FlowResponse::to(next).with_message("Verification successful"),
    ))
}

#[utoipa::path(
    get,
    path = "/under-review",
    responses(
        (status = 200, description = "Application waits for a reviewer", body = FlowResponse)
    ),
    tag = "risk"
)]
pub async fn under_review() -> impl IntoResponse {
    Json(
        FlowResponse::to(Step::ViewStatus)
            .with_message("Your application is under review. We will notify you once it is processed."),
    )
}

#[utoipa::path(
    get,
    path = "/view-status",
    responses(
        (status = 200, description = "Current review status", body = StatusResponse),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "risk"
)]
pub async fn view_status(session: FlowSession, pool: Extension<PgPool>) -> impl IntoResponse {
    let result = status(&session.state, &pool).await;
    (session.commit().await, result)
}

async fn status(
    state: &OnboardingSession,
    pool: &PgPool,
) -> Result<Json<StatusResponse>, ApiError> {
    state.require_logged_in(Step::Login)?;

    let status = match state.phone() {
        Some(phone) => storage::find_user_by_phone(pool, phone)
            .await?
            .map(|user| user.status),
        None => None,
    };

    let next = state.view_status(status)?;
    Ok(Json(StatusResponse {
        status,
        next: next.path().to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/rejected",
    responses(
        (status = 200, description = "Application was declined", body = FlowResponse)
    ),
    tag = "risk"
)]
pub async fn rejected() -> impl IntoResponse {
    Json(
        FlowResponse::to(Step::Home)
            .with_message("Your application was rejected. Contact support for details."),
    )
}
