//! Simulated DigiLocker link, consent and KYC fetch.

use super::{otp::OtpRequest, payload, FlowResponse};
use crate::digibank::{
    config::FlowConfig,
    error::{ApiError, ErrorBody},
    session::FlowSession,
    storage,
};
use crate::onboarding::{KycView, OnboardingSession, Step};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{sync::Arc, time::Instant};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Documents shared once the customer consents.
pub const SHARED_DOCUMENTS: &[&str] = &["Aadhaar", "PAN", "Name", "Date of birth"];

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DigiLockerLoginRequest {
    /// Aadhaar number or the mobile registered with DigiLocker.
    pub dl_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConsentInfo {
    pub digilocker_id: Option<String>,
    pub documents: Vec<String>,
    pub next: String,
}

#[utoipa::path(
    get,
    path = "/digilocker",
    responses(
        (status = 200, description = "Ready to link DigiLocker", body = FlowResponse),
        (status = 401, description = "Phone not verified yet", body = ErrorBody)
    ),
    tag = "kyc"
)]
pub async fn digilocker(session: FlowSession) -> impl IntoResponse {
    let result = session
        .state
        .require_logged_in(Step::Register)
        .map(|()| Json(FlowResponse::to(Step::DigiLockerLogin)))
        .map_err(ApiError::from);
    (session.commit().await, result)
}

#[utoipa::path(
    post,
    path = "/digilocker-login",
    request_body = DigiLockerLoginRequest,
    responses(
        (status = 200, description = "DigiLocker OTP issued", body = FlowResponse),
        (status = 401, description = "Phone not verified yet", body = ErrorBody),
        (status = 404, description = "Unknown DigiLocker account", body = ErrorBody)
    ),
    tag = "kyc"
)]
#[instrument(skip_all)]
pub async fn digilocker_login(
    mut session: FlowSession,
    pool: Extension<PgPool>,
    request: Option<Json<DigiLockerLoginRequest>>,
) -> impl IntoResponse {
    let result = link(&mut session.state, &pool, request).await;
    (session.commit().await, result)
}

async fn link(
    state: &mut OnboardingSession,
    pool: &PgPool,
    request: Option<Json<DigiLockerLoginRequest>>,
) -> Result<Json<FlowResponse>, ApiError> {
    let request = payload(request)?;
    state.require_logged_in(Step::Register)?;

    let dl_id = request.dl_id.trim();
    let record = storage::find_digilocker_record(pool, dl_id).await?;
    let otp = state.begin_digilocker(dl_id, record.as_ref(), &mut rand::thread_rng(), Instant::now())?;

    // no real DigiLocker to deliver it
    info!("DigiLocker OTP: {}", otp);

    Ok(Json(
        FlowResponse::to(Step::DigiLockerOtp).with_message("DigiLocker OTP sent"),
    ))
}

#[utoipa::path(
    post,
    path = "/digilocker-otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "DigiLocker account verified", body = FlowResponse),
        (status = 401, description = "Invalid or expired OTP", body = ErrorBody),
        (status = 409, description = "No DigiLocker OTP issued", body = ErrorBody)
    ),
    tag = "kyc"
)]
pub async fn digilocker_otp(
    mut session: FlowSession,
    config: Extension<Arc<FlowConfig>>,
    request: Option<Json<OtpRequest>>,
) -> impl IntoResponse {
    let result = payload(request).and_then(|request| {
        session
            .state
            .verify_digilocker_otp(&request.otp, Instant::now(), config.otp_ttl())
            .map(|next| Json(FlowResponse::to(next)))
            .map_err(ApiError::from)
    });
    (session.commit().await, result)
}

#[utoipa::path(
    get,
    path = "/consent",
    responses(
        (status = 200, description = "Documents that will be shared", body = ConsentInfo),
        (status = 401, description = "Phone not verified yet", body = ErrorBody)
    ),
    tag = "kyc"
)]
pub async fn consent_info(session: FlowSession) -> impl IntoResponse {
    let result = session
        .state
        .require_logged_in(Step::Register)
        .map(|()| {
            Json(ConsentInfo {
                digilocker_id: session.state.digilocker_id().map(ToString::to_string),
                documents: SHARED_DOCUMENTS.iter().map(ToString::to_string).collect(),
                next: Step::Consent.path().to_string(),
            })
        })
        .map_err(ApiError::from);
    (session.commit().await, result)
}

#[utoipa::path(
    post,
    path = "/consent",
    responses(
        (status = 200, description = "Consent recorded", body = FlowResponse),
        (status = 409, description = "DigiLocker not verified", body = ErrorBody)
    ),
    tag = "kyc"
)]
pub async fn consent(mut session: FlowSession) -> impl IntoResponse {
    let result = session
        .state
        .give_consent()
        .map(|next| Json(FlowResponse::to(next)))
        .map_err(ApiError::from);
    (session.commit().await, result)
}

#[utoipa::path(
    post,
    path = "/fetch-kyc",
    responses(
        (status = 200, description = "KYC fetched from DigiLocker", body = FlowResponse),
        (status = 404, description = "DigiLocker account vanished", body = ErrorBody),
        (status = 409, description = "Consent missing", body = ErrorBody)
    ),
    tag = "kyc"
)]
#[instrument(skip_all)]
pub async fn fetch_kyc(mut session: FlowSession, pool: Extension<PgPool>) -> impl IntoResponse {
    let result = fetch(&mut session.state, &pool).await;
    (session.commit().await, result)
}

async fn fetch(
    state: &mut OnboardingSession,
    pool: &PgPool,
) -> Result<Json<FlowResponse>, ApiError> {
    let record = match state.digilocker_id() {
        Some(dl_id) => storage::find_digilocker_record(pool, dl_id).await?,
        None => None,
    };

    let next = state.store_kyc(record.as_ref())?;
    Ok(Json(FlowResponse::to(next)))
}

#[utoipa::path(
    get,
    path = "/kyc-form",
    responses(
        (status = 200, description = "Masked KYC profile", body = KycView),
        (status = 409, description = "KYC not fetched yet", body = ErrorBody)
    ),
    tag = "kyc"
)]
pub async fn kyc_form(session: FlowSession) -> impl IntoResponse {
    let result = session.state.kyc_view().map(Json).map_err(ApiError::from);
    (session.commit().await, result)
}
