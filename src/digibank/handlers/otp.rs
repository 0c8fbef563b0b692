use super::{payload, FlowResponse};
use crate::digibank::{
    config::FlowConfig,
    error::{ApiError, ErrorBody},
    session::FlowSession,
    sms::{SmsMessage, SmsSender},
    storage,
};
use crate::onboarding::{FlowError, OnboardingSession, PhoneVerified, Step};
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpRequest {
    pub otp: String,
}

#[utoipa::path(
    post,
    path = "/send-otp",
    responses(
        (status = 200, description = "OTP sent to the registered phone", body = FlowResponse),
        (status = 409, description = "No phone registered in this session", body = ErrorBody),
        (status = 502, description = "SMS gateway failed", body = ErrorBody)
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn send_otp(
    mut session: FlowSession,
    sms: Extension<Arc<dyn SmsSender>>,
) -> impl IntoResponse {
    let result = deliver_otp(&mut session.state, sms.0.as_ref());
    (session.commit().await, result)
}

fn deliver_otp(
    state: &mut OnboardingSession,
    sms: &dyn SmsSender,
) -> Result<Json<FlowResponse>, ApiError> {
    let otp = state.issue_otp(&mut rand::thread_rng(), Instant::now())?;
    let phone = state.phone().ok_or(FlowError::MissingPhone)?;

    // the challenge stays issued so a retry of /send-otp replaces it
    if let Err(err) = sms.send(&SmsMessage::otp(phone, &otp)) {
        error!("Failed to deliver OTP: {err:#}");
        return Err(ApiError::Delivery);
    }

    debug!("OTP delivered");

    Ok(Json(
        FlowResponse::to(Step::VerifyOtp).with_message("OTP sent to your phone"),
    ))
}

#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Phone verified", body = FlowResponse),
        (status = 401, description = "Invalid or expired OTP", body = ErrorBody),
        (status = 403, description = "Application was rejected", body = ErrorBody),
        (status = 404, description = "No account for this phone", body = ErrorBody)
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    mut session: FlowSession,
    pool: Extension<PgPool>,
    config: Extension<Arc<FlowConfig>>,
    request: Option<Json<OtpRequest>>,
) -> impl IntoResponse {
    let result = verify(&mut session.state, &pool, &config, request).await;
    (session.commit().await, result)
}

async fn verify(
    state: &mut OnboardingSession,
    pool: &PgPool,
    config: &FlowConfig,
    request: Option<Json<OtpRequest>>,
) -> Result<Json<FlowResponse>, ApiError> {
    let request = payload(request)?;

    state.check_otp(&request.otp, Instant::now(), config.otp_ttl())?;

    let phone = state.phone().ok_or(FlowError::MissingPhone)?.to_string();
    let existing = storage::find_user_by_phone(pool, &phone).await?;

    let verified = state.complete_phone_verification(existing.map(|user| user.status))?;

    if let PhoneVerified::SignedUp { create_user: true } = verified {
        if storage::create_pending_user(pool, &phone).await? {
            info!("Created pending account");
        }
    }

    debug!("Phone verified: {:?}", verified);

    let response = FlowResponse::to(verified.next());
    Ok(Json(match verified {
        PhoneVerified::UnderReview => {
            response.with_message("Your application is still under review")
        }
        _ => response,
    }))
}
