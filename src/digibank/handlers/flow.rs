//! Entry and exit points: signup, register, login and logout.

use super::{payload, FlowResponse};
use crate::digibank::{
    error::{ApiError, ErrorBody},
    session::FlowSession,
};
use crate::onboarding::Step;
use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PhoneRequest {
    /// Mobile number; an optional `+` and 10 to 15 digits, spaces and dashes allowed.
    pub phone: String,
}

#[utoipa::path(
    post,
    path = "/signup",
    responses(
        (status = 200, description = "Session reset in signup mode", body = FlowResponse)
    ),
    tag = "onboarding"
)]
pub async fn signup(mut session: FlowSession) -> impl IntoResponse {
    let next = session.state.signup();
    (session.commit().await, Json(FlowResponse::to(next)))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = PhoneRequest,
    responses(
        (status = 200, description = "Phone stored, send the OTP next", body = FlowResponse),
        (status = 400, description = "Missing or invalid phone", body = ErrorBody)
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn register(
    mut session: FlowSession,
    request: Option<Json<PhoneRequest>>,
) -> impl IntoResponse {
    let result = set_phone(&mut session, request);
    (session.commit().await, result)
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = PhoneRequest,
    responses(
        (status = 200, description = "Session reset in login mode, send the OTP next", body = FlowResponse),
        (status = 400, description = "Missing or invalid phone", body = ErrorBody)
    ),
    tag = "onboarding"
)]
#[instrument(skip_all)]
pub async fn login(
    mut session: FlowSession,
    request: Option<Json<PhoneRequest>>,
) -> impl IntoResponse {
    // previous flags must not leak into the login
    session.state.login();
    let result = set_phone(&mut session, request);
    (session.commit().await, result)
}

fn set_phone(
    session: &mut FlowSession,
    request: Option<Json<PhoneRequest>>,
) -> Result<Json<FlowResponse>, ApiError> {
    let request = payload(request)?;
    let next = session.state.set_phone(&request.phone)?;
    debug!(mode = ?session.state.mode(), "phone registered");
    Ok(Json(FlowResponse::to(next)))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cleared", body = FlowResponse)
    ),
    tag = "onboarding"
)]
pub async fn logout(session: FlowSession) -> impl IntoResponse {
    (session.destroy().await, Json(FlowResponse::to(Step::Home)))
}
