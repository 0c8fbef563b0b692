pub mod account;
pub mod admin;
pub mod chatbot;
pub mod digilocker;
pub mod flow;
pub mod health;
pub mod otp;
pub mod risk;
pub mod root;

use super::error::ApiError;
use crate::onboarding::Step;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where the client goes next.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowResponse {
    pub next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FlowResponse {
    #[must_use]
    pub fn to(step: Step) -> Self {
        Self {
            next: step.path().to_string(),
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Unwrap an optional JSON body, answering 400 when it is missing or
/// malformed.
pub(crate) fn payload<T>(payload: Option<Json<T>>) -> Result<T, ApiError> {
    payload
        .map(|Json(payload)| payload)
        .ok_or_else(ApiError::missing_payload)
}
