use crate::onboarding::FlowError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Admin token required")]
    Unauthorized,

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("SMS delivery failed, please retry")]
    Delivery,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn missing_payload() -> Self {
        Self::BadRequest("Missing payload".to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Flow(flow) => flow_status(flow),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::Delivery => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Flow(flow) => ErrorBody {
                error: flow.to_string(),
                next: flow.next().map(|step| step.path().to_string()),
            },
            // never leak storage or upstream details to clients
            Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                next: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                next: None,
            },
        }
    }
}

fn flow_status(error: &FlowError) -> StatusCode {
    match error {
        FlowError::InvalidPhone | FlowError::UnknownService(_) => StatusCode::BAD_REQUEST,
        FlowError::InvalidOtp
        | FlowError::InvalidDigiLockerOtp
        | FlowError::OtpExpired { .. }
        | FlowError::NotLoggedIn { .. } => StatusCode::UNAUTHORIZED,
        FlowError::Rejected => StatusCode::FORBIDDEN,
        FlowError::UserNotFound | FlowError::DigiLockerNotFound => StatusCode::NOT_FOUND,
        FlowError::MissingPhone | FlowError::OtpNotIssued { .. } | FlowError::OutOfOrder { .. } => {
            StatusCode::CONFLICT
        }
        FlowError::VerificationFailed => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Request failed: {err:#}");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::Step;
    use anyhow::anyhow;

    #[test]
    fn flow_errors_carry_next_step() {
        let err = ApiError::from(FlowError::NotLoggedIn {
            next: Step::Register,
        });
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.body(),
            ErrorBody {
                error: "Not logged in".to_string(),
                next: Some("/register".to_string()),
            }
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::from(FlowError::InvalidOtp).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(FlowError::Rejected).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(FlowError::DigiLockerNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(FlowError::VerificationFailed).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(FlowError::OutOfOrder {
                next: Step::Consent
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::UserNotFound(3).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Delivery.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = ApiError::from(anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().error, "Internal server error");
    }
}
