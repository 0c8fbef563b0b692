use super::step::Step;
use thiserror::Error;

/// Reasons a flow transition is refused.
///
/// Each variant may carry the step the client should visit instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("No phone number in session")]
    MissingPhone,

    #[error("No OTP has been issued")]
    OtpNotIssued { next: Step },

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Invalid DigiLocker OTP")]
    InvalidDigiLockerOtp,

    #[error("OTP expired, request a new one")]
    OtpExpired { next: Step },

    #[error("User not found. Please sign up first.")]
    UserNotFound,

    #[error("Your application was rejected.")]
    Rejected,

    #[error("DigiLocker account not found.")]
    DigiLockerNotFound,

    #[error("Verification failed. Details do not match.")]
    VerificationFailed,

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Step not available yet")]
    OutOfOrder { next: Step },

    #[error("Not logged in")]
    NotLoggedIn { next: Step },
}

impl FlowError {
    /// Where the client should go after this refusal, if anywhere.
    #[must_use]
    pub const fn next(&self) -> Option<Step> {
        match self {
            Self::MissingPhone | Self::UserNotFound => Some(Step::Register),
            Self::Rejected => Some(Step::Rejected),
            Self::OtpNotIssued { next }
            | Self::OtpExpired { next }
            | Self::OutOfOrder { next }
            | Self::NotLoggedIn { next } => Some(*next),
            Self::InvalidPhone
            | Self::InvalidOtp
            | Self::InvalidDigiLockerOtp
            | Self::DigiLockerNotFound
            | Self::VerificationFailed
            | Self::UnknownService(_) => None,
        }
    }
}
