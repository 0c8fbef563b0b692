//! Onboarding state machine.
//!
//! Pure logic, no I/O: phone OTP, DigiLocker linking, consent, KYC fetch,
//! risk scoring and the branches that follow it.

pub mod catalog;
mod error;
pub mod kyc;
pub mod otp;
pub mod risk;
mod session;
mod status;
mod step;

pub use error::FlowError;
pub use kyc::{DigiLockerRecord, KycProfile, KycView};
pub use risk::{RiskAssessment, RiskLevel};
pub use session::{FlowMode, OnboardingSession, PhoneVerified, RiskOutcome};
pub use status::AccountStatus;
pub use step::Step;
