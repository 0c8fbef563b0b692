//! Client-visible destinations of the onboarding flow.

use std::fmt;

/// Every endpoint a client can be sent to next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Home,
    Register,
    Login,
    SendOtp,
    VerifyOtp,
    DigiLocker,
    DigiLockerLogin,
    DigiLockerOtp,
    Consent,
    FetchKyc,
    KycForm,
    RiskCheck,
    ExtraVerification,
    UnderReview,
    ViewStatus,
    Dashboard,
    ActivateServices,
    Rejected,
}

impl Step {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Register => "/register",
            Self::Login => "/login",
            Self::SendOtp => "/send-otp",
            Self::VerifyOtp => "/verify-otp",
            Self::DigiLocker => "/digilocker",
            Self::DigiLockerLogin => "/digilocker-login",
            Self::DigiLockerOtp => "/digilocker-otp",
            Self::Consent => "/consent",
            Self::FetchKyc => "/fetch-kyc",
            Self::KycForm => "/kyc-form",
            Self::RiskCheck => "/risk-check",
            Self::ExtraVerification => "/extra-verification",
            Self::UnderReview => "/under-review",
            Self::ViewStatus => "/view-status",
            Self::Dashboard => "/dashboard",
            Self::ActivateServices => "/activate-services",
            Self::Rejected => "/rejected",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_absolute_and_unique() {
        let steps = [
            Step::Home,
            Step::Register,
            Step::Login,
            Step::SendOtp,
            Step::VerifyOtp,
            Step::DigiLocker,
            Step::DigiLockerLogin,
            Step::DigiLockerOtp,
            Step::Consent,
            Step::FetchKyc,
            Step::KycForm,
            Step::RiskCheck,
            Step::ExtraVerification,
            Step::UnderReview,
            Step::ViewStatus,
            Step::Dashboard,
            Step::ActivateServices,
            Step::Rejected,
        ];
        let mut seen = std::collections::HashSet::new();
        for step in steps {
            assert!(step.path().starts_with('/'));
            assert!(seen.insert(step.path()), "duplicate path {step}");
        }
    }

    #[test]
    fn display_matches_path() {
        assert_eq!(Step::DigiLockerOtp.to_string(), "/digilocker-otp");
    }
}
