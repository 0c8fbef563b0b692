//! Synthetic onboarding risk score.
//!
//! The score adds a fixed penalty when the DigiLocker mobile differs from the
//! phone that passed OTP, a smaller one for brand-new accounts, and two
//! simulated device and location signals drawn uniformly from
//! [`SIGNAL_RISK`]. Tiers: `LOW` up to 30, `MEDIUM` up to 60, `HIGH` above.

use super::{kyc::phones_match, status::AccountStatus, step::Step};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};
use utoipa::ToSchema;

pub const IDENTITY_MISMATCH_RISK: u32 = 25;
pub const NEW_ACCOUNT_RISK: u32 = 10;
pub const SIGNAL_RISK: RangeInclusive<u32> = 5..=20;
pub const LOW_RISK_MAX: u32 = 30;
pub const MEDIUM_RISK_MAX: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        if score <= LOW_RISK_MAX {
            Self::Low
        } else if score <= MEDIUM_RISK_MAX {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// LOW is auto-approved, MEDIUM needs extra verification and HIGH waits
    /// for an admin.
    #[must_use]
    pub const fn next_step(self) -> Step {
        match self {
            Self::Low => Step::Dashboard,
            Self::Medium => Step::ExtraVerification,
            Self::High => Step::ViewStatus,
        }
    }

    /// Account status to store once a score lands in this tier. MEDIUM
    /// leaves the account alone until the PAN and DOB check passes.
    #[must_use]
    pub const fn status_after_assessment(self) -> Option<AccountStatus> {
        match self {
            Self::Low => Some(AccountStatus::Approved),
            Self::Medium => None,
            Self::High => Some(AccountStatus::Pending),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskFactors {
    pub identity_mismatch: u32,
    pub new_account: u32,
    pub device: u32,
    pub location: u32,
}

impl RiskFactors {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.identity_mismatch + self.new_account + self.device + self.location
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: RiskFactors,
}

#[derive(Clone, Copy, Debug)]
pub struct RiskInputs<'a> {
    pub phone: &'a str,
    /// Mobile registered with DigiLocker, when the record is still found.
    pub digilocker_mobile: Option<&'a str>,
    pub new_user: bool,
}

pub fn assess<R: Rng + ?Sized>(inputs: &RiskInputs<'_>, rng: &mut R) -> RiskAssessment {
    let identity_mismatch = match inputs.digilocker_mobile {
        Some(mobile) if !phones_match(mobile, inputs.phone) => IDENTITY_MISMATCH_RISK,
        _ => 0,
    };

    let factors = RiskFactors {
        identity_mismatch,
        new_account: if inputs.new_user { NEW_ACCOUNT_RISK } else { 0 },
        device: rng.gen_range(SIGNAL_RISK),
        location: rng.gen_range(SIGNAL_RISK),
    };

    let score = factors.total();

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}
