//! Six-digit one-time passcodes with expiry and an attempt budget.

use rand::Rng;
use std::time::{Duration, Instant};

pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(5 * 60);
pub const OTP_MAX_ATTEMPTS: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OtpCheck {
    Accepted,
    Rejected,
    /// Expired or out of attempts; the challenge must be discarded.
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct OtpChallenge {
    code: String,
    issued_at: Instant,
    failed_attempts: u8,
    accepted: bool,
}

impl OtpChallenge {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: Instant) -> Self {
        Self {
            code: rng.gen_range(100_000..=999_999u32).to_string(),
            issued_at: now,
            failed_attempts: 0,
            accepted: false,
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.issued_at) > ttl
    }

    pub fn check(&mut self, candidate: &str, now: Instant, ttl: Duration) -> OtpCheck {
        if self.is_expired(now, ttl) || self.failed_attempts >= OTP_MAX_ATTEMPTS {
            return OtpCheck::Exhausted;
        }

        if codes_match(&self.code, candidate.trim()) {
            self.accepted = true;
            return OtpCheck::Accepted;
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= OTP_MAX_ATTEMPTS {
            OtpCheck::Exhausted
        } else {
            OtpCheck::Rejected
        }
    }
}

/// Constant-time comparison for secrets of the same length.
#[must_use]
pub fn codes_match(expected: &str, candidate: &str) -> bool {
    if expected.len() != candidate.len() {
        return false;
    }
    expected
        .bytes()
        .zip(candidate.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
