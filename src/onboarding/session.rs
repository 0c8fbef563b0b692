//! Per-browser onboarding state and the transitions between steps.
//!
//! Every method either advances the flow and returns the next [`Step`], or
//! refuses with a [`FlowError`] naming where the client should go instead.
//! Storage lookups happen in the HTTP layer; their results are passed in.

use super::{
    catalog,
    error::FlowError,
    kyc::{normalize_phone, DigiLockerRecord, KycProfile, KycView},
    otp::{OtpChallenge, OtpCheck},
    risk::{self, RiskAssessment, RiskInputs, RiskLevel},
    status::AccountStatus,
    step::Step,
};
use rand::Rng;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowMode {
    Signup,
    Login,
}

/// Result of a phone OTP that matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhoneVerified {
    /// Approved customer logging back in.
    LoggedIn,
    /// Known customer whose application still waits for review.
    UnderReview,
    /// New or returning signup; `create_user` when no account exists yet.
    SignedUp { create_user: bool },
}

impl PhoneVerified {
    #[must_use]
    pub const fn next(self) -> Step {
        match self {
            Self::LoggedIn => Step::Dashboard,
            Self::UnderReview => Step::UnderReview,
            Self::SignedUp { .. } => Step::DigiLocker,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskOutcome {
    pub assessment: RiskAssessment,
    /// True until [`OnboardingSession::record_risk`] keeps the assessment.
    pub fresh: bool,
}

impl RiskOutcome {
    #[must_use]
    pub const fn next(&self) -> Step {
        self.assessment.level.next_step()
    }
}

#[derive(Clone, Debug, Default)]
pub struct OnboardingSession {
    mode: Option<FlowMode>,
    phone: Option<String>,
    otp: Option<OtpChallenge>,
    logged_in: bool,
    new_user: bool,
    digilocker_id: Option<String>,
    digilocker_otp: Option<OtpChallenge>,
    digilocker_verified: bool,
    consent_given: bool,
    kyc: Option<KycProfile>,
    risk: Option<RiskAssessment>,
    services: Vec<String>,
}

impl OnboardingSession {
    #[must_use]
    pub fn mode(&self) -> Option<FlowMode> {
        self.mode
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    #[must_use]
    pub fn is_new_user(&self) -> bool {
        self.new_user
    }

    #[must_use]
    pub fn digilocker_id(&self) -> Option<&str> {
        self.digilocker_id.as_deref()
    }

    #[must_use]
    pub fn risk(&self) -> Option<&RiskAssessment> {
        self.risk.as_ref()
    }

    #[must_use]
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Start over in signup mode.
    pub fn signup(&mut self) -> Step {
        *self = Self {
            mode: Some(FlowMode::Signup),
            ..Self::default()
        };
        Step::Register
    }

    /// Start over in login mode.
    pub fn login(&mut self) {
        *self = Self {
            mode: Some(FlowMode::Login),
            ..Self::default()
        };
    }

    pub fn logout(&mut self) -> Step {
        *self = Self::default();
        Step::Home
    }

    /// Record the phone to verify. Anything proven for a previous phone is
    /// dropped; only the flow mode survives.
    pub fn set_phone(&mut self, raw: &str) -> Result<Step, FlowError> {
        let phone = normalize_phone(raw).ok_or(FlowError::InvalidPhone)?;
        *self = Self {
            mode: self.mode,
            phone: Some(phone),
            ..Self::default()
        };
        Ok(Step::SendOtp)
    }

    /// Issue a fresh phone OTP, replacing any pending one. Returns the code
    /// so it can be delivered.
    pub fn issue_otp<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: Instant,
    ) -> Result<String, FlowError> {
        if self.phone.is_none() {
            return Err(FlowError::MissingPhone);
        }
        let challenge = OtpChallenge::generate(rng, now);
        let code = challenge.code().to_string();
        self.otp = Some(challenge);
        Ok(code)
    }

    /// Check a submitted phone OTP without consuming it.
    pub fn check_otp(&mut self, code: &str, now: Instant, ttl: Duration) -> Result<(), FlowError> {
        let Some(challenge) = self.otp.as_mut() else {
            return Err(FlowError::OtpNotIssued {
                next: Step::SendOtp,
            });
        };

        match challenge.check(code, now, ttl) {
            OtpCheck::Accepted => Ok(()),
            OtpCheck::Rejected => Err(FlowError::InvalidOtp),
            OtpCheck::Exhausted => {
                self.otp = None;
                Err(FlowError::OtpExpired {
                    next: Step::SendOtp,
                })
            }
        }
    }

    /// Consume an accepted phone OTP and branch on the account that owns the
    /// phone.
    pub fn complete_phone_verification(
        &mut self,
        existing: Option<AccountStatus>,
    ) -> Result<PhoneVerified, FlowError> {
        if !self.otp.as_ref().is_some_and(OtpChallenge::is_accepted) {
            return Err(FlowError::OutOfOrder {
                next: Step::VerifyOtp,
            });
        }
        self.otp = None;

        if self.mode == Some(FlowMode::Login) {
            return match existing {
                None => Err(FlowError::UserNotFound),
                Some(AccountStatus::Rejected) => Err(FlowError::Rejected),
                Some(AccountStatus::Pending) => {
                    self.mode = None;
                    Ok(PhoneVerified::UnderReview)
                }
                Some(AccountStatus::Approved) => {
                    self.mode = None;
                    self.logged_in = true;
                    Ok(PhoneVerified::LoggedIn)
                }
            };
        }

        if existing == Some(AccountStatus::Rejected) {
            return Err(FlowError::Rejected);
        }

        self.logged_in = true;
        self.new_user = true;
        Ok(PhoneVerified::SignedUp {
            create_user: existing.is_none(),
        })
    }

    pub fn require_logged_in(&self, otherwise: Step) -> Result<(), FlowError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(FlowError::NotLoggedIn { next: otherwise })
        }
    }

    /// Link a DigiLocker account by Aadhaar or mobile. Returns the simulated
    /// DigiLocker OTP.
    pub fn begin_digilocker<R: Rng + ?Sized>(
        &mut self,
        digilocker_id: &str,
        record: Option<&DigiLockerRecord>,
        rng: &mut R,
        now: Instant,
    ) -> Result<String, FlowError> {
        self.require_logged_in(Step::Register)?;

        let digilocker_id = digilocker_id.trim();
        if digilocker_id.is_empty() || record.is_none() {
            return Err(FlowError::DigiLockerNotFound);
        }

        let challenge = OtpChallenge::generate(rng, now);
        let code = challenge.code().to_string();

        self.digilocker_id = Some(digilocker_id.to_string());
        self.digilocker_otp = Some(challenge);
        self.digilocker_verified = false;
        self.consent_given = false;
        self.kyc = None;

        Ok(code)
    }

    pub fn verify_digilocker_otp(
        &mut self,
        code: &str,
        now: Instant,
        ttl: Duration,
    ) -> Result<Step, FlowError> {
        let Some(challenge) = self.digilocker_otp.as_mut() else {
            return Err(FlowError::OtpNotIssued {
                next: Step::DigiLockerLogin,
            });
        };

        match challenge.check(code, now, ttl) {
            OtpCheck::Accepted => {
                self.digilocker_otp = None;
                self.digilocker_verified = true;
                Ok(Step::Consent)
            }
            OtpCheck::Rejected => Err(FlowError::InvalidDigiLockerOtp),
            OtpCheck::Exhausted => {
                self.digilocker_otp = None;
                Err(FlowError::OtpExpired {
                    next: Step::DigiLockerLogin,
                })
            }
        }
    }

    pub fn give_consent(&mut self) -> Result<Step, FlowError> {
        if !self.digilocker_verified {
            return Err(FlowError::OutOfOrder {
                next: Step::DigiLockerLogin,
            });
        }
        self.consent_given = true;
        Ok(Step::FetchKyc)
    }

    /// Copy KYC data out of the DigiLocker record found for the linked id.
    pub fn store_kyc(&mut self, record: Option<&DigiLockerRecord>) -> Result<Step, FlowError> {
        if !self.consent_given {
            return Err(FlowError::OutOfOrder {
                next: Step::Consent,
            });
        }
        let record = record.ok_or(FlowError::DigiLockerNotFound)?;
        self.kyc = Some(KycProfile::from(record));
        Ok(Step::KycForm)
    }

    pub fn kyc_view(&self) -> Result<KycView, FlowError> {
        self.kyc.as_ref().map(KycView::from).ok_or(FlowError::OutOfOrder {
            next: if self.consent_given {
                Step::FetchKyc
            } else {
                Step::Consent
            },
        })
    }

    /// Score the session, or return the assessment kept by
    /// [`record_risk`](Self::record_risk). A fresh score is not kept until
    /// the caller records it, so a failed status write can be retried.
    pub fn assess_risk<R: Rng + ?Sized>(
        &self,
        record: Option<&DigiLockerRecord>,
        rng: &mut R,
    ) -> Result<RiskOutcome, FlowError> {
        if let Some(assessment) = &self.risk {
            return Ok(RiskOutcome {
                assessment: assessment.clone(),
                fresh: false,
            });
        }

        if self.kyc.is_none() {
            return Err(FlowError::OutOfOrder {
                next: Step::Consent,
            });
        }

        let phone = self.phone.as_deref().ok_or(FlowError::MissingPhone)?;
        let assessment = risk::assess(
            &RiskInputs {
                phone,
                digilocker_mobile: record.map(|record| record.mobile.as_str()),
                new_user: self.new_user,
            },
            rng,
        );

        Ok(RiskOutcome {
            assessment,
            fresh: true,
        })
    }

    /// Keep a fresh assessment once its account status is stored. The first
    /// recorded assessment wins.
    pub fn record_risk(&mut self, assessment: RiskAssessment) {
        if self.risk.is_none() {
            self.risk = Some(assessment);
            self.new_user = false;
        }
    }

    /// PAN and DOB check offered to MEDIUM-risk applicants only.
    pub fn extra_verification(
        &self,
        pan: &str,
        dob: &str,
        record: Option<&DigiLockerRecord>,
    ) -> Result<Step, FlowError> {
        match self.risk.as_ref().map(|risk| risk.level) {
            None => {
                return Err(FlowError::OutOfOrder {
                    next: Step::RiskCheck,
                })
            }
            Some(RiskLevel::Medium) => {}
            Some(level) => {
                return Err(FlowError::OutOfOrder {
                    next: level.next_step(),
                })
            }
        }

        match record {
            Some(record) if record.matches_identity(pan, dob) => Ok(Step::ActivateServices),
            _ => Err(FlowError::VerificationFailed),
        }
    }

    /// Returns whether this is the first dashboard visit of a new account.
    pub fn dashboard(&mut self) -> Result<bool, FlowError> {
        self.require_logged_in(Step::Register)?;
        Ok(std::mem::take(&mut self.new_user))
    }

    pub fn activate_services(&mut self, selection: &[String]) -> Result<Vec<String>, FlowError> {
        self.require_logged_in(Step::Login)?;

        let mut activated: Vec<String> = Vec::with_capacity(selection.len());
        for service in selection {
            let service = service.trim();
            if !catalog::is_known(service) {
                return Err(FlowError::UnknownService(service.to_string()));
            }
            if !activated.iter().any(|s| s == service) {
                activated.push(service.to_string());
            }
        }

        self.services.clone_from(&activated);
        Ok(activated)
    }

    pub fn view_status(&self, status: Option<AccountStatus>) -> Result<Step, FlowError> {
        self.require_logged_in(Step::Login)?;
        Ok(match status {
            Some(AccountStatus::Approved) => Step::ActivateServices,
            Some(AccountStatus::Rejected) => Step::Rejected,
            Some(AccountStatus::Pending) | None => Step::UnderReview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::otp::{DEFAULT_OTP_TTL, OTP_MAX_ATTEMPTS};
    use rand::{rngs::StdRng, SeedableRng};

    const PHONE: &str = "+919876543210";

    fn record() -> DigiLockerRecord {
        DigiLockerRecord {
            aadhaar: "123412341234".to_string(),
            mobile: "9876543210".to_string(),
            name: "Asha Rao".to_string(),
            dob: "1990-04-12".to_string(),
            pan: "ABCDE1234F".to_string(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    /// Signup through phone OTP; returns the session logged in.
    fn signed_up(rng: &mut StdRng, now: Instant) -> OnboardingSession {
        let mut session = OnboardingSession::default();
        assert_eq!(session.signup(), Step::Register);
        assert_eq!(session.set_phone(PHONE), Ok(Step::SendOtp));
        let code = session.issue_otp(rng, now).unwrap_or_default();
        assert_eq!(session.check_otp(&code, now, DEFAULT_OTP_TTL), Ok(()));
        assert_eq!(
            session.complete_phone_verification(None),
            Ok(PhoneVerified::SignedUp { create_user: true })
        );
        session
    }

    /// Continue through DigiLocker, consent and KYC fetch.
    fn with_kyc(rng: &mut StdRng, now: Instant) -> OnboardingSession {
        let mut session = signed_up(rng, now);
        let record = record();
        let code = session
            .begin_digilocker(&record.aadhaar, Some(&record), rng, now)
            .unwrap_or_default();
        assert_eq!(
            session.verify_digilocker_otp(&code, now, DEFAULT_OTP_TTL),
            Ok(Step::Consent)
        );
        assert_eq!(session.give_consent(), Ok(Step::FetchKyc));
        assert_eq!(session.store_kyc(Some(&record)), Ok(Step::KycForm));
        session
    }

    fn session_with_risk(level: RiskLevel) -> OnboardingSession {
        let mut session = with_kyc(&mut rng(), Instant::now());
        session.risk = Some(RiskAssessment {
            score: match level {
                RiskLevel::Low => 20,
                RiskLevel::Medium => 45,
                RiskLevel::High => 70,
            },
            level,
            factors: risk::RiskFactors {
                identity_mismatch: 0,
                new_account: 0,
                device: 0,
                location: 0,
            },
        });
        session
    }

    #[test]
    fn signup_happy_path_reaches_risk_check() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = with_kyc(&mut rng, now);

        let view = session.kyc_view().unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(view.name, "Asha Rao");
        assert_eq!(view.aadhaar, "XXXX-XXXX-1234");

        assert!(session.is_new_user());
        let outcome = session
            .assess_risk(Some(&record()), &mut rng)
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(outcome.fresh);
        assert_eq!(outcome.assessment.factors.new_account, risk::NEW_ACCOUNT_RISK);
        assert_eq!(outcome.assessment.factors.identity_mismatch, 0);
        assert_eq!(outcome.next(), outcome.assessment.level.next_step());
        assert!(session.is_new_user());

        session.record_risk(outcome.assessment);
        assert!(!session.is_new_user());
    }

    #[test]
    fn unrecorded_score_is_not_kept() {
        let mut rng = rng();
        let session = with_kyc(&mut rng, Instant::now());
        let first = session
            .assess_risk(Some(&record()), &mut rng)
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(first.fresh);
        assert!(session.risk().is_none());

        // nothing was recorded, so the next request scores again
        let retry = session
            .assess_risk(Some(&record()), &mut rng)
            .unwrap_or_else(|err| panic!("{err}"));
        assert!(retry.fresh);
        assert!(session.is_new_user());
    }

    #[test]
    fn risk_is_memoized() {
        let mut rng = rng();
        let mut session = with_kyc(&mut rng, Instant::now());
        let first = session
            .assess_risk(Some(&record()), &mut rng)
            .unwrap_or_else(|err| panic!("{err}"));
        session.record_risk(first.assessment.clone());

        let other = session_with_risk(RiskLevel::High)
            .risk()
            .cloned()
            .unwrap_or_else(|| panic!("risk set"));
        session.record_risk(other);

        for _ in 0..10 {
            let again = session
                .assess_risk(None, &mut rng)
                .unwrap_or_else(|err| panic!("{err}"));
            assert!(!again.fresh);
            assert_eq!(again.assessment, first.assessment);
        }
    }

    #[test]
    fn risk_requires_kyc() {
        let mut rng = rng();
        let session = signed_up(&mut rng, Instant::now());
        assert_eq!(
            session.assess_risk(Some(&record()), &mut rng),
            Err(FlowError::OutOfOrder {
                next: Step::Consent
            })
        );
    }

    #[test]
    fn send_otp_without_phone_is_refused() {
        let mut session = OnboardingSession::default();
        session.signup();
        assert_eq!(
            session.issue_otp(&mut rng(), Instant::now()),
            Err(FlowError::MissingPhone)
        );
    }

    #[test]
    fn invalid_phone_is_refused() {
        let mut session = OnboardingSession::default();
        assert_eq!(session.set_phone("call me"), Err(FlowError::InvalidPhone));
        assert_eq!(session.phone(), None);
    }

    #[test]
    fn wrong_otp_is_counted_and_eventually_discarded() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        session.signup();
        assert!(session.set_phone(PHONE).is_ok());
        session.issue_otp(&mut rng, now).unwrap_or_default();

        for _ in 1..OTP_MAX_ATTEMPTS {
            assert_eq!(
                session.check_otp("000000", now, DEFAULT_OTP_TTL),
                Err(FlowError::InvalidOtp)
            );
        }
        assert_eq!(
            session.check_otp("000000", now, DEFAULT_OTP_TTL),
            Err(FlowError::OtpExpired {
                next: Step::SendOtp
            })
        );
        assert_eq!(
            session.check_otp("000000", now, DEFAULT_OTP_TTL),
            Err(FlowError::OtpNotIssued {
                next: Step::SendOtp
            })
        );
    }

    #[test]
    fn completion_requires_accepted_otp() {
        let mut rng = rng();
        let mut session = OnboardingSession::default();
        session.signup();
        assert!(session.set_phone(PHONE).is_ok());
        session.issue_otp(&mut rng, Instant::now()).unwrap_or_default();
        assert_eq!(
            session.complete_phone_verification(None),
            Err(FlowError::OutOfOrder {
                next: Step::VerifyOtp
            })
        );
        assert!(!session.is_logged_in());
    }

    #[test]
    fn otp_is_single_use() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        session.signup();
        assert!(session.set_phone(PHONE).is_ok());
        let code = session.issue_otp(&mut rng, now).unwrap_or_default();
        assert_eq!(session.check_otp(&code, now, DEFAULT_OTP_TTL), Ok(()));
        assert!(session.complete_phone_verification(None).is_ok());
        assert_eq!(
            session.check_otp(&code, now, DEFAULT_OTP_TTL),
            Err(FlowError::OtpNotIssued {
                next: Step::SendOtp
            })
        );
    }

    fn login_verified(
        existing: Option<AccountStatus>,
    ) -> (OnboardingSession, Result<PhoneVerified, FlowError>) {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        session.login();
        assert!(session.set_phone(PHONE).is_ok());
        assert_eq!(session.mode(), Some(FlowMode::Login));
        let code = session.issue_otp(&mut rng, now).unwrap_or_default();
        session.check_otp(&code, now, DEFAULT_OTP_TTL).unwrap_or_default();
        let outcome = session.complete_phone_verification(existing);
        (session, outcome)
    }

    #[test]
    fn login_branches_on_account_status() {
        let (session, outcome) = login_verified(Some(AccountStatus::Approved));
        assert_eq!(outcome, Ok(PhoneVerified::LoggedIn));
        assert_eq!(PhoneVerified::LoggedIn.next(), Step::Dashboard);
        assert!(session.is_logged_in());
        assert_eq!(session.mode(), None);

        let (session, outcome) = login_verified(Some(AccountStatus::Pending));
        assert_eq!(outcome, Ok(PhoneVerified::UnderReview));
        assert!(!session.is_logged_in());
        assert_eq!(session.mode(), None);

        let (session, outcome) = login_verified(Some(AccountStatus::Rejected));
        assert_eq!(outcome, Err(FlowError::Rejected));
        assert!(!session.is_logged_in());

        let (_, outcome) = login_verified(None);
        assert_eq!(outcome, Err(FlowError::UserNotFound));
    }

    #[test]
    fn signup_with_existing_account_does_not_recreate_it() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        session.signup();
        assert!(session.set_phone(PHONE).is_ok());
        let code = session.issue_otp(&mut rng, now).unwrap_or_default();
        session.check_otp(&code, now, DEFAULT_OTP_TTL).unwrap_or_default();
        assert_eq!(
            session.complete_phone_verification(Some(AccountStatus::Pending)),
            Ok(PhoneVerified::SignedUp { create_user: false })
        );
        assert!(session.is_new_user());
    }

    #[test]
    fn signup_of_rejected_phone_is_refused() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        session.signup();
        assert!(session.set_phone(PHONE).is_ok());
        let code = session.issue_otp(&mut rng, now).unwrap_or_default();
        session.check_otp(&code, now, DEFAULT_OTP_TTL).unwrap_or_default();
        assert_eq!(
            session.complete_phone_verification(Some(AccountStatus::Rejected)),
            Err(FlowError::Rejected)
        );
        assert!(!session.is_logged_in());
    }

    #[test]
    fn changing_phone_logs_out() {
        let mut rng = rng();
        let mut session = signed_up(&mut rng, Instant::now());
        assert!(session.is_logged_in());
        assert_eq!(session.set_phone("+919000000000"), Ok(Step::SendOtp));
        assert!(!session.is_logged_in());
        assert_eq!(session.mode(), Some(FlowMode::Signup));
    }

    #[test]
    fn digilocker_requires_login_and_known_account() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = OnboardingSession::default();
        let record = record();
        assert_eq!(
            session.begin_digilocker("123412341234", Some(&record), &mut rng, now),
            Err(FlowError::NotLoggedIn {
                next: Step::Register
            })
        );

        let mut session = signed_up(&mut rng, now);
        assert_eq!(
            session.begin_digilocker("000000000000", None, &mut rng, now),
            Err(FlowError::DigiLockerNotFound)
        );
        assert_eq!(
            session.begin_digilocker("   ", Some(&record), &mut rng, now),
            Err(FlowError::DigiLockerNotFound)
        );
    }

    #[test]
    fn digilocker_otp_mismatch_and_expiry() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = signed_up(&mut rng, now);
        let record = record();

        assert_eq!(
            session.verify_digilocker_otp("123456", now, DEFAULT_OTP_TTL),
            Err(FlowError::OtpNotIssued {
                next: Step::DigiLockerLogin
            })
        );

        let code = session
            .begin_digilocker(&record.mobile, Some(&record), &mut rng, now)
            .unwrap_or_default();
        assert_eq!(session.digilocker_id(), Some("9876543210"));
        assert_eq!(
            session.verify_digilocker_otp("000000", now, DEFAULT_OTP_TTL),
            Err(FlowError::InvalidDigiLockerOtp)
        );

        let later = now + DEFAULT_OTP_TTL + Duration::from_secs(1);
        assert_eq!(
            session.verify_digilocker_otp(&code, later, DEFAULT_OTP_TTL),
            Err(FlowError::OtpExpired {
                next: Step::DigiLockerLogin
            })
        );
        assert_eq!(
            session.give_consent(),
            Err(FlowError::OutOfOrder {
                next: Step::DigiLockerLogin
            })
        );
    }

    #[test]
    fn kyc_fetch_requires_consent() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = signed_up(&mut rng, now);
        assert_eq!(
            session.store_kyc(Some(&record())),
            Err(FlowError::OutOfOrder {
                next: Step::Consent
            })
        );
        assert_eq!(
            session.kyc_view(),
            Err(FlowError::OutOfOrder {
                next: Step::Consent
            })
        );
    }

    #[test]
    fn kyc_fetch_with_vanished_record() {
        let mut rng = rng();
        let now = Instant::now();
        let mut session = signed_up(&mut rng, now);
        let record = record();
        let code = session
            .begin_digilocker(&record.aadhaar, Some(&record), &mut rng, now)
            .unwrap_or_default();
        session
            .verify_digilocker_otp(&code, now, DEFAULT_OTP_TTL)
            .unwrap_or_else(|err| panic!("{err}"));
        session.give_consent().unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(session.store_kyc(None), Err(FlowError::DigiLockerNotFound));
        assert_eq!(
            session.kyc_view(),
            Err(FlowError::OutOfOrder {
                next: Step::FetchKyc
            })
        );
    }

    #[test]
    fn extra_verification_only_for_medium_risk() {
        let record = record();

        let session = session_with_risk(RiskLevel::Medium);
        assert_eq!(
            session.extra_verification("abcde1234f", "1990-04-12", Some(&record)),
            Ok(Step::ActivateServices)
        );
        assert_eq!(
            session.extra_verification("ABCDE1234F", "1991-01-01", Some(&record)),
            Err(FlowError::VerificationFailed)
        );
        assert_eq!(
            session.extra_verification("ABCDE1234F", "1990-04-12", None),
            Err(FlowError::VerificationFailed)
        );

        let session = session_with_risk(RiskLevel::High);
        assert_eq!(
            session.extra_verification("ABCDE1234F", "1990-04-12", Some(&record)),
            Err(FlowError::OutOfOrder {
                next: Step::ViewStatus
            })
        );

        let session = with_kyc(&mut rng(), Instant::now());
        assert_eq!(
            session.extra_verification("ABCDE1234F", "1990-04-12", Some(&record)),
            Err(FlowError::OutOfOrder {
                next: Step::RiskCheck
            })
        );
    }

    #[test]
    fn dashboard_pops_new_user_once() {
        let mut session = signed_up(&mut rng(), Instant::now());
        assert_eq!(session.dashboard(), Ok(true));
        assert_eq!(session.dashboard(), Ok(false));

        let mut anonymous = OnboardingSession::default();
        assert_eq!(
            anonymous.dashboard(),
            Err(FlowError::NotLoggedIn {
                next: Step::Register
            })
        );
    }

    #[test]
    fn activate_services_validates_and_dedupes() {
        let mut session = signed_up(&mut rng(), Instant::now());
        let picked = session.activate_services(&[
            "upi".to_string(),
            " debit_card ".to_string(),
            "upi".to_string(),
        ]);
        assert_eq!(
            picked,
            Ok(vec!["upi".to_string(), "debit_card".to_string()])
        );
        assert_eq!(session.services(), ["upi", "debit_card"]);

        assert_eq!(
            session.activate_services(&["gold_loan".to_string()]),
            Err(FlowError::UnknownService("gold_loan".to_string()))
        );
        // a refused selection leaves the previous one in place
        assert_eq!(session.services(), ["upi", "debit_card"]);
    }

    #[test]
    fn view_status_routes_by_review_outcome() {
        let session = signed_up(&mut rng(), Instant::now());
        assert_eq!(
            session.view_status(Some(AccountStatus::Approved)),
            Ok(Step::ActivateServices)
        );
        assert_eq!(
            session.view_status(Some(AccountStatus::Rejected)),
            Ok(Step::Rejected)
        );
        assert_eq!(
            session.view_status(Some(AccountStatus::Pending)),
            Ok(Step::UnderReview)
        );
        assert_eq!(
            OnboardingSession::default().view_status(None),
            Err(FlowError::NotLoggedIn { next: Step::Login })
        );
    }

    #[test]
    fn logout_clears_everything() {
        let mut session = signed_up(&mut rng(), Instant::now());
        assert_eq!(session.logout(), Step::Home);
        assert!(!session.is_logged_in());
        assert_eq!(session.phone(), None);
        assert_eq!(session.mode(), None);
    }
}
