//! # Digibank (digital bank onboarding)
//!
//! `digibank` walks a new customer from a phone number to an active account
//! over a JSON API. Every step answers with the path of the next step, so a
//! thin client only has to follow `next`.
//!
//! ## Flow
//!
//! 1. **Phone:** `register` (or `login`) records the phone, `send-otp` texts
//!    a six digit code and `verify-otp` checks it. Codes expire after five
//!    minutes and allow five attempts.
//! 2. **DigiLocker:** the customer links a simulated DigiLocker account by
//!    Aadhaar or mobile number, confirms a second OTP and consents to share
//!    name, date of birth, PAN and Aadhaar.
//! 3. **Risk:** a score from identity mismatch, account age and random
//!    device and location signals. `LOW` is approved at once, `MEDIUM` must
//!    confirm PAN and date of birth, `HIGH` waits for a reviewer.
//! 4. **Services:** approved customers pick the products to activate.
//!
//! Flow state lives in a server-side session behind an `HttpOnly` cookie;
//! accounts and the DigiLocker directory live in Postgres.

pub mod cli;
pub mod digibank;
pub mod onboarding;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
