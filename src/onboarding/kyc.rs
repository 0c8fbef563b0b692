//! DigiLocker records, KYC profiles and phone matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A row of the simulated DigiLocker directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigiLockerRecord {
    pub aadhaar: String,
    pub mobile: String,
    pub name: String,
    pub dob: String,
    pub pan: String,
}

impl DigiLockerRecord {
    /// PAN is compared case-insensitively, DOB verbatim after trimming.
    #[must_use]
    pub fn matches_identity(&self, pan: &str, dob: &str) -> bool {
        self.pan.trim().eq_ignore_ascii_case(pan.trim()) && self.dob.trim() == dob.trim()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KycProfile {
    pub name: String,
    pub dob: String,
    pub pan: String,
    pub aadhaar: String,
}

impl From<&DigiLockerRecord> for KycProfile {
    fn from(record: &DigiLockerRecord) -> Self {
        Self {
            name: record.name.clone(),
            dob: record.dob.clone(),
            pan: record.pan.clone(),
            aadhaar: record.aadhaar.clone(),
        }
    }
}

/// What the client gets to see of a fetched profile.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KycView {
    pub name: String,
    pub dob: String,
    pub pan: String,
    pub aadhaar: String,
}

impl From<&KycProfile> for KycView {
    fn from(profile: &KycProfile) -> Self {
        Self {
            name: profile.name.clone(),
            dob: profile.dob.clone(),
            pan: profile.pan.clone(),
            aadhaar: mask_aadhaar(&profile.aadhaar),
        }
    }
}

/// Keep the last four digits: `XXXX-XXXX-1234`.
#[must_use]
pub fn mask_aadhaar(aadhaar: &str) -> String {
    let digits: Vec<char> = aadhaar.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("XXXX-XXXX-{tail}")
}

/// Country code assumed for numbers written without one.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Canonical E.164 key for a phone number, used for accounts and the
/// DigiLocker directory alike.
///
/// Spaces, dashes and brackets are dropped, then an optional `+` and 10 to
/// 15 digits are accepted. Ten digits, or eleven with a trunk `0`, are
/// national numbers and get [`DEFAULT_COUNTRY_CODE`]; anything longer
/// already carries its country code.
#[must_use]
pub fn normalize_phone(phone: &str) -> Option<String> {
    let compact: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let (international, digits) = match compact.strip_prefix('+') {
        Some(digits) => (true, digits),
        None => (false, compact.as_str()),
    };

    if !Regex::new(r"^[0-9]{10,15}$").map_or(false, |re| re.is_match(digits)) {
        return None;
    }

    Some(match digits.len() {
        _ if international => format!("+{digits}"),
        10 => format!("+{DEFAULT_COUNTRY_CODE}{digits}"),
        11 if digits.starts_with('0') => format!("+{DEFAULT_COUNTRY_CODE}{}", &digits[1..]),
        _ => format!("+{digits}"),
    })
}

/// Same customer when both numbers share a canonical key.
#[must_use]
pub fn phones_match(a: &str, b: &str) -> bool {
    matches!(
        (normalize_phone(a), normalize_phone(b)),
        (Some(a), Some(b)) if a == b
    )
}
