//! Runtime settings shared by the HTTP handlers.

use secrecy::SecretString;
use std::time::Duration;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 60;
const DEFAULT_OTP_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Clone, Debug)]
pub struct FlowConfig {
    base_url: String,
    session_ttl_seconds: u64,
    otp_ttl_seconds: u64,
    admin_token: Option<SecretString>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string())
    }
}

impl FlowConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            admin_token: None,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: u64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_admin_token(mut self, token: Option<SecretString>) -> Self {
        self.admin_token = token;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_seconds)
    }

    #[must_use]
    pub fn admin_token(&self) -> Option<&SecretString> {
        self.admin_token.as_ref()
    }

    /// Only mark cookies secure when the service is reached over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}
