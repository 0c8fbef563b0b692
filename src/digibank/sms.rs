//! OTP delivery abstractions.
//!
//! Handlers build an `SmsMessage` and hand it to an `SmsSender`. The sender
//! decides how to deliver and returns `Ok`/`Err`; on `Err` the OTP stays in
//! the session so the customer can ask for it again.
//!
//! The only sender shipped is `LogSmsSender`, which writes the message to
//! the log instead of texting it.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

impl SmsMessage {
    #[must_use]
    pub fn otp(to: &str, otp: &str) -> Self {
        Self {
            to: to.to_string(),
            body: format!("Your AI Bank OTP is: {otp}"),
        }
    }
}

/// SMS delivery abstraction used by the OTP handler.
pub trait SmsSender: Send + Sync {
    /// Deliver a message or return an error so the caller can retry.
    fn send(&self, message: &SmsMessage) -> Result<()>;
}

/// Sender that logs the message instead of sending a real SMS.
#[derive(Clone, Debug)]
pub struct LogSmsSender;

impl SmsSender for LogSmsSender {
    fn send(&self, message: &SmsMessage) -> Result<()> {
        info!(to = %message.to, body = %message.body, "sms send stub");
        Ok(())
    }
}
