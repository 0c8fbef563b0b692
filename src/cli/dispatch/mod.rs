//! Map parsed arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{chat, ARG_ADMIN_TOKEN, ARG_BASE_URL, ARG_OTP_TTL, ARG_SESSION_TTL};
use crate::digibank::chat::DEFAULT_OPENROUTER_URL;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let secret = |arg: &str| {
        matches
            .get_one::<String>(arg)
            .map(|value| SecretString::from(value.clone()))
    };

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url: matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:8080".to_string()),
        session_ttl_seconds: matches.get_one::<u64>(ARG_SESSION_TTL).copied().unwrap_or(1800),
        otp_ttl_seconds: matches.get_one::<u64>(ARG_OTP_TTL).copied().unwrap_or(300),
        admin_token: secret(ARG_ADMIN_TOKEN),
        openrouter_api_key: secret(chat::ARG_OPENROUTER_API_KEY),
        openrouter_url: matches
            .get_one::<String>(chat::ARG_OPENROUTER_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_OPENROUTER_URL.to_string()),
    }))
}
