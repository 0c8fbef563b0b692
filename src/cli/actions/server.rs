use crate::digibank::{
    self,
    chat::ChatClient,
    config::FlowConfig,
    session::SessionStore,
    sms::LogSmsSender,
    AppContext,
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub session_ttl_seconds: u64,
    pub otp_ttl_seconds: u64,
    pub admin_token: Option<SecretString>,
    pub openrouter_api_key: Option<SecretString>,
    pub openrouter_url: String,
}

/// Build the shared services from the arguments.
/// # Errors
/// Returns an error if an HTTP client can not be built.
pub fn context(args: &Args) -> Result<AppContext> {
    let config = FlowConfig::new(args.base_url.clone())
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_admin_token(args.admin_token.clone());

    if config.admin_token().is_none() {
        warn!("No admin token configured, admin routes are open");
    }

    if args.openrouter_api_key.is_none() {
        warn!("No OpenRouter API key configured, the chatbot will answer busy");
    }
    let chat = ChatClient::new(&args.openrouter_url, args.openrouter_api_key.clone())?;

    debug!(
        "Sessions expire after {:?}, OTPs after {:?}",
        config.session_ttl(),
        config.otp_ttl()
    );

    Ok(AppContext {
        sessions: Arc::new(SessionStore::new(config.session_ttl())),
        config: Arc::new(config),
        sms: Arc::new(LogSmsSender),
        chat: Arc::new(chat),
    })
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let ctx = context(&args)?;

    digibank::new(args.port, args.dsn, ctx).await
}
