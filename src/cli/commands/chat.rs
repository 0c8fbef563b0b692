use crate::digibank::chat::DEFAULT_OPENROUTER_URL;
use clap::{Arg, Command};

pub const ARG_OPENROUTER_API_KEY: &str = "openrouter-api-key";
pub const ARG_OPENROUTER_URL: &str = "openrouter-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OPENROUTER_API_KEY)
                .long(ARG_OPENROUTER_API_KEY)
                .help("OpenRouter API key; the chatbot answers busy without it")
                .env("DIGIBANK_OPENROUTER_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_OPENROUTER_URL)
                .long(ARG_OPENROUTER_URL)
                .help("OpenRouter API base URL")
                .env("DIGIBANK_OPENROUTER_URL")
                .default_value(DEFAULT_OPENROUTER_URL),
        )
}
