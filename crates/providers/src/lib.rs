//! Chat-completion provider implementations for RideDesk.
//!
//! All providers implement the `ridedesk_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use ridedesk_config::{AppConfig, ConfigError};

/// Build the completion provider described by the configuration.
///
/// Fails when no OpenAI API key is available.
pub fn from_config(config: &AppConfig) -> Result<OpenAiCompatProvider, ConfigError> {
    let api_key = config.require_openai_key()?;
    Ok(OpenAiCompatProvider::new(
        "openai",
        config.openai_api_url.clone(),
        api_key,
    ))
}
