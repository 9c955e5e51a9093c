//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::proto::is_valid_target;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bot.nickname is required")]
    MissingNickname,
    #[error("at least one [[servers]] entry is required")]
    NoServers,
    #[error("servers[{0}].address is empty")]
    EmptyServerAddress(usize),
    #[error("nickserv.timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error("nickserv.nick is required")]
    MissingNickServ,
    #[error("channel {0:?} is not a valid channel name")]
    InvalidChannel(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bot.nickname.trim().is_empty() {
        errors.push(ValidationError::MissingNickname);
    }

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }
    for (i, server) in config.servers.iter().enumerate() {
        if server.address.trim().is_empty() {
            errors.push(ValidationError::EmptyServerAddress(i));
        }
    }

    let server_channels = config.servers.iter().filter_map(|s| s.channels.as_deref());
    for channel in std::iter::once(config.channels.as_slice())
        .chain(server_channels)
        .flatten()
    {
        if !is_valid_target(channel) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if config.nickserv.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.nickserv.nick.trim().is_empty() {
        errors.push(ValidationError::MissingNickServ);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
