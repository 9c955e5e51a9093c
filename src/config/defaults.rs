//! Default value functions for configuration.

use crate::commands::DEFAULT_PREFIX;

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_ident() -> String {
    "slircbot".to_string()
}

pub fn default_realname() -> String {
    "slircbot".to_string()
}

pub fn default_command_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

// =============================================================================
// NickServ Defaults
// =============================================================================

pub fn default_nickserv_nick() -> String {
    "NickServ".to_string()
}

/// Seconds to wait for a STATUS reply.
pub fn default_nickserv_timeout() -> u64 {
    15
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "slircbot.db".to_string()
}
