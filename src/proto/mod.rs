//! Minimal IRC client wire layer.
//!
//! - [`line`]: newline-delimited tokio codec
//! - [`message`]: owned line parsing and serialization
//! - [`casemap`]: RFC 1459 nick comparison

pub mod casemap;
pub mod line;
pub mod message;

pub use casemap::{irc_eq, irc_to_lower};
pub use line::LineCodec;
pub use message::{IrcLine, Prefix, is_channel_name, is_valid_target};
