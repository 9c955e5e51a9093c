//! Integration test common infrastructure.
//!
//! The bot is the client here, so the harness plays the IRC server: it
//! listens on loopback, accepts the bot, and speaks raw lines to it.

pub mod server;

#[allow(unused_imports)]
pub use server::{BotSession, FakeServer, bot_settings, start_bot};
