//! Chat command handling.
//!
//! Commands are registered into a [`Registry`] once at startup, then every
//! inbound chat line is offered to every command in registration order.
//! Several commands may fire for the same line.
//!
//! ## Match Rule
//!
//! A command fires when all of these hold:
//! 1. the line starts with its prefix (static, or computed per line)
//! 2. the remainder is empty, starts with whitespace, or the command accepts
//!    text glued to its name
//! 3. the tokenized remainder has between `min` and `max` arguments
//! 4. the sender holds the command's permission, if it has one
//!
//! A failed rule is silent. The sender cannot tell a denied command from one
//! that does not exist.

pub mod builtin;
mod command;
mod registry;
mod tokenizer;

pub use command::{Command, CommandBuilder, PrefixFn};
pub use registry::{DEFAULT_PREFIX, Registry};
pub use tokenizer::tokenize;

use crate::auth::Permission;
use crate::error::HandlerResult;
use async_trait::async_trait;

/// The sender of a chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Application account id, when already known.
    pub id: Option<i64>,
    /// Current nickname on the connection.
    pub name: String,
    pub display_name: Option<String>,
}

impl User {
    pub fn from_nick(nick: impl Into<String>) -> Self {
        Self {
            id: None,
            name: nick.into(),
            display_name: None,
        }
    }
}

/// A chat line as seen by commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content: String,
    pub source: User,
    /// Sent to a channel rather than privately to the bot.
    pub public: bool,
    /// Where replies go: the channel for public lines, the sender otherwise.
    pub target: String,
}

/// A command implementation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &dyn CommandContext,
        msg: &Message,
        args: &[String],
    ) -> HandlerResult;
}

/// What a connection offers to commands.
///
/// Handlers never see the authorization cache or the registry, only these
/// operations.
#[async_trait]
pub trait CommandContext: Send + Sync {
    /// Run a handler. All dispatch goes through here.
    async fn execute(&self, handler: &dyn Handler, msg: &Message, args: &[String]);

    /// Whether `user` currently holds `permission`.
    async fn authorize(&self, user: &User, permission: &Permission) -> bool;

    async fn send_to_user(&self, user: &User, text: &str) -> HandlerResult;

    async fn send_to_channel(&self, channel: &str, text: &str) -> HandlerResult;
}
