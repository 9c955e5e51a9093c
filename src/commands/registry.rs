//! Command registry and multi-match dispatch.
//!
//! The registry is filled during startup through `&mut self` and then shared
//! behind an `Arc`, so no command can be added once lines are flowing.

use super::{Command, CommandBuilder, CommandContext, Message};
use crate::error::CommandError;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span};

/// Prefix used by commands that do not set their own.
pub const DEFAULT_PREFIX: &str = ".";

/// Ordered set of commands.
#[derive(Debug)]
pub struct Registry {
    default_prefix: String,
    commands: Vec<Arc<Command>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_default_prefix(DEFAULT_PREFIX)
    }

    pub fn with_default_prefix(prefix: impl Into<String>) -> Self {
        Self {
            default_prefix: prefix.into(),
            commands: Vec::new(),
        }
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Append a command. The returned handle is for inspection only; there
    /// is no deregistration.
    pub fn register(&mut self, builder: CommandBuilder) -> Result<Arc<Command>, CommandError> {
        let command = Arc::new(builder.build(&self.default_prefix)?);
        debug!(command = %command.name(), "Command registered");
        self.commands.push(Arc::clone(&command));
        Ok(command)
    }

    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Offer `msg` to every command in registration order.
    ///
    /// Every matching command runs, not just the first. Returns how many
    /// handlers ran.
    pub async fn dispatch(&self, msg: &Message, ctx: &dyn CommandContext) -> usize {
        let span = info_span!("dispatch", nick = %msg.source.name, target = %msg.target);
        async {
            let mut fired = 0;
            for command in &self.commands {
                if command.run(msg, ctx).await {
                    debug!(command = %command.name(), "Command executed");
                    fired += 1;
                }
            }
            fired
        }
        .instrument(span)
        .await
    }
}
