//! Command definitions and the per-command match rule.

use super::{CommandContext, Handler, Message, tokenize};
use crate::auth::Permission;
use crate::error::CommandError;
use std::fmt;
use std::sync::Arc;

/// Computes a command's full trigger (prefix and name) for a given line.
pub type PrefixFn = Arc<dyn Fn(&Message) -> String + Send + Sync>;

enum Trigger {
    Static(String),
    Dynamic(PrefixFn),
}

/// A registered command. Immutable once built.
pub struct Command {
    name: String,
    trigger: Trigger,
    allow_no_whitespace: bool,
    min_args: usize,
    max_args: usize,
    permission: Option<Permission>,
    handler: Arc<dyn Handler>,
}

impl Command {
    /// Start building a command called `name`.
    pub fn builder(name: impl Into<String>, handler: impl Handler + 'static) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            handler: Arc::new(handler),
            prefix: None,
            prefix_fn: None,
            allow_no_whitespace: false,
            min_args: 0,
            max_args: 0,
            permission: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> (usize, usize) {
        (self.min_args, self.max_args)
    }

    pub fn permission(&self) -> Option<&Permission> {
        self.permission.as_ref()
    }

    pub fn allows_no_whitespace(&self) -> bool {
        self.allow_no_whitespace
    }

    fn trigger_for(&self, msg: &Message) -> String {
        match &self.trigger {
            Trigger::Static(trigger) => trigger.clone(),
            Trigger::Dynamic(f) => f(msg),
        }
    }

    /// Apply the prefix, whitespace and arity rules.
    ///
    /// Returns the parsed arguments when the line is addressed to this
    /// command. Permission is not considered here.
    pub fn parse(&self, msg: &Message) -> Option<Vec<String>> {
        let trigger = self.trigger_for(msg);
        let remainder = msg.content.strip_prefix(trigger.as_str())?;

        if let Some(first) = remainder.chars().next()
            && !first.is_whitespace()
            && !self.allow_no_whitespace
        {
            return None;
        }

        let args = tokenize(remainder);
        if args.len() < self.min_args || args.len() > self.max_args {
            return None;
        }
        Some(args)
    }

    /// Run the full match rule and, if it passes, the handler.
    ///
    /// Returns whether the handler ran.
    pub async fn run(&self, msg: &Message, ctx: &dyn CommandContext) -> bool {
        let Some(args) = self.parse(msg) else {
            return false;
        };

        if let Some(permission) = &self.permission
            && !ctx.authorize(&msg.source, permission).await
        {
            tracing::debug!(
                command = %self.name,
                nick = %msg.source.name,
                permission = %permission,
                "Permission check failed"
            );
            return false;
        }

        ctx.execute(self.handler.as_ref(), msg, &args).await;
        true
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trigger = match &self.trigger {
            Trigger::Static(t) => t.as_str(),
            Trigger::Dynamic(_) => "<dynamic>",
        };
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("trigger", &trigger)
            .field("allow_no_whitespace", &self.allow_no_whitespace)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Options for a new command. Consumed by [`Registry::register`].
///
/// Defaults: registry prefix, no arguments, whitespace required after the
/// name, no permission.
///
/// [`Registry::register`]: super::Registry::register
pub struct CommandBuilder {
    name: String,
    handler: Arc<dyn Handler>,
    prefix: Option<String>,
    prefix_fn: Option<PrefixFn>,
    allow_no_whitespace: bool,
    min_args: usize,
    max_args: usize,
    permission: Option<Permission>,
}

impl CommandBuilder {
    /// Exactly `n` arguments.
    pub fn args(mut self, n: usize) -> Self {
        self.min_args = n;
        self.max_args = n;
        self
    }

    /// Between `min` and `max` arguments, inclusive.
    pub fn var_args(mut self, min: usize, max: usize) -> Self {
        self.min_args = min;
        self.max_args = max;
        self
    }

    /// Accept text directly after the name, e.g. `.rollxd20` for `roll`.
    pub fn allow_no_whitespace(mut self) -> Self {
        self.allow_no_whitespace = true;
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Override the registry's default prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Compute the whole trigger per line. Takes precedence over `prefix`.
    pub fn prefix_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Message) -> String + Send + Sync + 'static,
    {
        self.prefix_fn = Some(Arc::new(f));
        self
    }

    pub(super) fn build(self, default_prefix: &str) -> Result<Command, CommandError> {
        if self.min_args > self.max_args {
            return Err(CommandError::InvalidArity {
                min: self.min_args,
                max: self.max_args,
            });
        }

        let trigger = match self.prefix_fn {
            Some(f) => Trigger::Dynamic(f),
            None if self.name.is_empty() => return Err(CommandError::EmptyName),
            None => {
                let prefix = self.prefix.as_deref().unwrap_or(default_prefix);
                Trigger::Static(format!("{prefix}{}", self.name))
            }
        };

        Ok(Command {
            name: self.name,
            trigger,
            allow_no_whitespace: self.allow_no_whitespace,
            min_args: self.min_args,
            max_args: self.max_args,
            permission: self.permission,
            handler: self.handler,
        })
    }
}
