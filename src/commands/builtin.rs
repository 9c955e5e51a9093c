//! Commands every bot ships with.

use super::{Command, CommandContext, Handler, Message, Registry};
use crate::error::{CommandError, HandlerResult};
use async_trait::async_trait;

/// Permission required by `say`.
pub const SAY_PERMISSION: &str = "say";

/// `hello` - greet the channel.
pub struct HelloHandler;

#[async_trait]
impl Handler for HelloHandler {
    async fn handle(
        &self,
        ctx: &dyn CommandContext,
        msg: &Message,
        _args: &[String],
    ) -> HandlerResult {
        ctx.send_to_channel(&msg.target, "Hello world!").await
    }
}

/// `echo <text...>` - repeat the arguments back.
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(
        &self,
        ctx: &dyn CommandContext,
        msg: &Message,
        args: &[String],
    ) -> HandlerResult {
        ctx.send_to_channel(&msg.target, &args.join(" ")).await
    }
}

/// `say <target> <text>` - speak somewhere else as the bot.
pub struct SayHandler;

#[async_trait]
impl Handler for SayHandler {
    async fn handle(
        &self,
        ctx: &dyn CommandContext,
        _msg: &Message,
        args: &[String],
    ) -> HandlerResult {
        let [target, text] = args else {
            return Ok(());
        };
        ctx.send_to_channel(target, text).await
    }
}

/// Register the built-in commands.
pub fn register_defaults(registry: &mut Registry) -> Result<(), CommandError> {
    registry.register(Command::builder("hello", HelloHandler))?;
    registry.register(Command::builder("echo", EchoHandler).var_args(1, 32))?;
    registry.register(
        Command::builder("say", SayHandler)
            .args(2)
            .permission(SAY_PERMISSION),
    )?;
    Ok(())
}
