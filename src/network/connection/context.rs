//! What commands see of a connection.

use crate::auth::{Authorizer, Permission};
use crate::commands::{CommandContext, Handler, Message, User};
use crate::error::{HandlerError, HandlerResult};
use crate::network::Outbound;
use crate::proto::IrcLine;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// [`CommandContext`] backed by a live connection.
pub(super) struct BotContext {
    pub(super) outbound: Outbound,
    pub(super) authorizer: Arc<Authorizer>,
}

#[async_trait]
impl CommandContext for BotContext {
    async fn execute(&self, handler: &dyn Handler, msg: &Message, args: &[String]) {
        if let Err(e) = handler.handle(self, msg, args).await {
            warn!(
                nick = %msg.source.name,
                error = %e,
                code = e.error_code(),
                "Command handler failed"
            );
        }
    }

    async fn authorize(&self, user: &User, permission: &Permission) -> bool {
        self.authorizer.authorize(&user.name, permission).await
    }

    async fn send_to_user(&self, user: &User, text: &str) -> HandlerResult {
        self.outbound.send(reply(&user.name, text)?).await?;
        Ok(())
    }

    async fn send_to_channel(&self, channel: &str, text: &str) -> HandlerResult {
        self.outbound.send(reply(channel, text)?).await?;
        Ok(())
    }
}

fn reply(target: &str, text: &str) -> Result<IrcLine, HandlerError> {
    IrcLine::privmsg(target, text).map_err(|_| HandlerError::InvalidTarget(target.to_string()))
}
