//! Inbound line handling for one session.

use super::ConnectionSettings;
use super::context::BotContext;
use crate::auth::{AccountStore, Authorizer, Listeners, NickServOracle};
use crate::commands::{Message, Registry, User};
use crate::error::{ConnectionError, ProtocolError};
use crate::network::Outbound;
use crate::proto::{IrcLine, irc_eq};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Whether the loop keeps reading after a line.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub(super) struct EventLoop {
    settings: ConnectionSettings,
    /// Our nick as the server knows it.
    nick: String,
    registered: bool,
    joined: bool,
    outbound: Outbound,
    listeners: Arc<Listeners>,
    authorizer: Arc<Authorizer>,
    ctx: Arc<BotContext>,
    registry: Arc<Registry>,
}

impl EventLoop {
    pub(super) fn new(
        settings: ConnectionSettings,
        outbound: Outbound,
        registry: Arc<Registry>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        let listeners = Arc::new(Listeners::new());
        let oracle = NickServOracle::new(
            settings.nickserv.clone(),
            settings.challenge_timeout,
            outbound.clone(),
            Arc::clone(&listeners),
        );
        let authorizer = Arc::new(Authorizer::new(Arc::new(oracle), store));
        let ctx = Arc::new(BotContext {
            outbound: outbound.clone(),
            authorizer: Arc::clone(&authorizer),
        });

        Self {
            nick: settings.nickname.clone(),
            settings,
            registered: false,
            joined: false,
            outbound,
            listeners,
            authorizer,
            ctx,
            registry,
        }
    }

    /// Send the NICK/USER pair.
    pub(super) async fn register(&self) -> Result<(), ConnectionError> {
        self.outbound.send(IrcLine::change_nick(&self.nick)).await?;
        self.outbound
            .send(IrcLine::user(&self.settings.ident, &self.settings.realname))
            .await
    }

    /// Read until EOF, `ERROR`, or a failure. The authorization cache does
    /// not outlive the session.
    pub(super) async fn run<S>(mut self, mut lines: S) -> Result<(), ConnectionError>
    where
        S: Stream<Item = Result<String, ProtocolError>> + Unpin,
    {
        let result = loop {
            let raw = match lines.next().await {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => break Err(ConnectionError::from(e)),
                None => {
                    info!("Server closed the connection");
                    break Ok(());
                }
            };
            trace!(raw = %raw, "<-");

            let line = match raw.parse::<IrcLine>() {
                Ok(line) => line,
                Err(e) => {
                    debug!(error = %e, "Ignoring unparsable line");
                    continue;
                }
            };

            match self.handle(line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.authorizer.clear();
        result
    }

    async fn handle(&mut self, line: IrcLine) -> Result<Flow, ConnectionError> {
        match line.command.as_str() {
            "PING" => {
                let token = line.param(0).unwrap_or_default();
                self.outbound.send(IrcLine::pong(token)).await?;
            }
            "001" => self.on_welcome(&line).await?,
            "433" if !self.registered => self.on_nick_in_use().await?,
            "MODE" => self.on_mode(&line).await?,
            "NICK" => self.on_nick(&line),
            "PART" | "QUIT" => {
                if let Some(nick) = line.nick() {
                    self.authorizer.invalidate(nick);
                }
            }
            "KICK" => {
                if let Some(nick) = line.param(1) {
                    self.authorizer.invalidate(nick);
                }
            }
            "PRIVMSG" | "NOTICE" => {
                self.listeners.notify(&line);
                if line.command == "PRIVMSG" {
                    self.on_privmsg(&line).await?;
                }
            }
            "ERROR" => {
                info!(reason = line.text().unwrap_or_default(), "Server sent ERROR");
                return Ok(Flow::Stop);
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    async fn on_welcome(&mut self, line: &IrcLine) -> Result<(), ConnectionError> {
        self.registered = true;
        if let Some(me) = line.param(0) {
            self.nick = me.to_string();
        }
        info!(nick = %self.nick, "Registered");

        if let Some(password) = &self.settings.nickserv_password {
            debug!(service = %self.settings.nickserv, "Identifying");
            self.outbound
                .privmsg(&self.settings.nickserv, &format!("IDENTIFY {password}"))
                .await
        } else {
            self.autojoin().await
        }
    }

    async fn on_nick_in_use(&mut self) -> Result<(), ConnectionError> {
        warn!(nick = %self.nick, "Nickname in use, retrying");
        self.nick.push('_');
        self.outbound.send(IrcLine::change_nick(&self.nick)).await
    }

    async fn on_mode(&mut self, line: &IrcLine) -> Result<(), ConnectionError> {
        let (Some(target), Some(modes)) = (line.param(0), line.param(1)) else {
            return Ok(());
        };
        if irc_eq(target, &self.nick) && adds_mode(modes, 'r') && !self.joined {
            info!("Identified to services");
            self.autojoin().await?;
        }
        Ok(())
    }

    fn on_nick(&mut self, line: &IrcLine) {
        let (Some(old), Some(new)) = (line.nick(), line.param(0)) else {
            return;
        };
        if irc_eq(old, &self.nick) {
            info!(old = %old, new = %new, "Own nick changed");
            self.nick = new.to_string();
        }
        self.authorizer.invalidate(old);
        self.authorizer.invalidate(new);
    }

    async fn on_privmsg(&self, line: &IrcLine) -> Result<(), ConnectionError> {
        if line.params.len() < 2 {
            return Ok(());
        }
        let (Some(nick), Some(target), Some(text)) = (line.nick(), line.param(0), line.text())
        else {
            return Ok(());
        };

        if let Some(ctcp) = text.strip_prefix('\x01') {
            if !line.is_public() {
                self.on_ctcp(nick, ctcp.trim_end_matches('\x01')).await?;
            }
            return Ok(());
        }

        let public = line.is_public();
        let msg = Message {
            content: text.to_string(),
            source: User::from_nick(nick),
            public,
            target: if public { target } else { nick }.to_string(),
        };

        let registry = Arc::clone(&self.registry);
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            registry.dispatch(&msg, &*ctx).await;
        });
        Ok(())
    }

    async fn on_ctcp(&self, nick: &str, body: &str) -> Result<(), ConnectionError> {
        if body == "VERSION"
            && let Some(version) = &self.settings.version
        {
            match IrcLine::notice(nick, &format!("\x01VERSION {version}\x01")) {
                Ok(reply) => self.outbound.send(reply).await?,
                Err(error) => debug!(%error, "Not answering CTCP VERSION"),
            }
        }
        Ok(())
    }

    async fn autojoin(&mut self) -> Result<(), ConnectionError> {
        self.joined = true;
        if self.settings.channels.is_empty() {
            return Ok(());
        }
        info!(channels = ?self.settings.channels, "Joining channels");
        for channel in &self.settings.channels {
            match IrcLine::join(channel) {
                Ok(join) => self.outbound.send(join).await?,
                Err(error) => warn!(%channel, %error, "Skipping channel"),
            }
        }
        Ok(())
    }
}

/// Whether a mode string such as `+iw-x+r` sets `mode`.
fn adds_mode(modes: &str, mode: char) -> bool {
    let mut adding = true;
    let mut found = false;
    for c in modes.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            c if c == mode => found = adding,
            _ => {}
        }
    }
    found
}
