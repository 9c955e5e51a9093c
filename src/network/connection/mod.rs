//! Connection - one bot session on one IRC network.
//!
//! ```text
//!   TcpStream ── Framed<LineCodec> ──┬── SplitStream ──▶ EventLoop ──▶ Registry::dispatch
//!                                    │                      │              (spawned)
//!                                    │                      ▼
//!                                    └── SplitSink ◀── write_loop ◀── Outbound (mpsc)
//!                                                                      ▲
//!                                               handlers, NickServ ────┘
//! ```
//!
//! The event loop never waits on a command: dispatch runs on its own task so a
//! NickServ challenge in flight cannot hold up the reply it is waiting for.

mod context;
mod event_loop;

use event_loop::EventLoop;

use crate::auth::AccountStore;
use crate::commands::Registry;
use crate::config::{Config, ServerConfig};
use crate::error::ConnectionError;
use crate::network::Outbound;
use crate::proto::{IrcLine, LineCodec};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, info_span, trace, warn};

/// Outgoing lines buffered per connection before senders wait.
const OUTBOUND_QUEUE: usize = 256;

/// Per-network session settings.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub nickname: String,
    pub ident: String,
    pub realname: String,
    /// CTCP VERSION reply.
    pub version: Option<String>,
    /// Joined after welcome, or after +r when identifying.
    pub channels: Vec<String>,
    /// Nick of the identity service.
    pub nickserv: String,
    pub nickserv_password: Option<String>,
    /// How long a STATUS challenge may wait for its answer.
    pub challenge_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config, server: &ServerConfig) -> Self {
        Self {
            nickname: config.bot.nickname.clone(),
            ident: config.bot.ident.clone(),
            realname: config.bot.realname.clone(),
            version: config.bot.version.clone(),
            channels: config.channels_for(server).to_vec(),
            nickserv: config.nickserv.nick.clone(),
            nickserv_password: config.nickserv.password.clone(),
            challenge_timeout: config.nickserv.timeout(),
        }
    }
}

type LineSink = SplitSink<Framed<TcpStream, LineCodec>, String>;

/// A running session.
pub struct Connection {
    server: String,
    outbound: Outbound,
    task: JoinHandle<Result<(), ConnectionError>>,
}

impl Connection {
    /// Connect to `server` (`host:port`), register, and start the event loop.
    pub async fn connect(
        server: &str,
        settings: ConnectionSettings,
        registry: Arc<Registry>,
        store: Arc<dyn AccountStore>,
    ) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(server).await?;
        info!(server = %server, nick = %settings.nickname, "Connected");

        let (sink, lines) = Framed::new(stream, LineCodec::new()).split();
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        let writer = tokio::spawn(write_loop(sink, rx));
        let outbound = Outbound::new(tx);

        let event_loop = EventLoop::new(settings, outbound.clone(), registry, store);
        event_loop.register().await?;

        let span = info_span!("connection", server = %server);
        let task = tokio::spawn(
            async move {
                let result = event_loop.run(lines).await;
                writer.abort();
                match &result {
                    Ok(()) => info!("Disconnected"),
                    Err(e) => warn!(error = %e, "Connection lost"),
                }
                result
            }
            .instrument(span),
        );

        Ok(Self {
            server: server.to_string(),
            outbound,
            task,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Whether the event loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Send `QUIT` and wait for the server to close the session.
    pub async fn quit(self, message: Option<&str>) -> Result<(), ConnectionError> {
        if let Err(e) = self.outbound.send(IrcLine::quit(message)).await {
            debug!(server = %self.server, error = %e, "QUIT not sent");
        }
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ConnectionError::Io(std::io::Error::other(e))),
        }
    }
}

/// Drain the outbound queue onto the socket.
async fn write_loop(mut sink: LineSink, mut rx: mpsc::Receiver<IrcLine>) {
    while let Some(line) = rx.recv().await {
        let raw = line.to_string();
        trace!(raw = %raw, "->");
        if let Err(e) = sink.send(raw).await {
            warn!(error = %e, "Write failed");
            break;
        }
    }
}
