//! Fake IRC server.

use slirc_bot::auth::AccountStore;
use slirc_bot::commands::{Registry, builtin};
use slirc_bot::network::{Connection, ConnectionSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// Loopback listener the bot connects to.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn address(&self) -> String {
        self.listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default()
    }

    /// Accept the next bot connection.
    pub async fn accept(&self) -> anyhow::Result<BotSession> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(BotSession {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }
}

/// Server side of one bot connection.
pub struct BotSession {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl BotSession {
    /// Send a raw IRC line to the bot.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the bot, without the line ending.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("bot closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read lines until `predicate` matches, returning all of them.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Assert the bot sends nothing for `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) {
        if let Ok(line) = self.recv_timeout(dur).await {
            panic!("expected silence, bot sent {line:?}");
        }
    }

    /// Consume NICK/USER, send the welcome, and wait for the first JOIN.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<()> {
        assert_eq!(self.recv().await?, format!("NICK {nick}"));
        assert!(self.recv().await?.starts_with("USER "));
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await?;
        self.recv_until(|line| line.starts_with("JOIN ")).await?;
        Ok(())
    }

    /// Play NickServ: expect a STATUS request for `nick` and answer with `code`.
    pub async fn answer_status(&mut self, nick: &str, code: u8) -> anyhow::Result<()> {
        assert_eq!(self.recv().await?, format!("PRIVMSG NickServ :STATUS {nick}"));
        self.send_raw(&format!(
            ":NickServ!NickServ@services.test NOTICE bot :STATUS {nick} {code}"
        ))
        .await
    }
}

/// Settings for a bot named `bot` joining `#test`.
pub fn bot_settings(challenge_timeout: Duration) -> ConnectionSettings {
    ConnectionSettings {
        nickname: "bot".to_string(),
        ident: "bot".to_string(),
        realname: "Test Bot".to_string(),
        version: None,
        channels: vec!["#test".to_string()],
        nickserv: "NickServ".to_string(),
        nickserv_password: None,
        challenge_timeout,
    }
}

/// Connect a bot with the built-in commands and return both ends, welcomed.
pub async fn start_bot(
    server: &FakeServer,
    settings: ConnectionSettings,
    store: Arc<dyn AccountStore>,
) -> anyhow::Result<(Connection, BotSession)> {
    let mut registry = Registry::new();
    builtin::register_defaults(&mut registry)?;

    let nick = settings.nickname.clone();
    let connection =
        Connection::connect(&server.address(), settings, Arc::new(registry), store).await?;
    let mut session = server.accept().await?;
    session.welcome(&nick).await?;
    Ok((connection, session))
}
