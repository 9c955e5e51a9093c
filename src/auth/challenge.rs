//! NickServ STATUS challenge.
//!
//! The only way to learn whether a nick is identified is to ask NickServ over
//! the same connection and pick its answer out of the inbound stream:
//!
//! ```text
//! bot      -> NickServ : STATUS alice
//! NickServ -> bot      : STATUS alice 3
//! ```
//!
//! Status `3` means registered and identified; anything else, or no answer
//! before the deadline, means not verified. The reply is matched by a
//! temporary [`Listeners`] entry that the event loop feeds every line, and is
//! handed to the waiting task through a oneshot channel.

use crate::network::Outbound;
use crate::proto::{IrcLine, irc_eq};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// NickServ status code for "registered and identified".
pub const STATUS_IDENTIFIED: u8 = 3;

/// `STATUS <nick> <code>`, optionally followed by the account name (Anope).
static STATUS_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^STATUS (\S+) (\d)(?: \S+)?$").expect("STATUS reply regex is valid")
});

/// Something that can tell whether a nick is currently identified.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    async fn verify(&self, nick: &str) -> bool;
}

type LineListener = Arc<dyn Fn(&IrcLine) + Send + Sync>;

/// Temporary inbound-line listeners.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: DashMap<u64, LineListener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. It stays registered until the handle is removed or dropped.
    pub fn register<F>(self: &Arc<Self>, listener: F) -> ListenerHandle
    where
        F: Fn(&IrcLine) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(id, Arc::new(listener));
        ListenerHandle {
            id,
            listeners: Arc::clone(self),
        }
    }

    /// Offer `line` to every live listener.
    pub fn notify(&self, line: &IrcLine) {
        // Snapshot first so no shard lock is held while listeners run.
        let snapshot: Vec<LineListener> = self
            .entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in snapshot {
            listener(line);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registration of one listener. Unregisters exactly once, on `remove` or drop.
pub struct ListenerHandle {
    id: u64,
    listeners: Arc<Listeners>,
}

impl ListenerHandle {
    pub fn remove(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.listeners.entries.remove(&self.id);
    }
}

/// Parse a NickServ STATUS reply about `nick`.
///
/// Only private PRIVMSG or NOTICE lines from `service` count.
pub fn parse_status_reply(line: &IrcLine, service: &str, nick: &str) -> Option<u8> {
    if line.command != "PRIVMSG" && line.command != "NOTICE" {
        return None;
    }
    if !line.nick().is_some_and(|from| irc_eq(from, service)) || line.is_public() {
        return None;
    }
    let caps = STATUS_REPLY.captures(line.text()?)?;
    if !irc_eq(&caps[1], nick) {
        return None;
    }
    caps[2].parse().ok()
}

/// [`IdentityOracle`] backed by NickServ on the live connection.
pub struct NickServOracle {
    service: String,
    timeout: Duration,
    outbound: Outbound,
    listeners: Arc<Listeners>,
}

impl NickServOracle {
    pub fn new(
        service: impl Into<String>,
        timeout: Duration,
        outbound: Outbound,
        listeners: Arc<Listeners>,
    ) -> Self {
        Self {
            service: service.into(),
            timeout,
            outbound,
            listeners,
        }
    }
}

#[async_trait]
impl IdentityOracle for NickServOracle {
    async fn verify(&self, nick: &str) -> bool {
        let (tx, rx) = oneshot::channel::<bool>();
        let slot = Mutex::new(Some(tx));
        let service = self.service.clone();
        let target = nick.to_string();

        // Listen before asking so a fast reply cannot slip past.
        let handle = self.listeners.register(move |line| {
            let Some(status) = parse_status_reply(line, &service, &target) else {
                return;
            };
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(status == STATUS_IDENTIFIED);
            }
        });

        if let Err(e) = self
            .outbound
            .privmsg(&self.service, &format!("STATUS {nick}"))
            .await
        {
            warn!(nick = %nick, error = %e, "Failed to send STATUS request");
            return false;
        }

        let verified = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!(nick = %nick, timeout = ?self.timeout, "NickServ STATUS timed out");
                false
            }
        };
        handle.remove();

        debug!(nick = %nick, verified, "NickServ STATUS answered");
        verified
    }
}
