//! Authorization for permission-gated commands.
//!
//! ```text
//! authorize(nick, perm)
//!   cache: Linked(account) ──────────────────────────────┐
//!   cache: Verified ─────────────── find_linked_account ─┤
//!   cache: miss ── NickServ STATUS ─┬─ not identified: deny, cache nothing
//!                                   └─ identified: cache Verified,
//!                                      find_linked_account ─┤
//!                                                           └─ effective_permissions ∋ perm?
//! ```
//!
//! Store failures are logged and count as a denial. Nothing here ever reports
//! back to the sender.

mod cache;
mod challenge;

pub use cache::{AuthCache, CacheEntry};
pub use challenge::{
    IdentityOracle, ListenerHandle, Listeners, NickServOracle, STATUS_IDENTIFIED,
    parse_status_reply,
};

use crate::db::{Account, Database, DbError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named permission, compared by exact name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Permission {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The read side of the account store.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_linked_account(&self, nick: &str) -> Result<Option<Account>, DbError>;

    async fn effective_permissions(&self, account: &Account)
    -> Result<BTreeSet<Permission>, DbError>;
}

#[async_trait]
impl AccountStore for Database {
    async fn find_linked_account(&self, nick: &str) -> Result<Option<Account>, DbError> {
        self.accounts().find_linked_account(nick).await
    }

    async fn effective_permissions(
        &self,
        account: &Account,
    ) -> Result<BTreeSet<Permission>, DbError> {
        self.accounts().effective_permissions(account).await
    }
}

/// Per-connection authorization state.
pub struct Authorizer {
    cache: AuthCache,
    oracle: Arc<dyn IdentityOracle>,
    store: Arc<dyn AccountStore>,
}

impl Authorizer {
    pub fn new(oracle: Arc<dyn IdentityOracle>, store: Arc<dyn AccountStore>) -> Self {
        Self {
            cache: AuthCache::new(),
            oracle,
            store,
        }
    }

    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }

    /// Whether `nick` currently holds `permission`.
    pub async fn authorize(&self, nick: &str, permission: &Permission) -> bool {
        let generation = self.cache.generation();

        let account = match self.cache.get(nick) {
            Some(CacheEntry::Linked(account)) => account,
            Some(CacheEntry::Verified) => match self.link(nick, generation).await {
                Some(account) => account,
                None => return false,
            },
            None => {
                if !self.oracle.verify(nick).await {
                    debug!(nick = %nick, "Identity not verified");
                    return false;
                }
                if !self.cache.insert(nick, CacheEntry::Verified, generation) {
                    debug!(nick = %nick, "Nick changed during verification");
                    return false;
                }
                match self.link(nick, generation).await {
                    Some(account) => account,
                    None => return false,
                }
            }
        };

        match self.store.effective_permissions(&account).await {
            Ok(permissions) => permissions.contains(permission),
            Err(e) => {
                warn!(
                    nick = %nick,
                    account = %account.username,
                    error = %e,
                    "Failed to fetch permissions"
                );
                false
            }
        }
    }

    /// Look up the account linked to a verified nick and cache it.
    async fn link(&self, nick: &str, generation: u64) -> Option<Account> {
        match self.store.find_linked_account(nick).await {
            Ok(Some(account)) => {
                if !self
                    .cache
                    .insert(nick, CacheEntry::Linked(account.clone()), generation)
                {
                    debug!(nick = %nick, "Nick changed during account lookup");
                    return None;
                }
                Some(account)
            }
            Ok(None) => {
                debug!(nick = %nick, "No account linked");
                None
            }
            Err(e) => {
                warn!(nick = %nick, error = %e, "Failed to look up linked account");
                None
            }
        }
    }

    /// Drop whatever is known about `nick` (rename, part, quit, kick).
    pub fn invalidate(&self, nick: &str) {
        if self.cache.remove(nick) {
            debug!(nick = %nick, "Authorization cache entry invalidated");
        }
    }

    /// Drop everything (disconnect).
    pub fn clear(&self) {
        self.cache.clear();
    }
}
