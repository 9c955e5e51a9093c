//! Per-connection nick → account cache.
//!
//! Lookups take a shared lock and never block each other; inserts and
//! invalidations take it exclusively. Keys are RFC 1459 folded nicks.
//!
//! Every invalidation bumps a generation counter and remembers, per nick, when
//! it happened. An authorization that read the generation before the nick was
//! invalidated has its write refused, so a rename or quit racing an in-flight
//! NickServ challenge cannot leave a binding for a nick that now belongs to
//! someone else.

use crate::db::Account;
use crate::proto::irc_to_lower;
use parking_lot::RwLock;
use std::collections::HashMap;

/// What is known about a nick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Identified to NickServ, no linked account (yet).
    Verified,
    /// Identified and linked.
    Linked(Account),
}

/// Invalidations remembered per nick. Writes older than this are refused outright.
const HISTORY: u64 = 1024;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    generation: u64,
    /// Generation at which each nick was last invalidated.
    invalidated: HashMap<String, u64>,
    /// Generation of the last full clear.
    cleared_at: u64,
}

impl Inner {
    fn is_stale(&self, key: &str, since: u64) -> bool {
        since < self.cleared_at
            || self.generation.saturating_sub(since) > HISTORY
            || self.invalidated.get(key).is_some_and(|&g| g > since)
    }
}

#[derive(Default)]
pub struct AuthCache {
    inner: RwLock<Inner>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nick: &str) -> Option<CacheEntry> {
        self.inner.read().entries.get(&irc_to_lower(nick)).cloned()
    }

    /// Current generation; pass it back to [`insert`](Self::insert).
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Store `entry` unless `nick` was invalidated since `generation` was read.
    ///
    /// Returns whether the entry was written.
    pub fn insert(&self, nick: &str, entry: CacheEntry, generation: u64) -> bool {
        let key = irc_to_lower(nick);
        let mut inner = self.inner.write();
        if inner.is_stale(&key, generation) {
            return false;
        }
        inner.entries.insert(key, entry);
        true
    }

    /// Forget `nick`. Returns whether an entry existed.
    pub fn remove(&self, nick: &str) -> bool {
        let key = irc_to_lower(nick);
        let mut inner = self.inner.write();
        inner.generation += 1;
        let generation = inner.generation;

        if inner.invalidated.len() as u64 >= HISTORY {
            let floor = generation.saturating_sub(HISTORY);
            inner.invalidated.retain(|_, g| *g > floor);
        }
        inner.invalidated.insert(key.clone(), generation);
        inner.entries.remove(&key).is_some()
    }

    /// Forget everything, e.g. on disconnect.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.cleared_at = inner.generation;
        inner.invalidated.clear();
        inner.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn account(id: i64) -> Account {
        Account {
            id,
            username: format!("user{id}"),
            created_at: 0,
        }
    }

    #[test]
    fn insert_and_get_fold_case() {
        let cache = AuthCache::new();
        let generation = cache.generation();
        assert!(cache.insert("Alice", CacheEntry::Linked(account(1)), generation));
        assert_eq!(cache.get("ALICE"), Some(CacheEntry::Linked(account(1))));
        assert_eq!(cache.get("bob"), None);
    }

    #[test]
    fn verified_marker_is_replaced_by_link() {
        let cache = AuthCache::new();
        let generation = cache.generation();
        cache.insert("alice", CacheEntry::Verified, generation);
        cache.insert("alice", CacheEntry::Linked(account(7)), generation);
        assert_eq!(cache.get("alice"), Some(CacheEntry::Linked(account(7))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_drops_entry() {
        let cache = AuthCache::new();
        cache.insert("alice", CacheEntry::Verified, cache.generation());
        assert!(cache.remove("Alice"));
        assert!(!cache.remove("alice"));
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_generation_write_is_refused() {
        let cache = AuthCache::new();
        let before = cache.generation();
        cache.remove("alice");
        assert!(!cache.insert("alice", CacheEntry::Linked(account(1)), before));
        assert_eq!(cache.get("alice"), None);
    }

    #[test]
    fn invalidating_another_nick_does_not_refuse() {
        let cache = AuthCache::new();
        let before = cache.generation();
        cache.remove("bob");
        assert!(cache.insert("alice", CacheEntry::Verified, before));
    }

    #[test]
    fn very_old_generation_is_refused() {
        let cache = AuthCache::new();
        let before = cache.generation();
        for i in 0..(HISTORY + 1) {
            cache.remove(&format!("n{i}"));
        }
        assert!(!cache.insert("alice", CacheEntry::Verified, before));
        assert!(cache.insert("alice", CacheEntry::Verified, cache.generation()));
    }

    #[test]
    fn clear_empties_and_bumps_generation() {
        let cache = AuthCache::new();
        let generation = cache.generation();
        cache.insert("a", CacheEntry::Verified, generation);
        cache.insert("b", CacheEntry::Verified, generation);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.insert("c", CacheEntry::Verified, generation));
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let cache = Arc::new(AuthCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let nick = format!("n{i}-{j}");
                        cache.insert(&nick, CacheEntry::Linked(account(j)), 0);
                        assert_eq!(cache.get(&nick), Some(CacheEntry::Linked(account(j))));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
