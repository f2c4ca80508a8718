use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// The lock object behind a single key.
pub type KeyLock = Arc<RwLock<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of holders; waits behind queued exclusive acquirers.
    Shared,
    /// Sole holder; excludes both modes.
    Exclusive,
}

/// Lazily populated `key -> lock` table.
///
/// Get-or-create runs under the DashMap shard lock, so concurrent first
/// access to a key installs exactly one lock object. An entry is reclaimed
/// when its last guard is dropped and nothing else references it; the table
/// therefore only holds keys that are in use.
pub struct KeyedLockRegistry {
    locks: DashMap<String, KeyLock>,
}

impl KeyedLockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            locks: DashMap::new(),
        })
    }

    /// Returns the lock for `key`, creating it if this is the first access.
    ///
    /// Holding the returned handle keeps the entry alive in the registry.
    pub fn handle(&self, key: &str) -> KeyLock {
        if let Some(lock) = self.locks.get(key) {
            return lock.value().clone();
        }

        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .value()
            .clone()
    }

    /// Waits until `key` can be held in `mode`. The returned guard releases
    /// the lock when dropped, on every exit path.
    pub async fn acquire(self: &Arc<Self>, key: &str, mode: LockMode) -> KeyGuard {
        let lock = self.handle(key);

        let held = match mode {
            LockMode::Shared => HeldLock::Shared(lock.read_owned().await),
            LockMode::Exclusive => HeldLock::Exclusive(lock.write_owned().await),
        };

        tracing::trace!("Acquired {:?} lock on '{}'", mode, key);

        KeyGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            held: Some(held),
        }
    }

    /// Drops every entry nobody holds or waits for.
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.locks.contains_key(key)
    }

    fn release_if_idle(&self, key: &str) {
        // Every new reference is cloned out of the map under the shard lock,
        // and remove_if holds that lock for the check.
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

enum HeldLock {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

/// A held per-key lock.
pub struct KeyGuard {
    registry: Arc<KeyedLockRegistry>,
    key: String,
    held: Option<HeldLock>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> LockMode {
        match self.held {
            Some(HeldLock::Shared(_)) | None => LockMode::Shared,
            Some(HeldLock::Exclusive(_)) => LockMode::Exclusive,
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mode = self.mode();
        // Release first so the Arc count reflects only holders and waiters.
        drop(self.held.take());
        self.registry.release_if_idle(self.key());
        tracing::trace!("Released {:?} lock on '{}'", mode, self.key());
    }
}
