//! Ordering primitives shared by the stores.
//!
//! [`KeyedLocks`] serializes overlapping operations on the same key (a cart
//! line). [`Sequencer`] and [`Versioned`] make sure a response that arrives
//! late never overwrites state produced by a newer request.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on demand.
pub struct KeyedLocks<K> {
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Hash + Eq + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Entries nobody holds or waits on are dropped.
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub async fn len(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl<K: Hash + Eq + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues strictly increasing request numbers.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Number for a request about to be sent.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// A value tagged with the request number that produced it.
#[derive(Debug, Clone, Default)]
pub struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Adopt `value` unless a newer one has already been applied.
    ///
    /// Returns whether the value was adopted.
    pub fn apply(&mut self, version: u64, value: T) -> bool {
        if version <= self.version {
            return false;
        }
        self.version = version;
        self.value = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_sequencer_is_strictly_increasing() {
        let seq = Sequencer::new();
        let a = seq.next();
        let b = seq.next();
        assert!(b > a);
        assert_eq!(a, 1);
    }

    #[test]
    fn test_stale_value_is_dropped() {
        let seq = Sequencer::new();
        let older = seq.next();
        let newer = seq.next();

        let mut state = Versioned::new(0);
        assert!(state.apply(newer, 2));
        assert!(!state.apply(older, 1));
        assert_eq!(*state.get(), 2);
        assert_eq!(state.version(), newer);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _guard = locks.acquire(&"P1:M:Red".to_string()).await;
                log.lock().await.push("first-start");
                tokio::time::sleep(Duration::from_millis(50)).await;
                log.lock().await.push("first-end");
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _guard = locks.acquire(&"P1:M:Red".to_string()).await;
                log.lock().await.push("second");
            })
        };

        first.await.ok();
        second.await.ok();
        assert_eq!(
            *log.lock().await,
            vec!["first-start", "first-end", "second"]
        );
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<&str>::new();
        let _a = locks.acquire(&"a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&"b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = KeyedLocks::<&str>::new();
        drop(locks.acquire(&"a").await);
        drop(locks.acquire(&"b").await);
        assert_eq!(locks.len().await, 1);
    }
}
