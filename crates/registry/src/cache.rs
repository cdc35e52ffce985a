//! A keyed cache whose misses are constructed without holding the whole
//! map locked: a miss installs a per-key slot under a brief map lock, then
//! releases it before the slot's own `OnceCell` runs the constructor.
//! Concurrent callers for the *same* key still serialize (they share the
//! slot and observe the same `OnceCell`); callers for *different* keys
//! never wait on each other's constructor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

/// One cached value's lazily-initialized cell plus its activity record.
pub struct Slot<V> {
    cell: OnceCell<V>,
    last_used: Mutex<DateTime<Utc>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            last_used: Mutex::new(Utc::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock() = Utc::now();
    }

    fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.lock()
    }

    fn value(&self) -> Option<&V> {
        self.cell.get()
    }
}

/// `K -> Arc<Slot<V>>`, guarded by a map-wide async mutex that is only
/// ever held across the map lookup/insert itself — never across a slot's
/// constructor.
pub struct Cache<K, V> {
    entries: AsyncMutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: std::hash::Hash + Eq,
{
    fn default() -> Self {
        Self {
            entries: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Ord,
    V: Clone,
{
    /// Returns the cached value for `key`, touching its activity record,
    /// or runs `init` to construct one. The map lock is dropped before
    /// `init` runs, so a slow constructor for `key` never blocks callers
    /// working with other keys. If `init` fails, the slot is removed so
    /// the next call retries from scratch.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.clone()).or_insert_with(|| Arc::new(Slot::new())))
        };

        match slot.cell.get_or_try_init(init).await {
            Ok(value) => {
                slot.touch();
                Ok(value.clone())
            }
            Err(e) => {
                let mut entries = self.entries.lock().await;
                if let Some(current) = entries.get(&key) {
                    if Arc::ptr_eq(current, &slot) && slot.value().is_none() {
                        entries.remove(&key);
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let slot = self.entries.lock().await.remove(key)?;
        slot.value().cloned()
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .await
            .get(key)
            .is_some_and(|s| s.value().is_some())
    }

    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|s| s.value().is_some())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn keys(&self) -> Vec<K> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|(_, s)| s.value().is_some())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// The key whose entry is least recently used, breaking ties by the
    /// key's own `Ord` (deterministic — spec's eviction tie-break).
    pub async fn lru_key(&self) -> Option<K> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|(_, s)| s.value().is_some())
            .min_by(|(ka, sa), (kb, sb)| sa.last_used().cmp(&sb.last_used()).then_with(|| ka.cmp(kb)))
            .map(|(k, _)| k.clone())
    }

    /// Keys whose entry has been idle longer than `threshold`, given a
    /// per-entry `busy` predicate that exempts an entry from the sweep
    /// regardless of age.
    pub async fn idle_keys(&self, now: DateTime<Utc>, threshold: chrono::Duration, busy: impl Fn(&V) -> bool) -> Vec<K> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter_map(|(k, s)| s.value().map(|v| (k, s, v)))
            .filter(|(_, s, v)| now - s.last_used() > threshold && !busy(v))
            .map(|(k, _, _)| k.clone())
            .collect()
    }

    pub async fn clear(&self) -> Vec<V> {
        self.entries
            .lock()
            .await
            .drain()
            .filter_map(|(_, s)| s.value().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn misses_for_different_keys_run_concurrently() {
        let cache: Arc<Cache<u32, u32>> = Arc::new(Cache::default());
        let inflight = Arc::new(AtomicUsize::new(0));
        let max_inflight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for key in 0..4u32 {
            let cache = Arc::clone(&cache);
            let inflight = Arc::clone(&inflight);
            let max_inflight = Arc::clone(&max_inflight);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init(key, || async move {
                        let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inflight.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        inflight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, std::convert::Infallible>(key * 10)
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert!(
            max_inflight.load(Ordering::SeqCst) > 1,
            "constructors for distinct keys should overlap, not serialize on the map lock"
        );
    }

    #[tokio::test]
    async fn concurrent_misses_for_the_same_key_init_once() {
        let cache: Arc<Cache<u32, u32>> = Arc::new(Cache::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init(1u32, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, std::convert::Infallible>(42)
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_init_leaves_no_entry_for_retry() {
        let cache: Cache<u32, u32> = Cache::default();
        let err = cache
            .get_or_try_init(1u32, || async { Err::<u32, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(!cache.contains(&1u32).await);
        assert_eq!(cache.len().await, 0);

        let value = cache
            .get_or_try_init(1u32, || async { Ok::<_, &str>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
