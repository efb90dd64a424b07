use crate::errors::Result;
use log::debug;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Short-lived cache where each key has its own lock, so concurrent callers
/// for the same key share one upstream fetch. Errors are never stored.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// A zero `ttl` turns the cache into a pass-through.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !self.is_enabled() {
            return fetch().await;
        }

        let slot = {
            let mut slots = self.slots.lock().await;
            if !slots.contains_key(&key) {
                self.prune(&mut slots);
            }
            slots.entry(key.clone()).or_default().clone()
        };

        // Held across the fetch: later callers for this key wait here.
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.stored_at.elapsed() < self.ttl {
                debug!("Cache hit: {:?}", key);
                return Ok(cached.value.clone());
            }
        }

        let value = fetch().await?;
        *entry = Some(Entry {
            value: value.clone(),
            stored_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    /// Number of keys currently holding a slot.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops slots that are expired or empty and that no caller is using.
    fn prune(&self, slots: &mut HashMap<K, Slot<V>>) {
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let fresh = match slot.try_lock() {
                Ok(entry) => entry
                    .as_ref()
                    .map_or(false, |cached| cached.stored_at.elapsed() < self.ttl),
                Err(_) => true,
            };
            fresh
        });
        if slots.len() < before {
            debug!("Evicted {} expired cache entries", before - slots.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DashboardError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counted(counter: &AtomicUsize, value: u32) -> Result<u32> {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(value)
    }

    #[tokio::test]
    async fn test_hit_inside_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap(), 1);
        assert_eq!(cache.get_or_fetch("AAPL", || counted(&calls, 2)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = TtlCache::new(Duration::from_millis(30));
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get_or_fetch("AAPL", || counted(&calls, 2)).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let cache = TtlCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let first = cache
            .get_or_fetch("AAPL", || async { Err(DashboardError::ProviderError("down".into())) })
            .await;
        assert!(first.is_err());

        let second = cache.get_or_fetch("AAPL", || async { Ok(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("VALE3.SA", || counted(&calls, 5)),
            cache.get_or_fetch("VALE3.SA", || counted(&calls, 6)),
            cache.get_or_fetch("VALE3.SA", || counted(&calls, 7)),
        );
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (5, 5, 5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_separately() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        cache.get_or_fetch("MSFT", || counted(&calls, 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.clear().await;
        cache.get_or_fetch("AAPL", || counted(&calls, 3)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expired_slots_are_evicted_on_insert() {
        let cache = TtlCache::new(Duration::from_millis(30));
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        cache.get_or_fetch("MSFT", || counted(&calls, 2)).await.unwrap();
        assert_eq!(cache.len().await, 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.get_or_fetch("PETR4.SA", || counted(&calls, 3)).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_fresh_slots_survive_insert() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("AAPL", || counted(&calls, 1)).await.unwrap();
        let failed = cache
            .get_or_fetch("XXXX", || async { Err(DashboardError::NotFound("XXXX".into())) })
            .await;
        assert!(failed.is_err());
        cache.get_or_fetch("MSFT", || counted(&calls, 2)).await.unwrap();

        // the failed key left an empty slot, which goes; AAPL stays
        assert_eq!(cache.len().await, 2);
        assert!(!cache.is_empty().await);
        assert_eq!(cache.get_or_fetch("AAPL", || counted(&calls, 9)).await.unwrap(), 1);
    }
}
