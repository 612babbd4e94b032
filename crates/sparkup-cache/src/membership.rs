//! Room membership cache.

use std::sync::Arc;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tracing::debug;

use sparkup_core::config::MembershipCacheConfig;
use sparkup_core::error::AppError;
use sparkup_core::result::AppResult;
use sparkup_core::types::PostId;
use sparkup_database::store::MembershipStore;
use sparkup_entity::membership::RoomMember;

use crate::bucket::TimeBucket;

/// Shared, immutable member list for one room in one bucket.
pub type MemberSnapshot = Arc<Vec<RoomMember>>;

/// Memoizes `room_members` per `(room, time bucket)`.
///
/// A new bucket always goes back to the store, so a membership change is
/// visible from the bucket after the one it happened in. Entries are never
/// invalidated explicitly; they age out by LRU once the capacity is reached.
/// Concurrent misses on the same key share one store query.
#[derive(Clone)]
pub struct MembershipCache {
    cache: Cache<(PostId, i64), MemberSnapshot>,
    store: Arc<dyn MembershipStore>,
    interval_minutes: u32,
}

impl std::fmt::Debug for MembershipCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipCache")
            .field("interval_minutes", &self.interval_minutes)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl MembershipCache {
    /// Create a cache in front of `store`.
    pub fn new(config: &MembershipCacheConfig, store: Arc<dyn MembershipStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            store,
            interval_minutes: config.interval_minutes,
        }
    }

    /// The bucket for the current wall-clock time.
    pub fn current_bucket(&self) -> TimeBucket {
        TimeBucket::current(self.interval_minutes)
    }

    /// Members of `post_id` as of `bucket`.
    ///
    /// Store errors are returned to the caller and nothing is cached.
    pub async fn get_members(&self, post_id: PostId, bucket: TimeBucket) -> AppResult<MemberSnapshot> {
        let store = Arc::clone(&self.store);
        self.cache
            .try_get_with((post_id, bucket.key()), async move {
                debug!(post_id = %post_id, bucket = bucket.key(), "Loading room members");
                store.room_members(post_id).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<AppError>| AppError::clone(&e))
    }

    /// Approximate number of cached snapshots.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions so `entry_count` is exact.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use sparkup_core::error::ErrorKind;
    use sparkup_core::types::UserId;
    use sparkup_entity::membership::MemberProfile;

    use super::*;

    #[derive(Default)]
    struct CountingStore {
        members: Mutex<Vec<RoomMember>>,
        queries: AtomicU64,
        failing: AtomicBool,
    }

    impl CountingStore {
        fn set_members(&self, ids: &[i64]) {
            let mut members = self.members.lock().unwrap();
            *members = ids
                .iter()
                .map(|id| RoomMember::new(UserId(*id), None))
                .collect();
        }

        fn queries(&self) -> u64 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MembershipStore for CountingStore {
        async fn user_exists(&self, _user_id: UserId) -> AppResult<bool> {
            Ok(true)
        }

        async fn room_members(&self, _post_id: PostId) -> AppResult<Vec<RoomMember>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::database("connection refused"));
            }
            Ok(self.members.lock().unwrap().clone())
        }

        async fn is_member(&self, _post_id: PostId, _user_id: UserId) -> AppResult<bool> {
            Ok(true)
        }

        async fn member_profiles(&self, _post_id: PostId) -> AppResult<Vec<MemberProfile>> {
            Ok(Vec::new())
        }
    }

    fn cache_with(store: Arc<CountingStore>, capacity: u64) -> MembershipCache {
        let config = MembershipCacheConfig {
            interval_minutes: 5,
            max_capacity: capacity,
        };
        MembershipCache::new(&config, store)
    }

    fn bucket(minute: u32, second: u32) -> TimeBucket {
        TimeBucket::at(Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, second).unwrap(), 5)
    }

    #[tokio::test]
    async fn test_same_bucket_is_memoized() {
        let store = Arc::new(CountingStore::default());
        store.set_members(&[1, 2]);
        let cache = cache_with(store.clone(), 100);

        let first = cache.get_members(PostId(42), bucket(35, 0)).await.unwrap();
        let second = cache.get_members(PostId(42), bucket(39, 59)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.queries(), 1);
    }

    #[tokio::test]
    async fn test_change_visible_from_next_bucket() {
        let store = Arc::new(CountingStore::default());
        store.set_members(&[1, 2]);
        let cache = cache_with(store.clone(), 100);

        cache.get_members(PostId(42), bucket(36, 0)).await.unwrap();
        store.set_members(&[1, 2, 3]);

        let stale = cache.get_members(PostId(42), bucket(38, 0)).await.unwrap();
        assert_eq!(stale.len(), 2);

        let fresh = cache.get_members(PostId(42), bucket(40, 0)).await.unwrap();
        assert_eq!(fresh.len(), 3);
        assert_eq!(store.queries(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_query() {
        let store = Arc::new(CountingStore::default());
        store.set_members(&[7]);
        let cache = cache_with(store.clone(), 100);

        let lookups = (0..8).map(|_| cache.get_members(PostId(9), bucket(10, 0)));
        let results = futures::future::join_all(lookups).await;
        assert!(results.iter().all(|r| matches!(r, Ok(m) if m.len() == 1)));
        assert_eq!(store.queries(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_cached() {
        let store = Arc::new(CountingStore::default());
        store.set_members(&[1]);
        store.failing.store(true, Ordering::SeqCst);
        let cache = cache_with(store.clone(), 100);

        let err = cache.get_members(PostId(1), bucket(0, 0)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        store.failing.store(false, Ordering::SeqCst);
        let members = cache.get_members(PostId(1), bucket(0, 0)).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(store.queries(), 2);
    }

    #[tokio::test]
    async fn test_capacity_bounds_entries() {
        let store = Arc::new(CountingStore::default());
        store.set_members(&[1]);
        let cache = cache_with(store.clone(), 2);

        for room in 1..=5 {
            cache.get_members(PostId(room), bucket(0, 0)).await.unwrap();
        }
        cache.run_pending_tasks().await;
        assert!(cache.entry_count() <= 2);
    }
}
