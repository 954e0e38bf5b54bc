//! Key-value store abstraction with the sorted-set and batch primitives the
//! shortener needs.
//!
//! Every piece of shared state (mappings, the newest list, hit counters)
//! lives behind this trait. Services receive an `Arc<dyn KeyValueStore>` at
//! construction time.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::StoreError;
use async_trait::async_trait;

/// Persisted key layout.
pub mod keys {
    /// Sorted set of codes scored by negative submission time (µs).
    pub const NEWEST: &str = "newest";

    /// Sorted set of codes scored by visit count.
    pub const COUNT: &str = "count";

    /// String key holding the URL for `code`.
    pub fn mapping(code: &str) -> String {
        format!("mapping:{code}")
    }
}

/// A write applied as part of [`KeyValueStore::execute_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    SetIfAbsent {
        key: String,
        value: String,
    },
    SortedSetAdd {
        key: String,
        score: f64,
        member: String,
    },
    /// Keep the `keep` lowest-ranked members, drop the rest.
    SortedSetTrimByRank {
        key: String,
        keep: usize,
    },
}

/// Range arguments follow Redis index semantics: both ends inclusive,
/// negative values count back from the end of the set.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// One value per key, in key order. Missing keys yield `None`.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    /// Returns `true` if the value was written, `false` if the key already
    /// held one.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Add `member` or move it to `score` if already present.
    async fn sorted_set_add(&self, key: &str, score: f64, member: &str)
        -> Result<(), StoreError>;

    async fn sorted_set_trim_by_rank(&self, key: &str, keep: usize) -> Result<(), StoreError>;

    /// Members by ascending score.
    async fn sorted_set_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError>;

    /// Members by descending score.
    async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError>;

    /// Atomically add `amount` to `member`'s score (starting from 0) and
    /// return the new score.
    async fn increment_by(&self, key: &str, member: &str, amount: f64)
        -> Result<f64, StoreError>;

    /// Apply every op as one indivisible unit: readers see all of them or
    /// none of them.
    async fn execute_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;
}
