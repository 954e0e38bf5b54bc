use crate::{
    error::StoreError,
    models::RankedLink,
    store::{keys, KeyValueStore},
};
use std::sync::Arc;
use tracing::warn;

/// Default length of the most-visited list.
pub const TOP_DEFAULT: usize = 10;

/// Read-only newest / most-visited views over the store.
///
/// Store failures are logged and reported as empty results.
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn KeyValueStore>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Most recently submitted codes first, with their URLs.
    pub async fn list_newest(&self) -> Vec<RankedLink> {
        self.load_newest().await.unwrap_or_else(|e| {
            warn!("Failed to load newest list: {}", e);
            Vec::new()
        })
    }

    /// The `n` most visited codes, highest count first, with their URLs.
    pub async fn list_top(&self, n: usize) -> Vec<RankedLink> {
        if n == 0 {
            return Vec::new();
        }

        self.load_top(n).await.unwrap_or_else(|e| {
            warn!("Failed to load top list: {}", e);
            Vec::new()
        })
    }

    /// Number of recorded visits for `code`.
    pub async fn visit_count(&self, code: &str) -> u64 {
        match self.store.sorted_set_score(keys::COUNT, code).await {
            Ok(score) => score.map(|s| s as u64).unwrap_or(0),
            Err(e) => {
                warn!("Failed to read visit count for '{}': {}", code, e);
                0
            }
        }
    }

    async fn load_newest(&self) -> Result<Vec<RankedLink>, StoreError> {
        // Already capped at write time, so read the whole set.
        let codes = self.store.sorted_set_range(keys::NEWEST, 0, -1).await?;
        self.with_urls(codes).await
    }

    async fn load_top(&self, n: usize) -> Result<Vec<RankedLink>, StoreError> {
        let stop = isize::try_from(n - 1).unwrap_or(isize::MAX);
        let codes = self.store.sorted_set_rev_range(keys::COUNT, 0, stop).await?;
        self.with_urls(codes).await
    }

    /// Resolve every code with a single multi-get, keeping list order.
    async fn with_urls(&self, codes: Vec<String>) -> Result<Vec<RankedLink>, StoreError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let mapping_keys: Vec<String> = codes.iter().map(|c| keys::mapping(c)).collect();
        let urls = self.store.multi_get(&mapping_keys).await?;

        Ok(codes
            .into_iter()
            .zip(urls)
            .map(|(code, url)| RankedLink { code, url })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::{shorten::NEWEST_CAPACITY, ShortenService},
        store::{BatchOp, MemoryStore},
    };

    const HOST: &str = "short.test";

    fn setup() -> (ShortenService, RankingEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            ShortenService::new(store.clone()),
            RankingEngine::new(store.clone()),
            store,
        )
    }

    fn codes(links: &[RankedLink]) -> Vec<&str> {
        links.iter().map(|l| l.code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_newest_first() {
        let (shortener, ranking, _) = setup();
        let a = shortener.submit("https://a.example.com", HOST).await.unwrap();
        let b = shortener.submit("https://b.example.com", HOST).await.unwrap();

        let newest = ranking.list_newest().await;
        assert_eq!(codes(&newest), [b.as_str(), a.as_str()]);
        assert_eq!(newest[0].url.as_deref(), Some("https://b.example.com"));
        assert_eq!(newest[1].url.as_deref(), Some("https://a.example.com"));
    }

    #[tokio::test]
    async fn test_resubmission_moves_code_to_front() {
        let (shortener, ranking, _) = setup();
        let a = shortener.submit("https://a.example.com", HOST).await.unwrap();
        let b = shortener.submit("https://b.example.com", HOST).await.unwrap();
        shortener.submit("https://a.example.com", HOST).await.unwrap();

        assert_eq!(codes(&ranking.list_newest().await), [a.as_str(), b.as_str()]);
    }

    #[tokio::test]
    async fn test_back_to_back_submissions_keep_recency_order() {
        for i in 0..50 {
            let (shortener, ranking, _) = setup();
            let a = shortener
                .submit(&format!("https://a{i}.example.com"), HOST)
                .await
                .unwrap();
            let b = shortener
                .submit(&format!("https://b{i}.example.com"), HOST)
                .await
                .unwrap();

            let newest = ranking.list_newest().await;
            assert_eq!(codes(&newest), [b.as_str(), a.as_str()], "round {i}");
        }
    }

    #[tokio::test]
    async fn test_newest_never_exceeds_capacity() {
        let (shortener, ranking, _) = setup();
        for i in 0..(NEWEST_CAPACITY + 7) {
            shortener
                .submit(&format!("https://example.com/{i}"), HOST)
                .await
                .unwrap();
            assert!(ranking.list_newest().await.len() <= NEWEST_CAPACITY);
        }

        // Submitted back to back, so only strict recency decides the order.
        let expected: Vec<String> = (7..NEWEST_CAPACITY + 7)
            .rev()
            .map(|i| crate::codegen::hash(&format!("https://example.com/{i}")).to_string())
            .collect();
        assert_eq!(codes(&ranking.list_newest().await), expected);
    }

    #[tokio::test]
    async fn test_unresolvable_codes_are_kept() {
        let (_, ranking, store) = setup();
        store
            .execute_batch(vec![BatchOp::SortedSetAdd {
                key: keys::NEWEST.into(),
                score: -1.0,
                member: "ghost".into(),
            }])
            .await
            .unwrap();

        let newest = ranking.list_newest().await;
        assert_eq!(
            newest,
            [RankedLink {
                code: "ghost".into(),
                url: None
            }]
        );
    }

    #[tokio::test]
    async fn test_top_orders_by_count() {
        let (shortener, ranking, store) = setup();
        let a = shortener.submit("https://a.example.com", HOST).await.unwrap();
        let b = shortener.submit("https://b.example.com", HOST).await.unwrap();
        let c = shortener.submit("https://c.example.com", HOST).await.unwrap();

        for (code, hits) in [(&a, 2.0), (&b, 5.0), (&c, 1.0)] {
            store.increment_by(keys::COUNT, code.as_str(), hits).await.unwrap();
        }

        let top = ranking.list_top(TOP_DEFAULT).await;
        assert_eq!(codes(&top), [b.as_str(), a.as_str(), c.as_str()]);
        assert_eq!(top[0].url.as_deref(), Some("https://b.example.com"));

        assert_eq!(codes(&ranking.list_top(2).await), [b.as_str(), a.as_str()]);
        assert!(ranking.list_top(0).await.is_empty());
        assert_eq!(ranking.visit_count(b.as_str()).await, 5);
        assert_eq!(ranking.visit_count("unknown").await, 0);
    }

    #[tokio::test]
    async fn test_empty_views() {
        let (_, ranking, _) = setup();
        assert!(ranking.list_newest().await.is_empty());
        assert!(ranking.list_top(TOP_DEFAULT).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_read_as_empty() {
        let (_, ranking, store) = setup();
        store.set_if_absent(keys::NEWEST, "x").await.unwrap();
        store.set_if_absent(keys::COUNT, "x").await.unwrap();

        assert!(ranking.list_newest().await.is_empty());
        assert!(ranking.list_top(TOP_DEFAULT).await.is_empty());
        assert_eq!(ranking.visit_count("abc").await, 0);
    }
}
