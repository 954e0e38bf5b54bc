use super::{BatchOp, KeyValueStore};
use crate::error::StoreError;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::debug;

/// Redis-backed store. Batches run as `MULTI`/`EXEC` pipelines; the
/// connection manager reconnects on its own after a dropped connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Open a client for `url` and establish the managed connection.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        debug!("Redis connection established");
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.conn().get(key).await?;
        Ok(value)
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let values: Vec<Option<String>> = cmd.query_async(&mut self.conn()).await?;
        Ok(values)
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let written: bool = self.conn().set_nx(key, value).await?;
        Ok(written)
    }

    async fn sorted_set_add(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> Result<(), StoreError> {
        let _: () = self.conn().zadd(key, member, score).await?;
        Ok(())
    }

    async fn sorted_set_trim_by_rank(&self, key: &str, keep: usize) -> Result<(), StoreError> {
        let _: () = self
            .conn()
            .zremrangebyrank(key, keep as isize, -1)
            .await?;
        Ok(())
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let members: Vec<String> = self.conn().zrange(key, start, stop).await?;
        Ok(members)
    }

    async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let members: Vec<String> = self.conn().zrevrange(key, start, stop).await?;
        Ok(members)
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let score: Option<f64> = self.conn().zscore(key, member).await?;
        Ok(score)
    }

    async fn increment_by(
        &self,
        key: &str,
        member: &str,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let score: f64 = self.conn().zincr(key, member, amount).await?;
        Ok(score)
    }

    async fn execute_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                BatchOp::SetIfAbsent { key, value } => {
                    pipe.set_nx(key, value).ignore();
                }
                BatchOp::SortedSetAdd { key, score, member } => {
                    pipe.zadd(key, member, *score).ignore();
                }
                BatchOp::SortedSetTrimByRank { key, keep } => {
                    pipe.zremrangebyrank(key, *keep as isize, -1).ignore();
                }
            }
        }
        let _: () = pipe.query_async(&mut self.conn()).await?;
        Ok(())
    }
}

/// These run against a live server: `REDIS_URL=redis://... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> RedisStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisStore::connect(&url).await.unwrap()
    }

    /// Key under a namespace unique to this test run.
    fn key(name: &str) -> String {
        format!(
            "hashlink-test:{}:{}:{name}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        )
    }

    async fn cleanup(store: &RedisStore, keys: &[&str]) {
        let _: () = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut store.conn())
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_set_if_absent_first_write_wins() {
        let store = connect().await;
        let mapping = key("mapping");

        assert!(store.set_if_absent(&mapping, "http://first.test").await.unwrap());
        assert!(!store.set_if_absent(&mapping, "http://second.test").await.unwrap());
        assert_eq!(
            store.get(&mapping).await.unwrap().as_deref(),
            Some("http://first.test")
        );

        let missing = key("missing");
        assert_eq!(
            store.multi_get(&[mapping.clone(), missing]).await.unwrap(),
            [Some("http://first.test".to_owned()), None]
        );

        cleanup(&store, &[&mapping]).await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_batch_trims_newest() {
        let store = connect().await;
        let newest = key("newest");
        let mapping = key("mapping");

        for i in 0..15 {
            store
                .execute_batch(vec![
                    BatchOp::SetIfAbsent {
                        key: mapping.clone(),
                        value: format!("http://example.com/{i}"),
                    },
                    BatchOp::SortedSetAdd {
                        key: newest.clone(),
                        score: -(i as f64),
                        member: format!("code{i}"),
                    },
                    BatchOp::SortedSetTrimByRank {
                        key: newest.clone(),
                        keep: 10,
                    },
                ])
                .await
                .unwrap();
        }

        let expected: Vec<String> = (5..15).rev().map(|i| format!("code{i}")).collect();
        assert_eq!(store.sorted_set_range(&newest, 0, -1).await.unwrap(), expected);
        assert_eq!(
            store.get(&mapping).await.unwrap().as_deref(),
            Some("http://example.com/0")
        );

        cleanup(&store, &[&newest, &mapping]).await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_increment_by_counts_hits() {
        let store = connect().await;
        let count = key("count");

        for _ in 0..3 {
            store.increment_by(&count, "busy", 1.0).await.unwrap();
        }
        assert_eq!(store.increment_by(&count, "quiet", 1.0).await.unwrap(), 1.0);

        assert_eq!(store.sorted_set_score(&count, "busy").await.unwrap(), Some(3.0));
        assert_eq!(store.sorted_set_score(&count, "never").await.unwrap(), None);
        assert_eq!(
            store.sorted_set_rev_range(&count, 0, -1).await.unwrap(),
            ["busy", "quiet"]
        );

        cleanup(&store, &[&count]).await;
    }
}
