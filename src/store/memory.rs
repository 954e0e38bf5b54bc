use super::{BatchOp, KeyValueStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store. All state sits behind one `RwLock`, so every command and
/// every batch is applied under a single write guard and can never interleave
/// with another writer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: RwLock<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let keyspace = self.keyspace.read().await;
        keyspace.expect(key, Kind::String)?;
        Ok(keyspace.strings.get(key).cloned())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let keyspace = self.keyspace.read().await;
        // MGET yields nil for keys of another type rather than failing.
        Ok(keys
            .iter()
            .map(|key| keyspace.strings.get(key).cloned())
            .collect())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut keyspace = self.keyspace.write().await;
        keyspace.expect(key, Kind::String)?;
        if keyspace.strings.contains_key(key) {
            return Ok(false);
        }
        keyspace.strings.insert(key.to_owned(), value.to_owned());
        Ok(true)
    }

    async fn sorted_set_add(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> Result<(), StoreError> {
        let mut keyspace = self.keyspace.write().await;
        keyspace.expect(key, Kind::SortedSet)?;
        keyspace.sorted_set_mut(key).insert(member, score);
        Ok(())
    }

    async fn sorted_set_trim_by_rank(&self, key: &str, keep: usize) -> Result<(), StoreError> {
        let mut keyspace = self.keyspace.write().await;
        keyspace.expect(key, Kind::SortedSet)?;
        keyspace.trim(key, keep);
        Ok(())
    }

    async fn sorted_set_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let keyspace = self.keyspace.read().await;
        keyspace.expect(key, Kind::SortedSet)?;
        Ok(keyspace
            .sorted_sets
            .get(key)
            .map(|set| set.range(start, stop))
            .unwrap_or_default())
    }

    async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let keyspace = self.keyspace.read().await;
        keyspace.expect(key, Kind::SortedSet)?;
        Ok(keyspace
            .sorted_sets
            .get(key)
            .map(|set| set.rev_range(start, stop))
            .unwrap_or_default())
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        let keyspace = self.keyspace.read().await;
        keyspace.expect(key, Kind::SortedSet)?;
        Ok(keyspace
            .sorted_sets
            .get(key)
            .and_then(|set| set.score(member)))
    }

    async fn increment_by(
        &self,
        key: &str,
        member: &str,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let mut keyspace = self.keyspace.write().await;
        keyspace.expect(key, Kind::SortedSet)?;
        Ok(keyspace.sorted_set_mut(key).increment(member, amount))
    }

    async fn execute_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut keyspace = self.keyspace.write().await;
        // Type-check the whole batch before touching anything so a failing op
        // never leaves the earlier ones applied.
        keyspace.check(&ops)?;
        for op in ops {
            keyspace.apply(op);
        }
        Ok(())
    }
}

// ── Keyspace ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    SortedSet,
}

#[derive(Debug, Default)]
struct Keyspace {
    strings: HashMap<String, String>,
    sorted_sets: HashMap<String, SortedSet>,
}

impl Keyspace {
    fn kind(&self, key: &str) -> Option<Kind> {
        if self.strings.contains_key(key) {
            Some(Kind::String)
        } else if self.sorted_sets.contains_key(key) {
            Some(Kind::SortedSet)
        } else {
            None
        }
    }

    fn expect(&self, key: &str, kind: Kind) -> Result<(), StoreError> {
        match self.kind(key) {
            Some(found) if found != kind => Err(wrong_type(key)),
            _ => Ok(()),
        }
    }

    fn check(&self, ops: &[BatchOp]) -> Result<(), StoreError> {
        let mut pending: HashMap<&str, Kind> = HashMap::new();
        for op in ops {
            let (key, kind) = target(op);
            let current = pending.get(key).copied().or_else(|| self.kind(key));
            if matches!(current, Some(found) if found != kind) {
                return Err(wrong_type(key));
            }
            // Trimming a missing set does not create it.
            if !matches!(op, BatchOp::SortedSetTrimByRank { .. }) {
                pending.insert(key, kind);
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: BatchOp) {
        match op {
            BatchOp::SetIfAbsent { key, value } => {
                self.strings.entry(key).or_insert(value);
            }
            BatchOp::SortedSetAdd { key, score, member } => {
                self.sorted_set_mut(&key).insert(&member, score);
            }
            BatchOp::SortedSetTrimByRank { key, keep } => self.trim(&key, keep),
        }
    }

    fn sorted_set_mut(&mut self, key: &str) -> &mut SortedSet {
        self.sorted_sets.entry(key.to_owned()).or_default()
    }

    fn trim(&mut self, key: &str, keep: usize) {
        if let Some(set) = self.sorted_sets.get_mut(key) {
            set.truncate(keep);
            if set.is_empty() {
                self.sorted_sets.remove(key);
            }
        }
    }
}

fn target(op: &BatchOp) -> (&str, Kind) {
    match op {
        BatchOp::SetIfAbsent { key, .. } => (key.as_str(), Kind::String),
        BatchOp::SortedSetAdd { key, .. } | BatchOp::SortedSetTrimByRank { key, .. } => {
            (key.as_str(), Kind::SortedSet)
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

// ── Sorted set ─────────────────────────────────────────────────────────────

/// Members ordered by `(score, member)`, ties broken by member bytes.
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: Vec<(f64, String)>,
}

impl SortedSet {
    fn position(&self, score: f64, member: &str) -> Result<usize, usize> {
        self.ordered.binary_search_by(|(s, m)| {
            s.total_cmp(&score)
                .then_with(|| m.as_str().cmp(member))
        })
    }

    fn insert(&mut self, member: &str, score: f64) {
        if let Some(old) = self.scores.get(member).copied() {
            if let Ok(idx) = self.position(old, member) {
                self.ordered.remove(idx);
            }
        }
        self.scores.insert(member.to_owned(), score);
        let (Ok(idx) | Err(idx)) = self.position(score, member);
        self.ordered.insert(idx, (score, member.to_owned()));
    }

    fn increment(&mut self, member: &str, amount: f64) -> f64 {
        let next = self.scores.get(member).copied().unwrap_or(0.0) + amount;
        self.insert(member, next);
        next
    }

    fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    fn truncate(&mut self, keep: usize) {
        if keep >= self.ordered.len() {
            return;
        }
        for (_, member) in self.ordered.drain(keep..) {
            self.scores.remove(&member);
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn range(&self, start: isize, stop: isize) -> Vec<String> {
        match rank_bounds(start, stop, self.ordered.len()) {
            Some((first, last)) => self.ordered[first..=last]
                .iter()
                .map(|(_, member)| member.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn rev_range(&self, start: isize, stop: isize) -> Vec<String> {
        match rank_bounds(start, stop, self.ordered.len()) {
            Some((first, last)) => self
                .ordered
                .iter()
                .rev()
                .skip(first)
                .take(last - first + 1)
                .map(|(_, member)| member.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Resolve Redis-style inclusive `start..=stop` ranks against `len` members.
fn rank_bounds(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}
