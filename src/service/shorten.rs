use crate::{
    codegen,
    error::SubmitError,
    models::ShortCode,
    store::{keys, BatchOp, KeyValueStore},
    validator::{self, UrlConstraints},
};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use tracing::debug;

/// Maximum number of codes kept in the newest list.
pub const NEWEST_CAPACITY: usize = 10;

/// Turns submitted URLs into short codes and records them.
#[derive(Clone)]
pub struct ShortenService {
    store: Arc<dyn KeyValueStore>,
    /// Last submission time handed out, in Unix microseconds.
    last_micros: Arc<AtomicI64>,
}

impl ShortenService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            last_micros: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Validate `candidate`, store its mapping (first write wins) and push its
    /// code onto the newest list.
    ///
    /// `request_host` is the `Host` the submission arrived on; links back to
    /// it are refused. Returns the code even when the mapping already existed.
    pub async fn submit(
        &self,
        candidate: &str,
        request_host: &str,
    ) -> Result<ShortCode, SubmitError> {
        let url = canonicalize(candidate, request_host).ok_or(SubmitError::Validation)?;
        let code = codegen::hash(&url);

        // Negated so that ascending rank order is newest first.
        let score = -(self.next_micros() as f64);

        self.store
            .execute_batch(vec![
                BatchOp::SetIfAbsent {
                    key: keys::mapping(code.as_str()),
                    value: url.clone(),
                },
                BatchOp::SortedSetAdd {
                    key: keys::NEWEST.to_owned(),
                    score,
                    member: code.to_string(),
                },
                BatchOp::SortedSetTrimByRank {
                    key: keys::NEWEST.to_owned(),
                    keep: NEWEST_CAPACITY,
                },
            ])
            .await?;

        debug!("Shortened {} -> {}", url, code);
        Ok(code)
    }

    /// Current Unix time in microseconds, bumped past the previous value if
    /// the clock has not advanced. Submissions through one service never share
    /// a score. Microsecond timestamps stay below 2^53, so the `f64` score is
    /// exact.
    fn next_micros(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let previous = self
            .last_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Constraints applied to every submission arriving on `request_host`.
pub fn submission_constraints(request_host: &str) -> UrlConstraints {
    UrlConstraints {
        require_scheme: true,
        host_blacklist: vec![
            request_host.to_owned(),
            "localhost".to_owned(),
            "127.0.0.1".to_owned(),
        ],
    }
}

/// Return the URL to store for `candidate`, or `None` if it is not
/// acceptable.
///
/// Surrounding whitespace is trimmed before validation, so the returned URL
/// (and the code hashed from it) never carries it.
///
/// A candidate that only passes once `http://` is prepended (e.g.
/// `openai.com`) is rewritten to the prefixed form.
pub fn canonicalize(candidate: &str, request_host: &str) -> Option<String> {
    let constraints = submission_constraints(request_host);
    let candidate = candidate.trim();

    if validator::is_valid_url(candidate, &constraints) {
        return Some(candidate.to_owned());
    }

    let prefixed = format!("http://{candidate}");
    if validator::is_valid_url(&prefixed, &constraints) {
        return Some(prefixed);
    }

    None
}

/// Public short URL for `code`. `base` has no trailing slash.
pub fn short_url(base: &str, code: &ShortCode) -> String {
    format!("{base}/{code}")
}
