use crate::{
    models::Outcome,
    store::{keys, KeyValueStore},
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Resolves short codes for visitors and counts the hits.
#[derive(Clone)]
pub struct RedirectResolver {
    store: Arc<dyn KeyValueStore>,
}

impl RedirectResolver {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Look up `code`. A found code gets its hit counter bumped in the
    /// background; an unknown code and a failed lookup both yield
    /// [`Outcome::NotFound`].
    pub async fn resolve(&self, code: &str) -> Outcome {
        match self.store.get(&keys::mapping(code)).await {
            Ok(Some(url)) => {
                self.record_hit(code);
                Outcome::Redirect(url)
            }
            Ok(None) => Outcome::NotFound,
            Err(e) => {
                warn!("Lookup of short code '{}' failed: {}", code, e);
                Outcome::NotFound
            }
        }
    }

    /// Increment the visit counter without holding up the redirect. Failures
    /// are only logged.
    fn record_hit(&self, code: &str) {
        let store = Arc::clone(&self.store);
        let code = code.to_owned();

        tokio::spawn(async move {
            match store.increment_by(keys::COUNT, &code, 1.0).await {
                Ok(hits) => debug!("Hit! - {} ({} total)", code, hits),
                Err(e) => error!("Failed to count hit for '{}': {}", code, e),
            }
        });
    }
}
