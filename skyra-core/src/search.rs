//! City autocomplete.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use crate::model::CitySuggestion;
use crate::provider::WeatherProvider;

pub const SUGGESTION_DELAY: Duration = Duration::from_millis(300);
pub const SUGGESTION_LIMIT: usize = 5;

/// Holds a keystroke back until typing pauses. Only the latest call survives.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SUGGESTION_DELAY)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Waits out the delay and yields the query if nothing newer arrived meanwhile.
    /// A blank query cancels whatever is pending and yields nothing.
    pub async fn debounce(&self, query: &str) -> Option<String> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        tokio::time::sleep(self.delay).await;

        (self.latest.load(Ordering::SeqCst) == ticket).then(|| query.to_string())
    }

    /// Debounced lookup. Superseded or failed lookups produce no suggestions.
    pub async fn suggest(&self, provider: &dyn WeatherProvider, query: &str) -> Vec<CitySuggestion> {
        let Some(query) = self.debounce(query).await else {
            return Vec::new();
        };

        match provider.search_cities(&query, SUGGESTION_LIMIT).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%query, "city suggestions failed: {err:#}");
                Vec::new()
            }
        }
    }
}
