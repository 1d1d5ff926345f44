use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use scrapbook_types::catalog::CatalogTrack;

use crate::api::FeedApi;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounces catalog search input.
///
/// Each call to [`search`](Self::search) waits out the quiet period and only
/// hits the API if no newer keystroke arrived meanwhile. A superseded call
/// resolves to `None`; callers keep whatever results they are showing.
pub struct SearchDebouncer<A> {
    api: Arc<A>,
    delay: Duration,
    generation: AtomicU64,
}

impl<A: FeedApi> SearchDebouncer<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_delay(api, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(api: Arc<A>, delay: Duration) -> Self {
        Self {
            api,
            delay,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn search(&self, query: &str) -> Option<Vec<CatalogTrack>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.is_empty() {
            return Some(Vec::new());
        }

        tokio::time::sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }

        let result = self.api.search_tracks(query).await;

        // A newer keystroke may have landed while the request was out.
        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }
        match result {
            Ok(tracks) => Some(tracks),
            Err(e) => {
                warn!("Error searching songs: {}", e);
                Some(Vec::new())
            }
        }
    }
}
