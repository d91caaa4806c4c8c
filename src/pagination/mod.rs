//! Load-more pagination
//!
//! The content service hands out an opaque `next_page` URL with every
//! result page. Its presence is the only signal that more posts exist; we
//! never know the total count or the page size.
//!
//! Loading is single-flight per cursor: concurrent requests for the same
//! cursor share one fetch, and a [`PostFeed`] applies a page only while its
//! cursor is still the current one, so overlapping "load more" clicks append
//! a page exactly once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::content::{PostSummary, PostsPagination, Projector};
use crate::generator::listing::paginate;
use crate::prismic::{ContentError, ContentSource, QueryResponse};

/// Result of fetching a cursor, shareable between waiters
pub type PageResult = Result<QueryResponse, Arc<ContentError>>;

/// Coalesces concurrent calls with the same key into one in-flight future
pub struct SingleFlight<T> {
    inflight: tokio::sync::Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            inflight: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` for `key` unless a call for `key` is already in flight, in
    /// which case wait for that call and return its result.
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let value = cell.get_or_init(f).await.clone();

        let mut inflight = self.inflight.lock().await;
        if inflight.get(key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            inflight.remove(key);
        }

        value
    }

    /// Number of keys currently being fetched
    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the page behind `cursor` through `flights`
pub async fn fetch_cursor<S: ContentSource + ?Sized>(
    flights: &SingleFlight<PageResult>,
    source: &S,
    cursor: &str,
) -> PageResult {
    flights
        .run(cursor, move || async move {
            tracing::debug!("Loading more posts from {}", cursor);
            source.fetch_page(cursor).await.map_err(Arc::new)
        })
        .await
}

/// Whether `cursor` points at the same host as the content service endpoint
pub fn is_service_cursor(cursor: &str, endpoint: &str) -> bool {
    match (reqwest::Url::parse(cursor), reqwest::Url::parse(endpoint)) {
        (Ok(cursor), Ok(endpoint)) => {
            matches!(cursor.scheme(), "http" | "https")
                && cursor.host_str().is_some()
                && cursor.host_str() == endpoint.host_str()
                && cursor.port_or_known_default() == endpoint.port_or_known_default()
        }
        _ => false,
    }
}

/// Outcome of [`PostFeed::load_more`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was appended with this many posts
    Appended(usize),
    /// A concurrent call already applied this cursor
    AlreadyLoaded,
    /// There is no cursor; nothing to load
    Exhausted,
}

#[derive(Debug, Default)]
struct FeedState {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
}

/// The in-memory list of displayed posts
pub struct PostFeed {
    state: Mutex<FeedState>,
    flights: SingleFlight<PageResult>,
}

impl PostFeed {
    /// Start from the first listing page
    pub fn new(first: PostsPagination) -> Self {
        Self {
            state: Mutex::new(FeedState {
                posts: first.results,
                next_page: first.next_page,
            }),
            flights: SingleFlight::new(),
        }
    }

    /// Whether a "load more" affordance should be offered
    pub fn has_more(&self) -> bool {
        self.next_page().is_some()
    }

    pub fn next_page(&self) -> Option<String> {
        self.lock().next_page.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current posts and cursor
    pub fn snapshot(&self) -> PostsPagination {
        let state = self.lock();
        PostsPagination {
            next_page: state.next_page.clone(),
            results: state.posts.clone(),
        }
    }

    /// Fetch the current cursor, append its posts after the existing ones
    /// and advance to the page's own cursor. Existing entries are never
    /// removed, reordered or deduplicated.
    pub async fn load_more<S: ContentSource + ?Sized>(
        &self,
        source: &S,
        projector: &Projector,
    ) -> Result<LoadMore, Arc<ContentError>> {
        let Some(cursor) = self.next_page() else {
            return Ok(LoadMore::Exhausted);
        };

        let response = fetch_cursor(&self.flights, source, &cursor).await?;

        let mut state = self.lock();
        if state.next_page.as_deref() != Some(cursor.as_str()) {
            return Ok(LoadMore::AlreadyLoaded);
        }

        let page = paginate(&response, projector);
        let count = page.results.len();
        state.posts.extend(page.results);
        state.next_page = page.next_page;

        Ok(LoadMore::Appended(count))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        // A poisoned feed still holds a consistent list; keep serving it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
