//! Home page post list with incremental "load more" pagination
//!
//! A [`PostFeed`] starts from the first page produced at generation time and
//! grows by following the repository's `next_page` cursor. Loads are
//! single-flight: while one is outstanding, further calls are rejected with
//! [`FeedError::Busy`] instead of racing. A load either appends its whole
//! page and advances the cursor, or fails and leaves the feed untouched.
//! Readers never wait on a load; they see the feed before or after it.

use thiserror::Error;
use tokio::sync::Mutex;

use crate::cms::{CmsError, ContentSource};
use crate::content::{ContentError, PostPagination, PostSummary};
use crate::helpers::DateFormatter;

/// Why a load did not happen
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("a page is already being loaded")]
    Busy,

    #[error("there are no more posts to load")]
    Exhausted,

    #[error("failed to fetch the next page: {0}")]
    Fetch(#[from] CmsError),

    #[error("the next page contained a malformed post: {0}")]
    Content(#[from] ContentError),
}

/// Fetch and format the page behind a cursor
pub async fn fetch_page<S: ContentSource>(
    source: &S,
    formatter: &DateFormatter,
    cursor: &str,
) -> Result<PostPagination, FeedError> {
    let response = source.fetch_page(cursor).await?;
    Ok(PostPagination::from_response(response, formatter)?)
}

/// The visible post list and its cursor
pub struct PostFeed<S> {
    source: S,
    formatter: DateFormatter,
    state: Mutex<PostPagination>,
    /// Held for the whole of a load, and only by loads
    loading: Mutex<()>,
}

impl<S: ContentSource> PostFeed<S> {
    /// Start from an already formatted first page
    pub fn new(source: S, formatter: DateFormatter, initial: PostPagination) -> Self {
        Self {
            source,
            formatter,
            state: Mutex::new(initial),
            loading: Mutex::new(()),
        }
    }

    /// Fetch the first page of `doc_type` and start a feed from it
    pub async fn first_page(
        source: S,
        formatter: DateFormatter,
        doc_type: &str,
        page_size: usize,
    ) -> Result<Self, FeedError> {
        let response = source.get_by_type(doc_type, page_size).await?;
        let initial = PostPagination::from_response(response, &formatter)?;
        tracing::debug!(
            "Feed starts with {} posts, more: {}",
            initial.results.len(),
            initial.next_page.is_some()
        );
        Ok(Self::new(source, formatter, initial))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current results and cursor
    pub async fn snapshot(&self) -> PostPagination {
        self.state.lock().await.clone()
    }

    pub async fn results(&self) -> Vec<PostSummary> {
        self.state.lock().await.results.clone()
    }

    pub async fn next_page(&self) -> Option<String> {
        self.state.lock().await.next_page.clone()
    }

    pub async fn can_load_more(&self) -> bool {
        self.state.lock().await.next_page.is_some()
    }

    /// Load the next page and append it
    ///
    /// Returns the number of posts appended.
    pub async fn load_more(&self) -> Result<usize, FeedError> {
        let _loading = self.loading.try_lock().map_err(|_| FeedError::Busy)?;
        let cursor = self.next_page().await.ok_or(FeedError::Exhausted)?;

        let page = fetch_page(&self.source, &self.formatter, &cursor)
            .await
            .inspect_err(|e| tracing::warn!("Load more failed: {}", e))?;

        let mut state = self.state.lock().await;
        let added = page.results.len();
        state.results.extend(page.results);
        state.next_page = page.next_page;
        tracing::debug!(
            "Loaded {} more posts ({} total), more: {}",
            added,
            state.results.len(),
            state.next_page.is_some()
        );

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post, MemorySource};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn two_posts() -> MemorySource {
        MemorySource::new(vec![
            post("primeiro", "Primeiro", Some("2021-03-25T19:25:28+0000")),
            post("segundo", "Segundo", Some("2021-03-15T19:25:28+0000")),
        ])
    }

    async fn feed(source: MemorySource) -> PostFeed<MemorySource> {
        PostFeed::first_page(source, DateFormatter::default(), "posts", 1)
            .await
            .unwrap()
    }

    fn uids(results: &[PostSummary]) -> Vec<&str> {
        results.iter().map(|p| p.uid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_more_appends_in_order() {
        let feed = feed(two_posts()).await;
        assert_eq!(uids(&feed.results().await), ["primeiro"]);
        assert!(feed.can_load_more().await);

        assert_eq!(feed.load_more().await.unwrap(), 1);

        let snapshot = feed.snapshot().await;
        assert_eq!(uids(&snapshot.results), ["primeiro", "segundo"]);
        assert_eq!(snapshot.results[1].first_publication_date, "15 mar 2021");
        assert_eq!(snapshot.results[1].subtitle, "Sobre Segundo");
        assert_eq!(snapshot.next_page, None);
        assert!(!feed.can_load_more().await);
    }

    #[tokio::test]
    async fn test_exhausted_feed_rejects_load() {
        let feed = feed(two_posts()).await;
        feed.load_more().await.unwrap();

        let err = feed.load_more().await.unwrap_err();
        assert!(matches!(err, FeedError::Exhausted));
        assert_eq!(feed.results().await.len(), 2);
        assert_eq!(feed.source().page_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_page_feed() {
        let source = MemorySource::new(vec![post("unico", "Único", None)]);
        let feed = PostFeed::first_page(source, DateFormatter::default(), "posts", 10)
            .await
            .unwrap();
        assert!(!feed.can_load_more().await);
        assert!(matches!(feed.load_more().await, Err(FeedError::Exhausted)));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_unchanged() {
        let feed = feed(two_posts()).await;
        let before = feed.snapshot().await;

        feed.source().fail_pages.store(true, Ordering::SeqCst);
        let err = feed.load_more().await.unwrap_err();
        assert!(matches!(err, FeedError::Fetch(CmsError::Status { status: 503, .. })));
        assert_eq!(feed.snapshot().await, before);

        feed.source().fail_pages.store(false, Ordering::SeqCst);
        assert_eq!(feed.load_more().await.unwrap(), 1);
        assert_eq!(uids(&feed.results().await), ["primeiro", "segundo"]);
    }

    #[tokio::test]
    async fn test_malformed_page_leaves_state_unchanged() {
        let mut bad = post("quebrado", "Quebrado", None);
        bad.data.as_object_mut().unwrap().remove("title");
        let source = MemorySource::new(vec![post("ok", "Ok", None), bad]);

        let feed = feed(source).await;
        let before = feed.snapshot().await;

        let err = feed.load_more().await.unwrap_err();
        assert!(matches!(err, FeedError::Content(ContentError::MissingField { .. })));
        assert_eq!(feed.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_overlapping_load_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut source = two_posts();
        source.gate = Some(gate.clone());

        let feed = Arc::new(feed(source).await);

        let background = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load_more().await })
        };

        while !feed.source().started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        assert!(matches!(feed.load_more().await, Err(FeedError::Busy)));

        gate.notify_one();
        assert_eq!(background.await.unwrap().unwrap(), 1);

        assert_eq!(uids(&feed.results().await), ["primeiro", "segundo"]);
        assert_eq!(feed.source().page_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_during_read_is_not_busy() {
        let feed = Arc::new(feed(two_posts()).await);

        let reading = feed.state.lock().await;
        let load = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load_more().await })
        };
        tokio::task::yield_now().await;
        drop(reading);

        assert_eq!(load.await.unwrap().unwrap(), 1);
        assert_eq!(uids(&feed.results().await), ["primeiro", "segundo"]);
    }

    #[tokio::test]
    async fn test_reads_during_load_see_previous_page() {
        let gate = Arc::new(Notify::new());
        let mut source = two_posts();
        source.gate = Some(gate.clone());
        let feed = Arc::new(feed(source).await);

        let load = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.load_more().await })
        };
        while !feed.source().started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        assert_eq!(uids(&feed.results().await), ["primeiro"]);
        assert!(feed.can_load_more().await);

        gate.notify_one();
        load.await.unwrap().unwrap();
        assert!(!feed.can_load_more().await);
    }

    #[tokio::test]
    async fn test_fetch_page_formats_results() {
        let source = MemorySource::new(vec![
            post("a", "A", None),
            post("b", "B", None),
            post("c", "C", None),
        ]);
        let page = fetch_page(&source, &DateFormatter::default(), "memory://posts/2/2")
            .await
            .unwrap();
        assert_eq!(uids(&page.results), ["c"]);
        assert_eq!(page.next_page, None);

        let err = fetch_page(&source, &DateFormatter::default(), "https://elsewhere")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Fetch(CmsError::InvalidUrl { .. })));
    }
}
