//! Job fetch orchestration on top of the feed client and the page index.
//!
//! `JobService` owns the pagination state outright; every operation that
//! changes it takes `&mut self`, so a fetch's cache update is fully applied
//! before the next operation can observe the cache.

use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cache::{FeedMetadata, PaginationCache, PaginationState};
use crate::debounce::Debounce;
use crate::feed::types::{
  EntryStatus, FeedEntry, FeedItem, FeedPage, FeedRequest, Fetched, Validators,
};
use crate::feed::{FeedClient, HttpTransport};
use crate::filter::{filter_jobs, JobFilters};

/// Loading and error flags for the most recent request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatus {
  pub loading: bool,
  pub error: bool,
}

/// A search waiting for its quiet period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
  pub query: String,
  pub filters: JobFilters,
}

pub struct JobService<T> {
  client: FeedClient<T>,
  pagination: PaginationCache,
  status: watch::Sender<FetchStatus>,
  filtered: watch::Sender<Vec<FeedItem>>,
  search: Debounce<SearchRequest>,
}

impl<T: HttpTransport> JobService<T> {
  pub fn new(client: FeedClient<T>, page_size: usize, search_quiet: Duration) -> Self {
    let (status, _) = watch::channel(FetchStatus::default());
    let (filtered, _) = watch::channel(Vec::new());

    Self {
      client,
      pagination: PaginationCache::new(page_size),
      status,
      filtered,
      search: Debounce::new(search_quiet),
    }
  }

  pub fn pagination(&self) -> &PaginationCache {
    &self.pagination
  }

  pub fn pagination_state(&self) -> &PaginationState {
    self.pagination.state()
  }

  #[cfg(test)]
  pub fn status(&self) -> FetchStatus {
    *self.status.borrow()
  }

  pub fn subscribe_status(&self) -> watch::Receiver<FetchStatus> {
    self.status.subscribe()
  }

  /// Page under the cursor
  #[cfg(test)]
  pub fn current_page(&self) -> Vec<FeedItem> {
    self.pagination.current_page()
  }

  pub fn subscribe_jobs(&self) -> watch::Receiver<Vec<FeedItem>> {
    self.pagination.subscribe()
  }

  pub fn subscribe_filtered(&self) -> watch::Receiver<Vec<FeedItem>> {
    self.filtered.subscribe()
  }

  /// Fetch a feed window and index it.
  ///
  /// Returns the decoded window, or `None` when the request failed (the error
  /// flag is raised) or the server reported it unchanged.
  pub async fn fetch_jobs(&mut self, request: FeedRequest) -> Option<FeedPage> {
    if request.is_fresh() {
      self.pagination.reset();
    }

    self.begin_request();
    let outcome = self.client.fetch_feed(&request).await;

    let page = match outcome {
      Ok(Fetched::Updated {
        data,
        etag,
        last_modified,
      }) => {
        self.index_page(&request, &data, etag, last_modified);
        Some(data)
      }
      Ok(Fetched::NotModified) => {
        info!(?request, "feed not modified");
        self.pagination.emit_current_page();
        None
      }
      Err(e) => {
        error!("failed to fetch feed: {}", e);
        self.set_error();
        None
      }
    };

    self.end_request();
    page
  }

  /// Fetch a single job entry. No pagination state is touched.
  pub async fn fetch_entry(&mut self, id: &str, validators: &Validators) -> Option<FeedEntry> {
    self.begin_request();

    let entry = match self.client.fetch_entry(id, validators).await {
      Ok(Fetched::Updated { data, .. }) => Some(data),
      Ok(Fetched::NotModified) => {
        info!(id, "entry not modified");
        None
      }
      Err(e) => {
        error!("failed to fetch entry {}: {}", id, e);
        self.set_error();
        None
      }
    };

    self.end_request();
    entry
  }

  /// Resolve favorite ids into list rows, keeping only ACTIVE entries.
  ///
  /// Entries that fail to load are skipped; the error flag stays raised if
  /// any did.
  pub async fn fetch_favorites(&mut self, ids: &[String]) -> Vec<FeedItem> {
    let mut entries = Vec::with_capacity(ids.len());
    let mut failed = false;

    for id in ids {
      match self.fetch_entry(id, &Validators::default()).await {
        Some(entry) => entries.push(entry),
        None => failed |= self.status.borrow().error,
      }
    }
    if failed {
      self.set_error();
    }

    entries
      .into_iter()
      .filter(|entry| entry.status == EntryStatus::Active)
      .map(FeedItem::from)
      .collect()
  }

  /// Advance to the next page, fetching the next window when nothing more is
  /// cached. Windows without ACTIVE jobs are skipped. Returns whether the
  /// cursor moved.
  pub async fn fetch_next_page(&mut self) -> bool {
    if let Some(next) = self.pagination.next_page_index() {
      return self.pagination.set_current_page(next);
    }

    let mut visited = HashSet::new();
    loop {
      let Some(token) = self.next_token() else {
        info!("no further pages available");
        return false;
      };

      let Some(page) = self.fetch_jobs(FeedRequest::page(token)).await else {
        return false;
      };
      if !visited.insert(page.feed_id.clone()) {
        warn!(feed_id = %page.feed_id, "feed links back to a visited window");
        return false;
      }
      self.pagination.set_active_feed(Some(page.feed_id.clone()));

      if let Some(next) = self.pagination.next_page_index() {
        return self.pagination.set_current_page(next);
      }
      debug!(feed_id = %page.feed_id, "window added no pages, following its next token");
    }
  }

  /// Token of the window after the cursor's feed, if the server has one.
  fn next_token(&self) -> Option<String> {
    let feed_id = self.pagination.state().current_feed_id.as_deref()?;
    self
      .pagination
      .feed(feed_id)?
      .next_token
      .clone()
      .filter(|token| !token.is_empty())
  }

  /// Step back one page. Every visited page stays cached, so this never
  /// touches the network.
  pub fn fetch_previous_page(&mut self) -> bool {
    match self.pagination.previous_page_index() {
      Some(previous) => self.pagination.set_current_page(previous),
      None => false,
    }
  }

  /// Jump to a cached page.
  pub fn go_to_page(&mut self, page_index: usize) -> bool {
    self.pagination.set_current_page(page_index)
  }

  /// Revalidate the window under the cursor with its stored validators.
  pub async fn refresh_current_feed(&mut self) -> Option<FeedPage> {
    let feed_id = self.pagination.state().current_feed_id.clone()?;
    let etag = self.pagination.feed(&feed_id).and_then(|f| f.etag.clone());

    self.fetch_jobs(FeedRequest::refresh(feed_id, etag)).await
  }

  /// Search every cached page and publish the matches on the filtered stream.
  ///
  /// The result is a snapshot; pages fetched later are not searched until
  /// this is called again.
  pub fn search_and_filter(&mut self, query: &str, filters: &JobFilters) -> Vec<FeedItem> {
    self.status.send_modify(|s| s.loading = true);

    let found = filter_jobs(self.pagination.all_jobs(), query, filters);
    info!(query, matches = found.len(), "search");
    self.filtered.send_replace(found.clone());

    self.status.send_modify(|s| s.loading = false);
    found
  }

  /// Record a keystroke's worth of search input; it runs once input goes quiet.
  pub fn queue_search(&mut self, query: impl Into<String>, filters: JobFilters) {
    self.search.push(SearchRequest {
      query: query.into(),
      filters,
    });
  }

  #[cfg(test)]
  pub fn queue_search_at(&mut self, query: impl Into<String>, filters: JobFilters, now: Instant) {
    self.search.push_at(
      SearchRequest {
        query: query.into(),
        filters,
      },
      now,
    );
  }

  /// Run the queued search if its quiet period is over.
  pub fn poll_search(&mut self) -> Option<Vec<FeedItem>> {
    let request = self.search.poll()?;
    Some(self.search_and_filter(&request.query, &request.filters))
  }

  #[cfg(test)]
  pub fn poll_search_at(&mut self, now: Instant) -> Option<Vec<FeedItem>> {
    let request = self.search.poll_at(now)?;
    Some(self.search_and_filter(&request.query, &request.filters))
  }

  /// When the queued search becomes due.
  pub fn search_deadline(&self) -> Option<Instant> {
    self.search.deadline()
  }

  pub fn cancel_search(&mut self) {
    if self.search.cancel().is_some() {
      warn!("queued search cancelled");
    }
  }

  /// Index a freshly decoded window.
  fn index_page(
    &mut self,
    request: &FeedRequest,
    page: &FeedPage,
    etag: Option<String>,
    last_modified: Option<String>,
  ) {
    let feed_id = page.feed_id.as_str();
    let active: Vec<FeedItem> = page
      .items
      .iter()
      .filter(|item| item.is_active())
      .cloned()
      .collect();

    // A window fetched again replaces its old pages and everything after them
    let previous = self.pagination.feed(feed_id).cloned();
    if previous.is_some() {
      self.pagination.drop_feed_and_following(feed_id);
    }

    // A refresh revalidates a known window by token; where it sits in the
    // feed does not change
    let (is_first_page, modified_since) = match previous {
      Some(previous) if request.is_refresh => (previous.is_first_page, previous.modified_since),
      _ => (
        request.next_token.is_none() && !request.is_latest(),
        request.since.as_ref().map(|s| s.as_str().to_string()),
      ),
    };

    let metadata = FeedMetadata {
      feed_id: feed_id.to_string(),
      etag,
      last_modified,
      next_token: page.next_token.clone(),
      modified_since,
      is_first_page,
      is_last_page: page.next_token.is_none(),
      page_numbers: Vec::new(),
      overall_page_start: self.pagination.overall_page_start(),
    };

    info!(
      feed_id,
      items = page.items.len(),
      active = active.len(),
      start = metadata.overall_page_start,
      "indexing feed window"
    );

    self.pagination.initialize_feed(feed_id, metadata);
    self.pagination.add_jobs(feed_id, active);

    if request.is_fresh() || self.pagination.state().current_feed_id.is_none() {
      self.pagination.set_active_feed(Some(feed_id.to_string()));
    }
    self.pagination.emit_current_page();
  }

  fn begin_request(&self) {
    self.status.send_replace(FetchStatus {
      loading: true,
      error: false,
    });
  }

  fn set_error(&self) {
    self.status.send_modify(|s| s.error = true);
  }

  fn end_request(&self) {
    self.status.send_modify(|s| s.loading = false);
  }
}
