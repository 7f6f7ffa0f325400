//! In-memory page index stitched together from successive feed windows.
//!
//! Feed windows arrive one API call at a time. Each window is recorded as
//! [`FeedMetadata`] and its ACTIVE items are cut into fixed-size pages that are
//! numbered globally, so the cursor the user moves around is independent of
//! which network calls have been made.

use std::collections::{BTreeMap, HashMap};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::feed::types::FeedItem;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 300;

/// Everything known about one feed window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedMetadata {
  pub feed_id: String,
  pub etag: Option<String>,
  pub last_modified: Option<String>,
  /// Token of the following window; `None` on the last one
  pub next_token: Option<String>,
  pub modified_since: Option<String>,
  pub is_first_page: bool,
  pub is_last_page: bool,
  /// Global page numbers holding this window's items, in order
  pub page_numbers: Vec<usize>,
  /// Page number of this window's first page
  pub overall_page_start: usize,
}

impl FeedMetadata {
  /// Overwrite with newer metadata for the same window.
  ///
  /// Validators only overwrite when present, the next token always does, and
  /// the page bookkeeping stays with the cache.
  fn merge(&mut self, newer: FeedMetadata) {
    self.feed_id = newer.feed_id;
    if newer.etag.is_some() {
      self.etag = newer.etag;
    }
    if newer.last_modified.is_some() {
      self.last_modified = newer.last_modified;
    }
    if newer.modified_since.is_some() {
      self.modified_since = newer.modified_since;
    }
    self.next_token = newer.next_token;
    self.is_first_page = newer.is_first_page;
    self.is_last_page = newer.is_last_page;
  }

  pub fn has_next_token(&self) -> bool {
    self.next_token.as_deref().is_some_and(|t| !t.is_empty())
  }
}

/// The user's position in the page index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
  pub current_page_index: usize,
  pub total_pages: usize,
  /// Feed whose metadata answers "is there more to fetch?"
  pub current_feed_id: Option<String>,
}

/// Page index plus the cursor over it.
pub struct PaginationCache {
  page_size: usize,
  state: PaginationState,
  feeds: HashMap<String, FeedMetadata>,
  /// Feed ids in the order they were first indexed
  feed_order: Vec<String>,
  pages: BTreeMap<usize, Vec<FeedItem>>,
  current_page: watch::Sender<Vec<FeedItem>>,
}

impl PaginationCache {
  pub fn new(page_size: usize) -> Self {
    let (current_page, _) = watch::channel(Vec::new());

    Self {
      page_size: page_size.max(1),
      state: PaginationState::default(),
      feeds: HashMap::new(),
      feed_order: Vec::new(),
      pages: BTreeMap::new(),
      current_page,
    }
  }

  #[cfg(test)]
  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn state(&self) -> &PaginationState {
    &self.state
  }

  pub fn feed(&self, feed_id: &str) -> Option<&FeedMetadata> {
    self.feeds.get(feed_id)
  }

  #[cfg(test)]
  pub fn feeds(&self) -> impl Iterator<Item = &FeedMetadata> {
    self.feeds.values()
  }

  /// Cached pages in page-number order.
  #[cfg(test)]
  pub fn pages(&self) -> impl Iterator<Item = (usize, &[FeedItem])> {
    self.pages.iter().map(|(n, items)| (*n, items.as_slice()))
  }

  /// Every cached job, page by page.
  pub fn all_jobs(&self) -> impl Iterator<Item = &FeedItem> {
    self.pages.values().flatten()
  }

  /// Items on the page under the cursor.
  #[cfg(test)]
  pub fn current_page(&self) -> Vec<FeedItem> {
    self.current_page.borrow().clone()
  }

  /// Stream of the page under the cursor, updated on every emit.
  pub fn subscribe(&self) -> watch::Receiver<Vec<FeedItem>> {
    self.current_page.subscribe()
  }

  /// Insert metadata for an unseen window, or merge into the known one.
  pub fn initialize_feed(&mut self, feed_id: &str, metadata: FeedMetadata) {
    match self.feeds.get_mut(feed_id) {
      Some(existing) => existing.merge(metadata),
      None => {
        self.feeds.insert(feed_id.to_string(), metadata);
        self.feed_order.push(feed_id.to_string());
      }
    }

    self.state.total_pages = self.pages.len();
  }

  /// Cut the window's ACTIVE jobs into pages and index them.
  ///
  /// Pages continue from the window's start offset after the pages it already
  /// holds. Unknown windows are ignored.
  pub fn add_jobs(&mut self, feed_id: &str, jobs: Vec<FeedItem>) {
    let Some(feed) = self.feeds.get_mut(feed_id) else {
      debug!(feed_id, "ignoring jobs for uninitialized feed");
      return;
    };

    let active: Vec<FeedItem> = jobs.into_iter().filter(FeedItem::is_active).collect();
    let first_page = feed.overall_page_start + feed.page_numbers.len();

    for (offset, chunk) in active.chunks(self.page_size).enumerate() {
      let page_number = first_page + offset;
      self.pages.insert(page_number, chunk.to_vec());
      feed.page_numbers.push(page_number);
    }

    self.state.total_pages = self.pages.len();
    debug!(
      feed_id,
      jobs = active.len(),
      total_pages = self.state.total_pages,
      "added jobs"
    );
  }

  /// Move the cursor. Out-of-range indices are logged and ignored.
  pub fn set_current_page(&mut self, page_index: usize) -> bool {
    if page_index >= self.state.total_pages {
      warn!(
        page_index,
        total_pages = self.state.total_pages,
        "invalid page index"
      );
      return false;
    }

    self.state.current_page_index = page_index;
    self.emit_current_page();
    true
  }

  /// Publish the page under the cursor (empty when there is none).
  pub fn emit_current_page(&self) {
    let jobs = self
      .pages
      .get(&self.state.current_page_index)
      .cloned()
      .unwrap_or_default();
    self.current_page.send_replace(jobs);
  }

  pub fn next_page_index(&self) -> Option<usize> {
    let next = self.state.current_page_index + 1;
    (next < self.state.total_pages).then_some(next)
  }

  pub fn previous_page_index(&self) -> Option<usize> {
    self.state.current_page_index.checked_sub(1)
  }

  /// Whether the cursor's feed has another window on the server.
  pub fn has_next_page(&self) -> bool {
    self
      .state
      .current_feed_id
      .as_deref()
      .and_then(|id| self.feeds.get(id))
      .is_some_and(FeedMetadata::has_next_token)
  }

  pub fn set_active_feed(&mut self, feed_id: Option<String>) {
    self.state.current_feed_id = feed_id;
  }

  /// Start offset for a window appended now: the pages held by every known
  /// window.
  pub fn overall_page_start(&self) -> usize {
    self.feeds.values().map(|f| f.page_numbers.len()).sum()
  }

  /// Forget `feed_id`, every window indexed after it, and their pages. Used
  /// before re-indexing a window that was fetched again.
  pub fn drop_feed_and_following(&mut self, feed_id: &str) {
    let Some(position) = self.feed_order.iter().position(|id| id == feed_id) else {
      return;
    };
    let start = self
      .feeds
      .get(feed_id)
      .map_or(0, |f| f.overall_page_start);

    for id in self.feed_order.drain(position..) {
      self.feeds.remove(&id);
    }
    self.pages.retain(|page_number, _| *page_number < start);
    self.state.total_pages = self.pages.len();

    if self.state.total_pages == 0 {
      self.state.current_page_index = 0;
    } else if self.state.current_page_index >= self.state.total_pages {
      self.state.current_page_index = self.state.total_pages - 1;
    }
    if let Some(current) = &self.state.current_feed_id {
      if !self.feeds.contains_key(current) {
        self.state.current_feed_id = None;
      }
    }

    debug!(feed_id, start, "dropped window and its followers");
  }

  /// Clear cursor, metadata and pages, and emit an empty page.
  pub fn reset(&mut self) {
    self.state = PaginationState::default();
    self.feeds.clear();
    self.feed_order.clear();
    self.pages.clear();
    self.current_page.send_replace(Vec::new());
    info!("pagination reset");
  }
}

impl Default for PaginationCache {
  fn default() -> Self {
    Self::new(DEFAULT_PAGE_SIZE)
  }
}
