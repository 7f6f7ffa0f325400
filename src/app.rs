use crate::cache::{ResponseCacheLayer, SqliteStore};
use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::feed::types::{FeedEntry, FeedItem, FeedRequest, SinceFilter, Validators};
use crate::feed::{FeedClient, ReqwestTransport};
use crate::filter::JobFilters;
use crate::service::{FetchStatus, JobService};
use color_eyre::{eyre::eyre, Result};
use tokio::sync::watch;
use tracing::{info, warn};

type Service = JobService<ResponseCacheLayer<ReqwestTransport>>;

/// Where a session starts reading the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Start {
  #[default]
  Head,
  Since(SinceFilter),
}

impl Start {
  fn request(&self) -> FeedRequest {
    match self {
      Start::Head => FeedRequest::head(),
      Start::Since(since) => FeedRequest::since(since.clone()),
    }
  }
}

/// Which pages `browse` prints
#[derive(Debug, Clone, Default)]
pub struct BrowseOptions {
  /// 0-based page to start from
  pub first: usize,
  pub pages: usize,
  /// Walk towards the head instead of away from it
  pub backwards: bool,
  /// Revalidate the starting window before printing
  pub refresh: bool,
}

pub struct App {
  config: Config,
  favorites: FavoritesStore<SqliteStore>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let favorites = FavoritesStore::new(SqliteStore::open()?);
    Ok(Self { config, favorites })
  }

  /// Build the feed service. Only commands that talk to the API need a token.
  fn connect(&self) -> Result<Service> {
    let token = Config::get_api_token()?;
    let transport = ResponseCacheLayer::new(ReqwestTransport::new(self.config.api.timeout())?);
    let client = FeedClient::new(transport, &self.config.api, token)?;

    Ok(JobService::new(
      client,
      self.config.pagination.page_size,
      self.config.search.debounce(),
    ))
  }

  /// Print pages starting at `options.first`, fetching windows as needed.
  pub async fn browse(&self, start: Start, options: BrowseOptions) -> Result<()> {
    let mut service = self.connect()?;
    let status = service.subscribe_status();
    let mut jobs = service.subscribe_jobs();
    load_first_window(&mut service, &start, &status).await?;

    while service.pagination_state().current_page_index < options.first {
      if !service.fetch_next_page().await {
        check_status(&status)?;
        return Err(eyre!(
          "Page {} is out of range ({} pages available)",
          options.first + 1,
          service.pagination_state().total_pages
        ));
      }
    }

    if options.refresh {
      match service.refresh_current_feed().await {
        Some(page) => println!("-- window {} revalidated: updated --", page.feed_id),
        None => {
          check_status(&status)?;
          println!("-- window unchanged --");
        }
      }
    }

    for shown in 0..options.pages.max(1) {
      if shown > 0 {
        let moved = if options.backwards {
          service.fetch_previous_page()
        } else {
          service.fetch_next_page().await
        };
        if !moved {
          check_status(&status)?;
          println!(
            "{}",
            if options.backwards { "-- start of feed --" } else { "-- end of feed --" }
          );
          break;
        }
      }

      let state = service.pagination_state();
      println!(
        "== Page {} of {}{} ==",
        state.current_page_index + 1,
        state.total_pages,
        if service.pagination().has_next_page() { "+" } else { "" }
      );
      let page = jobs.borrow_and_update().clone();
      self.print_jobs(&page);
    }

    Ok(())
  }

  /// Load `windows` feed windows, then run a debounced search over them.
  /// Ctrl-C during the quiet period cancels the search.
  pub async fn search(
    &self,
    query: &str,
    filters: JobFilters,
    start: Start,
    windows: usize,
  ) -> Result<()> {
    let mut service = self.connect()?;
    let status = service.subscribe_status();
    let filtered = service.subscribe_filtered();
    load_first_window(&mut service, &start, &status).await?;

    for _ in 1..windows.max(1) {
      let last = service.pagination_state().total_pages.saturating_sub(1);
      service.go_to_page(last);
      if !service.fetch_next_page().await {
        check_status(&status)?;
        break;
      }
    }

    service.queue_search(query, filters);
    if let Some(deadline) = service.search_deadline() {
      tokio::select! {
        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {}
        _ = tokio::signal::ctrl_c() => {
          service.cancel_search();
          println!("Search cancelled");
          return Ok(());
        }
      }
    }
    if service.poll_search().is_none() {
      return Err(eyre!("Search did not run"));
    }

    let found = filtered.borrow().clone();
    info!(query, matches = found.len(), "search finished");
    println!(
      "== {} match(es) across {} cached page(s) ==",
      found.len(),
      service.pagination_state().total_pages
    );
    self.print_jobs(&found);
    Ok(())
  }

  pub async fn show_entry(&self, id: &str) -> Result<()> {
    let mut service = self.connect()?;
    let status = service.subscribe_status();

    let Some(entry) = service.fetch_entry(id, &Validators::default()).await else {
      check_status(&status)?;
      return Err(eyre!("Entry {} was not returned", id));
    };

    self.print_entry(&entry);
    Ok(())
  }

  /// Print favorites that are still ACTIVE, resolved through the API.
  pub async fn list_favorites(&self) -> Result<()> {
    let ids = self.favorites.list();
    if ids.is_empty() {
      println!("No favorites yet");
      return Ok(());
    }

    let mut service = self.connect()?;
    let status = service.subscribe_status();
    let items = service.fetch_favorites(&ids).await;
    if status.borrow().error {
      warn!("some favorites could not be loaded");
      println!("(some favorites could not be loaded; see the log)");
    }

    println!("== {} active of {} favorite(s) ==", items.len(), ids.len());
    self.print_jobs(&items);
    Ok(())
  }

  pub fn add_favorite(&self, id: &str) {
    self.favorites.add(id);
    println!("Added {}", id);
  }

  pub fn remove_favorite(&self, id: &str) {
    self.favorites.remove(id);
    println!("Removed {}", id);
  }

  pub fn toggle_favorite(&self, id: &str) {
    if self.favorites.toggle(id) {
      println!("Added {}", id);
    } else {
      println!("Removed {}", id);
    }
  }

  fn print_jobs(&self, jobs: &[FeedItem]) {
    if jobs.is_empty() {
      println!("(no jobs)");
      return;
    }

    let favorites = self.favorites.list();
    for job in jobs {
      let marker = if favorites.contains(&job.id) { "*" } else { " " };
      let date = job
        .modified_at()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| job.date_modified.clone());

      println!(
        "{} {}  {} | {} | {} | {}",
        marker, job.id, job.title, job.summary.employer_name, job.summary.municipality, date
      );
    }
  }

  fn print_entry(&self, entry: &FeedEntry) {
    let details = &entry.details;
    let marker = if self.favorites.is_favorite(&entry.uuid) { " *" } else { "" };

    println!(
      "{}{}",
      details.title.as_deref().unwrap_or("(untitled)"),
      marker
    );
    println!("  id:       {}", entry.uuid);
    println!("  status:   {}", entry.status.as_str());
    println!("  updated:  {}", entry.last_modified);

    if let Some(employer) = &details.employer {
      println!("  employer: {}", employer.name);
    }
    for location in &details.work_locations {
      let place: Vec<&str> = [&location.address, &location.postal_code, &location.city]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
      if !place.is_empty() {
        println!("  location: {}", place.join(", "));
      }
    }
    let optional = [
      ("job title", &details.job_title),
      ("extent", &details.extent),
      ("sector", &details.sector),
      ("apply by", &details.application_due),
      ("apply at", &details.application_url),
      ("link", &details.link),
    ];
    for (label, value) in optional {
      if let Some(value) = value {
        println!("  {:<9} {}", format!("{}:", label), value);
      }
    }
    for contact in &details.contacts {
      let parts: Vec<&str> = [&contact.name, &contact.email, &contact.phone]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
      if !parts.is_empty() {
        println!("  contact:  {}", parts.join(" / "));
      }
    }
    if let Some(description) = &details.description {
      println!();
      println!("{}", description);
    }
  }
}

async fn load_first_window(
  service: &mut Service,
  start: &Start,
  status: &watch::Receiver<FetchStatus>,
) -> Result<()> {
  if service.fetch_jobs(start.request()).await.is_none() {
    check_status(status)?;
  }
  Ok(())
}

fn check_status(status: &watch::Receiver<FetchStatus>) -> Result<()> {
  if status.borrow().error {
    return Err(eyre!("Request to the job feed failed; see the log for details"));
  }
  Ok(())
}
