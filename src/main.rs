mod app;
mod cache;
mod config;
mod debounce;
mod favorites;
mod feed;
mod filter;
mod logging;
mod service;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use crate::app::{App, BrowseOptions, Start};
use crate::feed::types::{SinceFilter, TimeRange};
use crate::filter::{JobAttribute, JobFilters};

#[derive(Parser, Debug)]
#[command(name = "jobboard")]
#[command(about = "Browse, search and bookmark postings from a paginated job feed")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jobboard/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Page through active job postings
  Browse {
    /// Number of pages to print
    #[arg(short = 'n', long, default_value_t = 1)]
    pages: usize,

    /// First page to print (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Print towards the head of the feed, starting at --page
    #[arg(short, long)]
    back: bool,

    /// Revalidate the starting window before printing
    #[arg(short, long)]
    refresh: bool,

    #[command(flatten)]
    start: StartArgs,
  },
  /// Search cached postings by title, employer or municipality
  Search {
    query: String,

    /// Exact-match filter, e.g. `municipality=OSLO` (repeatable)
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(JobAttribute, String)>,

    /// Number of feed windows to load before searching
    #[arg(short = 'w', long, default_value_t = 1)]
    windows: usize,

    #[command(flatten)]
    start: StartArgs,
  },
  /// Show the full details of one posting
  Entry { id: String },
  /// Manage favorite postings
  #[command(subcommand)]
  Favorites(FavoritesCommand),
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
  /// List favorite postings that are still active
  List,
  Add { id: String },
  Remove { id: String },
  /// Add the posting if missing, remove it otherwise
  Toggle { id: String },
}

#[derive(clap::Args, Debug)]
struct StartArgs {
  /// Start from the most recent feed window
  #[arg(long, conflicts_with = "since")]
  latest: bool,

  /// Only postings modified within a range (last, 24h, 7days, 1month) or
  /// since an HTTP date
  #[arg(long)]
  since: Option<String>,
}

impl StartArgs {
  fn into_start(self, now: DateTime<Utc>) -> Start {
    if self.latest {
      return Start::Since(SinceFilter::Latest);
    }

    match self.since {
      Some(raw) => match raw.parse::<TimeRange>() {
        Ok(range) => Start::Since(range.since(now)),
        Err(_) => Start::Since(SinceFilter::Date(raw)),
      },
      None => Start::Head,
    }
  }
}

fn parse_filter(raw: &str) -> Result<(JobAttribute, String), String> {
  let (label, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected attribute=value, got '{}'", raw))?;

  let attribute = JobAttribute::from_label(label.trim()).ok_or_else(|| {
    let known: Vec<&str> = JobAttribute::all_variants().iter().map(|a| a.label()).collect();
    format!("unknown attribute '{}' (one of: {})", label, known.join(", "))
  })?;

  Ok((attribute, value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = logging::init()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let app = App::new(config)?;

  match args.command {
    Command::Browse {
      pages,
      page,
      back,
      refresh,
      start,
    } => {
      let options = BrowseOptions {
        first: page.saturating_sub(1),
        pages,
        backwards: back,
        refresh,
      };
      app.browse(start.into_start(Utc::now()), options).await?
    }
    Command::Search {
      query,
      filters,
      windows,
      start,
    } => {
      let filters = filters
        .into_iter()
        .fold(JobFilters::new(), |acc, (attribute, value)| acc.with(attribute, value));
      app
        .search(&query, filters, start.into_start(Utc::now()), windows)
        .await?
    }
    Command::Entry { id } => app.show_entry(&id).await?,
    Command::Favorites(command) => match command {
      FavoritesCommand::List => app.list_favorites().await?,
      FavoritesCommand::Add { id } => app.add_favorite(&id),
      FavoritesCommand::Remove { id } => app.remove_favorite(&id),
      FavoritesCommand::Toggle { id } => app.toggle_favorite(&id),
    },
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_filter() {
    let (attribute, value) = parse_filter("Municipality = OSLO").unwrap();
    assert_eq!(attribute, JobAttribute::Municipality);
    assert_eq!(value, "OSLO");

    assert!(parse_filter("municipality").is_err());
    assert!(parse_filter("salary=1").is_err());
  }

  #[test]
  fn test_cli_parses_subcommands() {
    let args = Args::parse_from(["jobboard", "search", "nurse", "-f", "status=ACTIVE", "--latest"]);
    let Command::Search {
      query,
      filters,
      start,
      ..
    } = args.command
    else {
      panic!("expected search");
    };
    assert_eq!(query, "nurse");
    assert_eq!(filters, vec![(JobAttribute::Status, "ACTIVE".to_string())]);
    assert_eq!(start.into_start(Utc::now()), Start::Since(SinceFilter::Latest));

    assert!(Args::try_parse_from(["jobboard", "browse", "--latest", "--since", "x"]).is_err());
  }

  #[test]
  fn test_since_accepts_presets_and_dates() {
    let now = DateTime::parse_from_rfc3339("2026-03-31T12:30:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let start = |since: &str| {
      let args = Args::parse_from(["jobboard", "browse", "--since", since]);
      let Command::Browse { start, .. } = args.command else {
        panic!("expected browse");
      };
      start.into_start(now)
    };

    assert_eq!(start("last"), Start::Since(SinceFilter::Latest));
    assert_eq!(
      start("24h"),
      Start::Since(SinceFilter::Date("Mon, 30 Mar 2026 12:30:00 GMT".to_string()))
    );
    assert_eq!(
      start("Tue, 24 Feb 2026 10:00:00 GMT"),
      Start::Since(SinceFilter::Date("Tue, 24 Feb 2026 10:00:00 GMT".to_string()))
    );
  }

  #[test]
  fn test_browse_flags() {
    let args = Args::parse_from(["jobboard", "browse", "-p", "3", "-n", "2", "--back", "--refresh"]);
    let Command::Browse {
      pages,
      page,
      back,
      refresh,
      start,
    } = args.command
    else {
      panic!("expected browse");
    };
    assert_eq!((pages, page, back, refresh), (2, 3, true, true));
    assert_eq!(start.into_start(Utc::now()), Start::Head);
  }
}
