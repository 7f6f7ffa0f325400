use chrono::{DateTime, Months, TimeDelta, Utc};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Publication status of a job posting. Anything the API sends besides
/// ACTIVE and INACTIVE decodes as `Unknown` and is never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
  Active,
  Inactive,
  #[serde(other)]
  Unknown,
}

impl EntryStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      EntryStatus::Active => "ACTIVE",
      EntryStatus::Inactive => "INACTIVE",
      EntryStatus::Unknown => "UNKNOWN",
    }
  }
}

/// Summary embedded in every feed item
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntrySummary {
  pub uuid: String,
  pub status: EntryStatus,
  pub title: String,
  pub employer_name: String,
  pub municipality: String,
  pub last_modified: String,
}

/// One job posting in a feed window
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
  pub id: String,
  pub url: String,
  pub title: String,
  pub content_text: String,
  pub date_modified: String,
  pub summary: FeedEntrySummary,
}

impl FeedItem {
  pub fn is_active(&self) -> bool {
    self.summary.status == EntryStatus::Active
  }

  /// `date_modified` as a timestamp, if the API sent RFC 3339
  pub fn modified_at(&self) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&self.date_modified)
      .ok()
      .map(|d| d.with_timezone(&Utc))
  }
}

/// Placeholder for text fields a full entry may lack
const UNKNOWN: &str = "Unknown";

/// List row for a fully fetched entry, such as a favorite. Missing title,
/// employer and municipality fall back to placeholders; the municipality
/// comes from the first work location.
impl From<FeedEntry> for FeedItem {
  fn from(entry: FeedEntry) -> Self {
    let details = entry.details;
    let title = details
      .title
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| "Unknown Title".to_string());
    let employer_name = details
      .employer
      .map(|e| e.name)
      .filter(|name| !name.is_empty())
      .unwrap_or_else(|| UNKNOWN.to_string());
    let municipality = details
      .work_locations
      .into_iter()
      .next()
      .and_then(|location| location.municipal)
      .filter(|m| !m.is_empty())
      .unwrap_or_else(|| UNKNOWN.to_string());

    FeedItem {
      id: entry.uuid.clone(),
      url: details.link.unwrap_or_default(),
      title: title.clone(),
      content_text: details
        .description
        .unwrap_or_else(|| "No description available".to_string()),
      date_modified: entry.last_modified.clone(),
      summary: FeedEntrySummary {
        uuid: entry.uuid,
        status: entry.status,
        title,
        employer_name,
        municipality,
        last_modified: entry.last_modified,
      },
    }
  }
}

/// A decoded feed window
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
  pub feed_id: String,
  /// Token of the following window; `None` on the last one
  pub next_token: Option<String>,
  pub items: Vec<FeedItem>,
  pub version: String,
  pub title: String,
  pub home_page_url: String,
  pub feed_url: String,
  pub description: String,
  pub next_url: Option<String>,
}

/// Full job entry for detail views
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
  pub uuid: String,
  pub status: EntryStatus,
  pub last_modified: String,
  pub details: FeedEntryDetails,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntryDetails {
  pub title: Option<String>,
  pub description: Option<String>,
  pub job_title: Option<String>,
  pub link: Option<String>,
  pub source_url: Option<String>,
  pub source: Option<String>,
  pub application_url: Option<String>,
  pub application_due: Option<String>,
  pub employer: Option<Employer>,
  pub work_locations: Vec<WorkLocation>,
  pub contacts: Vec<Contact>,
  pub occupation_categories: Vec<OccupationCategory>,
  pub categories: Vec<Category>,
  pub engagement_type: Option<String>,
  pub extent: Option<String>,
  pub start_time: Option<String>,
  pub position_count: Option<String>,
  pub sector: Option<String>,
  pub published: Option<String>,
  pub expires: Option<String>,
  pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employer {
  pub name: String,
  pub orgnr: Option<String>,
  pub description: Option<String>,
  pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkLocation {
  pub country: Option<String>,
  pub address: Option<String>,
  pub city: Option<String>,
  pub postal_code: Option<String>,
  pub county: Option<String>,
  pub municipal: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
  pub name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub role: Option<String>,
  pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupationCategory {
  pub level1: Option<String>,
  pub level2: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
  pub category_type: Option<String>,
  pub code: Option<String>,
  pub name: Option<String>,
  pub score: Option<f64>,
}

/// Lower bound for a feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinceFilter {
  /// Ask the API for its most recent window (`?last=true`)
  Latest,
  /// HTTP date sent as `If-Modified-Since`
  Date(String),
}

impl SinceFilter {
  /// Value recorded in feed metadata
  pub fn as_str(&self) -> &str {
    match self {
      SinceFilter::Latest => "last",
      SinceFilter::Date(date) => date,
    }
  }
}

/// Preset lower bounds offered when browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
  /// The most recent window only
  Last,
  Day,
  Week,
  Month,
}

impl TimeRange {
  pub fn label(&self) -> &'static str {
    match self {
      TimeRange::Last => "last",
      TimeRange::Day => "24h",
      TimeRange::Week => "7days",
      TimeRange::Month => "1month",
    }
  }

  /// Resolve against `now`: `Last` is the `?last=true` sentinel, the others
  /// an `If-Modified-Since` date.
  pub fn since(&self, now: DateTime<Utc>) -> SinceFilter {
    let from = match self {
      TimeRange::Last => return SinceFilter::Latest,
      TimeRange::Day => now - TimeDelta::hours(24),
      TimeRange::Week => now - TimeDelta::days(7),
      TimeRange::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
    };
    SinceFilter::Date(http_date(from))
  }
}

impl FromStr for TimeRange {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [TimeRange::Last, TimeRange::Day, TimeRange::Week, TimeRange::Month]
      .into_iter()
      .find(|range| range.label().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| format!("unknown time range '{}' (one of: last, 24h, 7days, 1month)", s))
  }
}

/// IMF-fixdate, as HTTP date headers expect
pub fn http_date(at: DateTime<Utc>) -> String {
  at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Cache validators sent with a conditional GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
  pub etag: Option<String>,
  pub modified_since: Option<String>,
}

impl Validators {
  #[cfg(test)]
  pub fn etag(etag: impl Into<String>) -> Self {
    Self {
      etag: Some(etag.into()),
      modified_since: None,
    }
  }
}

/// Parameters of a single `fetch_jobs` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedRequest {
  pub next_token: Option<String>,
  pub since: Option<SinceFilter>,
  pub etag: Option<String>,
  pub is_refresh: bool,
}

impl FeedRequest {
  /// Head of the feed
  pub fn head() -> Self {
    Self::default()
  }

  /// The latest window (`?last=true`)
  pub fn latest() -> Self {
    Self::since(SinceFilter::Latest)
  }

  /// Head of the feed bounded by `since`
  pub fn since(since: SinceFilter) -> Self {
    Self {
      since: Some(since),
      ..Self::default()
    }
  }

  /// A specific window by its token
  pub fn page(token: impl Into<String>) -> Self {
    Self {
      next_token: Some(token.into()),
      ..Self::default()
    }
  }

  /// Revalidate the window `token` with the validators seen last time.
  pub fn refresh(token: impl Into<String>, etag: Option<String>) -> Self {
    Self {
      next_token: Some(token.into()),
      etag,
      is_refresh: true,
      ..Self::default()
    }
  }

  #[cfg(test)]
  pub fn modified_since(mut self, date: impl Into<String>) -> Self {
    self.since = Some(SinceFilter::Date(date.into()));
    self
  }

  /// A fresh request starts pagination over.
  pub fn is_fresh(&self) -> bool {
    self.next_token.is_none() && !self.is_refresh
  }

  pub fn is_latest(&self) -> bool {
    matches!(self.since, Some(SinceFilter::Latest))
  }

  /// Conditional headers for this request. The `Latest` sentinel only selects
  /// the URL and never becomes a date header.
  pub fn validators(&self) -> Validators {
    Validators {
      etag: self.etag.clone(),
      modified_since: match &self.since {
        Some(SinceFilter::Date(date)) => Some(date.clone()),
        _ => None,
      },
    }
  }
}

/// Outcome of a conditional fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
  Updated {
    data: T,
    etag: Option<String>,
    last_modified: Option<String>,
  },
  NotModified,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fresh_requests() {
    assert!(FeedRequest::head().is_fresh());
    assert!(FeedRequest::latest().is_fresh());
    assert!(!FeedRequest::page("t").is_fresh());
    assert!(!FeedRequest::refresh("t", None).is_fresh());
  }

  #[test]
  fn test_latest_is_not_a_date_header() {
    assert_eq!(FeedRequest::latest().validators(), Validators::default());

    let dated = FeedRequest::head().modified_since("Tue, 24 Feb 2026 10:00:00 GMT");
    assert_eq!(
      dated.validators().modified_since.as_deref(),
      Some("Tue, 24 Feb 2026 10:00:00 GMT")
    );
  }

  #[test]
  fn test_time_range_presets() {
    let now = DateTime::parse_from_rfc3339("2026-03-31T12:30:00Z")
      .unwrap()
      .with_timezone(&Utc);

    assert_eq!(TimeRange::Last.since(now), SinceFilter::Latest);
    assert_eq!(
      TimeRange::Day.since(now),
      SinceFilter::Date("Mon, 30 Mar 2026 12:30:00 GMT".to_string())
    );
    assert_eq!(
      TimeRange::Week.since(now),
      SinceFilter::Date("Tue, 24 Mar 2026 12:30:00 GMT".to_string())
    );
    // Month arithmetic clamps to the last day of the shorter month
    assert_eq!(
      TimeRange::Month.since(now),
      SinceFilter::Date("Sat, 28 Feb 2026 12:30:00 GMT".to_string())
    );
  }

  #[test]
  fn test_time_range_labels() {
    assert_eq!("24h".parse::<TimeRange>(), Ok(TimeRange::Day));
    assert_eq!("7DAYS".parse::<TimeRange>(), Ok(TimeRange::Week));
    assert_eq!("1month".parse::<TimeRange>(), Ok(TimeRange::Month));
    assert_eq!("last".parse::<TimeRange>(), Ok(TimeRange::Last));
    assert!("fortnight".parse::<TimeRange>().is_err());
  }

  #[test]
  fn test_entry_becomes_list_item() {
    let entry = FeedEntry {
      uuid: "e-1".to_string(),
      status: EntryStatus::Active,
      last_modified: "2024-05-02T08:00:00Z".to_string(),
      details: FeedEntryDetails {
        title: Some("Nurse B".to_string()),
        link: Some("https://jobs.test/e-1".to_string()),
        employer: Some(Employer {
          name: "Acme".to_string(),
          orgnr: None,
          description: None,
          homepage: None,
        }),
        work_locations: vec![
          WorkLocation {
            country: None,
            address: None,
            city: Some("Oslo".to_string()),
            postal_code: None,
            county: None,
            municipal: Some("OSLO".to_string()),
          },
          WorkLocation {
            country: None,
            address: None,
            city: None,
            postal_code: None,
            county: None,
            municipal: Some("BERGEN".to_string()),
          },
        ],
        ..FeedEntryDetails::default()
      },
    };

    let item = FeedItem::from(entry);

    assert_eq!(item.id, "e-1");
    assert_eq!(item.url, "https://jobs.test/e-1");
    assert_eq!(item.title, "Nurse B");
    assert_eq!(item.content_text, "No description available");
    assert_eq!(item.date_modified, "2024-05-02T08:00:00Z");
    assert_eq!(item.summary.employer_name, "Acme");
    assert_eq!(item.summary.municipality, "OSLO");
    assert!(item.is_active());
  }

  #[test]
  fn test_entry_without_details_uses_placeholders() {
    let entry = FeedEntry {
      uuid: "e-2".to_string(),
      status: EntryStatus::Inactive,
      last_modified: String::new(),
      details: FeedEntryDetails::default(),
    };

    let item = FeedItem::from(entry);

    assert_eq!(item.title, "Unknown Title");
    assert_eq!(item.summary.title, "Unknown Title");
    assert_eq!(item.summary.employer_name, "Unknown");
    assert_eq!(item.summary.municipality, "Unknown");
    assert_eq!(item.url, "");
    assert!(!item.is_active());
  }

  #[test]
  fn test_modified_at_parses_rfc3339() {
    let item = FeedItem {
      id: "a".to_string(),
      url: String::new(),
      title: String::new(),
      content_text: String::new(),
      date_modified: "2024-05-01T10:00:00+02:00".to_string(),
      summary: FeedEntrySummary {
        uuid: "a".to_string(),
        status: EntryStatus::Active,
        title: String::new(),
        employer_name: String::new(),
        municipality: String::new(),
        last_modified: String::new(),
      },
    };

    let parsed = item.modified_at().unwrap();
    assert_eq!(parsed.to_rfc3339(), "2024-05-01T08:00:00+00:00");
  }
}
