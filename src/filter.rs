//! Free-text search and attribute filters over cached jobs.

use std::collections::BTreeMap;

use crate::feed::types::FeedItem;

/// Attribute of a job that can be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobAttribute {
  Id,
  Url,
  Title,
  ContentText,
  DateModified,
  Status,
  EmployerName,
  Municipality,
  EntryTitle,
}

impl JobAttribute {
  /// Extract the value of this attribute from a job
  pub fn value<'a>(&self, job: &'a FeedItem) -> &'a str {
    match self {
      JobAttribute::Id => &job.id,
      JobAttribute::Url => &job.url,
      JobAttribute::Title => &job.title,
      JobAttribute::ContentText => &job.content_text,
      JobAttribute::DateModified => &job.date_modified,
      JobAttribute::Status => job.summary.status.as_str(),
      JobAttribute::EmployerName => &job.summary.employer_name,
      JobAttribute::Municipality => &job.summary.municipality,
      JobAttribute::EntryTitle => &job.summary.title,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      JobAttribute::Id => "id",
      JobAttribute::Url => "url",
      JobAttribute::Title => "title",
      JobAttribute::ContentText => "content_text",
      JobAttribute::DateModified => "date_modified",
      JobAttribute::Status => "status",
      JobAttribute::EmployerName => "employer",
      JobAttribute::Municipality => "municipality",
      JobAttribute::EntryTitle => "entry_title",
    }
  }

  pub fn all_variants() -> &'static [Self] {
    &[
      JobAttribute::Id,
      JobAttribute::Url,
      JobAttribute::Title,
      JobAttribute::ContentText,
      JobAttribute::DateModified,
      JobAttribute::Status,
      JobAttribute::EmployerName,
      JobAttribute::Municipality,
      JobAttribute::EntryTitle,
    ]
  }

  /// Attribute named `label`, as accepted on the command line
  pub fn from_label(label: &str) -> Option<Self> {
    Self::all_variants()
      .iter()
      .copied()
      .find(|attribute| attribute.label().eq_ignore_ascii_case(label))
  }
}

/// Fields the free-text query is matched against
const SEARCHED: [JobAttribute; 3] = [
  JobAttribute::Title,
  JobAttribute::EmployerName,
  JobAttribute::Municipality,
];

/// Exact-match filters, ANDed together. `None` values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilters {
  values: BTreeMap<JobAttribute, Option<String>>,
}

impl JobFilters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, attribute: JobAttribute, value: impl Into<String>) -> Self {
    self.set(attribute, Some(value.into()));
    self
  }

  pub fn set(&mut self, attribute: JobAttribute, value: Option<String>) {
    self.values.insert(attribute, value);
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.values.values().all(Option::is_none)
  }

  /// True when every provided filter value equals the job's attribute.
  pub fn matches(&self, job: &FeedItem) -> bool {
    self.values.iter().all(|(attribute, expected)| match expected {
      Some(expected) => attribute.value(job) == expected,
      None => true,
    })
  }
}

/// Jobs matching `query` on any searched field and every filter, in input
/// order. The query is a case-insensitive substring; an empty one matches all.
pub fn filter_jobs<'a, I>(jobs: I, query: &str, filters: &JobFilters) -> Vec<FeedItem>
where
  I: IntoIterator<Item = &'a FeedItem>,
{
  let query = query.to_lowercase();

  jobs
    .into_iter()
    .filter(|job| matches_query(job, &query) && filters.matches(job))
    .cloned()
    .collect()
}

fn matches_query(job: &FeedItem, query_lower: &str) -> bool {
  SEARCHED
    .iter()
    .any(|attribute| attribute.value(job).to_lowercase().contains(query_lower))
}
