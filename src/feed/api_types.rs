//! Serde-deserializable types matching the feed API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{
  Category, Contact, Employer, EntryStatus, FeedEntry, FeedEntryDetails, FeedEntrySummary,
  FeedItem, FeedPage, OccupationCategory, WorkLocation,
};

// ============================================================================
// Feed window
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFeedPage {
  pub id: String,
  pub next_id: Option<String>,
  /// Absent on malformed responses, checked by `into_page`
  pub items: Option<Vec<ApiFeedItem>>,
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub home_page_url: String,
  #[serde(default)]
  pub feed_url: String,
  #[serde(default)]
  pub description: String,
  pub next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFeedItem {
  pub id: String,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub content_text: String,
  #[serde(default)]
  pub date_modified: String,
  #[serde(rename = "_feed_entry")]
  pub feed_entry: ApiFeedEntrySummary,
}

#[derive(Debug, Deserialize)]
pub struct ApiFeedEntrySummary {
  pub uuid: String,
  pub status: EntryStatus,
  #[serde(default)]
  pub title: String,
  #[serde(rename = "businessName", default)]
  pub business_name: String,
  #[serde(default)]
  pub municipal: String,
  #[serde(rename = "sistEndret", default)]
  pub sist_endret: String,
}

impl ApiFeedPage {
  /// Convert to the domain page. Fails when the `items` member is missing.
  pub fn into_page(self) -> Option<FeedPage> {
    let items = self.items?;

    Some(FeedPage {
      feed_id: self.id,
      next_token: self.next_id.filter(|token| !token.is_empty()),
      items: items.into_iter().map(FeedItem::from).collect(),
      version: self.version,
      title: self.title,
      home_page_url: self.home_page_url,
      feed_url: self.feed_url,
      description: self.description,
      next_url: self.next_url.filter(|url| !url.is_empty()),
    })
  }
}

impl From<ApiFeedItem> for FeedItem {
  fn from(item: ApiFeedItem) -> Self {
    FeedItem {
      id: item.id,
      url: item.url,
      title: item.title,
      content_text: item.content_text,
      date_modified: item.date_modified,
      summary: FeedEntrySummary {
        uuid: item.feed_entry.uuid,
        status: item.feed_entry.status,
        title: item.feed_entry.title,
        employer_name: item.feed_entry.business_name,
        municipality: item.feed_entry.municipal,
        last_modified: item.feed_entry.sist_endret,
      },
    }
  }
}

// ============================================================================
// Single entry
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFeedEntry {
  pub uuid: String,
  pub status: EntryStatus,
  #[serde(rename = "sistEndret", default)]
  pub sist_endret: String,
  #[serde(default)]
  pub json: ApiFeedEntryDetails,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiFeedEntryDetails {
  pub title: Option<String>,
  pub description: Option<String>,
  pub jobtitle: Option<String>,
  pub link: Option<String>,
  pub sourceurl: Option<String>,
  pub source: Option<String>,
  #[serde(rename = "applicationUrl")]
  pub application_url: Option<String>,
  #[serde(rename = "applicationDue")]
  pub application_due: Option<String>,
  pub employer: Option<ApiEmployer>,
  #[serde(rename = "workLocations", default)]
  pub work_locations: Vec<ApiWorkLocation>,
  #[serde(rename = "contactList", default)]
  pub contact_list: Vec<ApiContact>,
  #[serde(rename = "occupationCategories", default)]
  pub occupation_categories: Vec<ApiOccupationCategory>,
  #[serde(rename = "categoryList", default)]
  pub category_list: Vec<ApiCategory>,
  pub engagementtype: Option<String>,
  pub extent: Option<String>,
  pub starttime: Option<String>,
  pub positioncount: Option<String>,
  pub sector: Option<String>,
  pub published: Option<String>,
  pub expires: Option<String>,
  pub updated: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEmployer {
  #[serde(default)]
  pub name: String,
  pub orgnr: Option<String>,
  pub description: Option<String>,
  pub homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiWorkLocation {
  pub country: Option<String>,
  pub address: Option<String>,
  pub city: Option<String>,
  #[serde(rename = "postalCode")]
  pub postal_code: Option<String>,
  pub county: Option<String>,
  pub municipal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiContact {
  pub name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub role: Option<String>,
  pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiOccupationCategory {
  pub level1: Option<String>,
  pub level2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCategory {
  #[serde(rename = "categoryType")]
  pub category_type: Option<String>,
  pub code: Option<String>,
  pub name: Option<String>,
  pub score: Option<f64>,
}

impl From<ApiFeedEntry> for FeedEntry {
  fn from(entry: ApiFeedEntry) -> Self {
    let json = entry.json;

    FeedEntry {
      uuid: entry.uuid,
      status: entry.status,
      last_modified: entry.sist_endret,
      details: FeedEntryDetails {
        title: json.title,
        description: json.description,
        job_title: json.jobtitle,
        link: json.link,
        source_url: json.sourceurl,
        source: json.source,
        application_url: json.application_url,
        application_due: json.application_due,
        employer: json.employer.map(|e| Employer {
          name: e.name,
          orgnr: e.orgnr,
          description: e.description,
          homepage: e.homepage,
        }),
        work_locations: json
          .work_locations
          .into_iter()
          .map(|l| WorkLocation {
            country: l.country,
            address: l.address,
            city: l.city,
            postal_code: l.postal_code,
            county: l.county,
            municipal: l.municipal,
          })
          .collect(),
        contacts: json
          .contact_list
          .into_iter()
          .map(|c| Contact {
            name: c.name,
            email: c.email,
            phone: c.phone,
            role: c.role,
            title: c.title,
          })
          .collect(),
        occupation_categories: json
          .occupation_categories
          .into_iter()
          .map(|o| OccupationCategory {
            level1: o.level1,
            level2: o.level2,
          })
          .collect(),
        categories: json
          .category_list
          .into_iter()
          .map(|c| Category {
            category_type: c.category_type,
            code: c.code,
            name: c.name,
            score: c.score,
          })
          .collect(),
        engagement_type: json.engagementtype,
        extent: json.extent,
        start_time: json.starttime,
        position_count: json.positioncount,
        sector: json.sector,
        published: json.published,
        expires: json.expires,
        updated: json.updated,
      },
    }
  }
}
