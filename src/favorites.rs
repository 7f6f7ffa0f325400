//! Favorite job ids, persisted in the local key-value store.

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::KeyValueStore;

/// Store key holding the favorites list
pub const FAVORITES_KEY: &str = "FAVORITES";

/// Ordered, deduplicated set of favorite job ids.
///
/// Nothing here fails outwardly: storage errors are logged, and a stored value
/// that is not a list reads as no favorites.
pub struct FavoritesStore<S> {
  store: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  /// Add `job_id` unless it is already a favorite.
  pub fn add(&self, job_id: &str) {
    let mut favorites = self.list();
    if favorites.iter().any(|id| id == job_id) {
      return;
    }

    favorites.push(job_id.to_string());
    self.save(&favorites);
    info!(job_id, "added to favorites");
  }

  /// Remove `job_id` if present.
  pub fn remove(&self, job_id: &str) {
    let mut favorites = self.list();
    favorites.retain(|id| id != job_id);
    self.save(&favorites);
    info!(job_id, "removed from favorites");
  }

  /// Flip membership of `job_id`; returns whether it is now a favorite.
  pub fn toggle(&self, job_id: &str) -> bool {
    if self.is_favorite(job_id) {
      self.remove(job_id);
      false
    } else {
      self.add(job_id);
      true
    }
  }

  pub fn is_favorite(&self, job_id: &str) -> bool {
    self.list().iter().any(|id| id == job_id)
  }

  /// Current favorites in insertion order.
  pub fn list(&self) -> Vec<String> {
    let value = match self.store.get(FAVORITES_KEY) {
      Ok(value) => value,
      Err(e) => {
        warn!("failed to read favorites: {}", e);
        return Vec::new();
      }
    };

    let Some(Value::Array(entries)) = value else {
      return Vec::new();
    };

    let mut favorites: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
      if let Value::String(id) = entry {
        if !favorites.contains(&id) {
          favorites.push(id);
        }
      }
    }
    favorites
  }

  /// Persist the list; an empty list removes the key.
  fn save(&self, favorites: &[String]) {
    let result = if favorites.is_empty() {
      self.store.remove(FAVORITES_KEY)
    } else {
      self.store.set(FAVORITES_KEY, &Value::from(favorites.to_vec()))
    };

    if let Err(e) = result {
      warn!("failed to persist favorites: {}", e);
    }
  }
}
