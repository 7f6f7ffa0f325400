use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub pagination: PaginationConfig,
  #[serde(default)]
  pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the feed API, without the version segment
  pub url: String,
  /// Version path segment appended to `url`
  #[serde(default = "default_api_version")]
  pub version: String,
  /// Transport timeout for every request
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
  /// Jobs per cached page
  #[serde(default = "default_page_size")]
  pub page_size: usize,
}

impl Default for PaginationConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
  /// Quiet period before a typed query is dispatched
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

impl SearchConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
    }
  }
}

fn default_api_version() -> String {
  "v1".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_page_size() -> usize {
  DEFAULT_PAGE_SIZE
}

fn default_debounce_ms() -> u64 {
  300
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jobboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jobboard/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/jobboard/config.yaml\n\
                 with at least:\n\n  api:\n    url: https://example.org/api"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jobboard.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jobboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.pagination.page_size == 0 {
      return Err(eyre!("pagination.page_size must be at least 1"));
    }

    Ok(config)
  }

  /// Get the API bearer token from environment variables.
  ///
  /// Checks JOBBOARD_API_TOKEN first, then JOBBOARD_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("JOBBOARD_API_TOKEN")
      .or_else(|_| std::env::var("JOBBOARD_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set JOBBOARD_API_TOKEN or JOBBOARD_TOKEN environment variable.")
      })
  }
}

/// Directory for the store and the log file.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("jobboard"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("api:\n  url: https://jobs.test/api\n").unwrap();

    assert_eq!(config.api.url, "https://jobs.test/api");
    assert_eq!(config.api.version, "v1");
    assert_eq!(config.api.timeout(), Duration::from_secs(30));
    assert_eq!(config.pagination.page_size, 300);
    assert_eq!(config.search.debounce(), Duration::from_millis(300));
  }

  #[test]
  fn test_overrides() {
    let config = Config::parse(
      r#"
api:
  url: https://jobs.test/api
  version: v2
  timeout_secs: 5
pagination:
  page_size: 25
search:
  debounce_ms: 150
"#,
    )
    .unwrap();

    assert_eq!(config.api.version, "v2");
    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.pagination.page_size, 25);
    assert_eq!(config.search.debounce_ms, 150);
  }

  #[test]
  fn test_zero_page_size_is_rejected() {
    assert!(Config::parse("api:\n  url: x\npagination:\n  page_size: 0\n").is_err());
  }

  #[test]
  fn test_missing_api_section_is_rejected() {
    assert!(Config::parse("search:\n  debounce_ms: 10\n").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobboard.yaml");
    std::fs::write(&path, "api:\n  url: https://jobs.test/api\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.api.url, "https://jobs.test/api");

    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
