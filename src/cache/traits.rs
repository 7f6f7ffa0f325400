//! Core traits for local persistence.

use color_eyre::Result;
use serde_json::Value;

/// Trait for key-value storage backends holding small JSON values.
///
/// Values are opaque to the store; callers decide how to interpret them and
/// how to treat shapes they did not expect.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<Value>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &Value) -> Result<()>;

  /// Delete the value under `key`. Missing keys are not an error.
  fn remove(&self, key: &str) -> Result<()>;
}
