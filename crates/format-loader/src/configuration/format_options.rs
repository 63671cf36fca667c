use std::path::Path;

use anyhow::Result;
use anyhow::bail;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Key the formatting engine reads to infer a parser from the file name.
pub const FILE_PATH_KEY: &str = "filepath";

/// Options forwarded to the formatting engine without interpretation.
///
/// Insertion order is preserved so the merged result reads in precedence order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatOptions(IndexMap<String, Value>);

impl FormatOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn get_bool(&self, key: &str) -> Option<bool> {
    self.0.get(key).and_then(|value| value.as_bool())
  }

  pub fn get_u64(&self, key: &str) -> Option<u64> {
    self.0.get(key).and_then(|value| value.as_u64())
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.0.get(key).and_then(|value| value.as_str())
  }

  /// The absolute path of the file these options were resolved for.
  pub fn file_path(&self) -> Option<&Path> {
    self.get_str(FILE_PATH_KEY).map(Path::new)
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.0.shift_remove(key)
  }

  /// Removes a key that must hold a boolean when present.
  pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
    match self.remove(key) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::Bool(value)) => Ok(Some(value)),
      Some(other) => bail!("Expected a boolean for '{}', but found: {}", key, other),
    }
  }

  /// Applies `other` on top of these options. Keys in `other` win.
  pub fn extend_with(&mut self, other: &FormatOptions) {
    for (key, value) in other.iter() {
      // re-insert so the overriding layer's position is reflected
      self.0.shift_remove(key);
      self.0.insert(key.clone(), value.clone());
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormatOptions {
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    FormatOptions(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
  }
}
