use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::FormatOptions;
use crate::LoaderError;

pub const SKIP_REWRITING_SOURCE_KEY: &str = "skipRewritingSource";
pub const IGNORE_INITIAL_KEY: &str = "ignoreInitial";

/// Keys that only mean something to the loader itself and must never be
/// forwarded to the formatting engine, even when a project config sets them.
pub const RULE_ONLY_KEYS: [&str; 3] = ["test", "watch", "resolveConfigOptions"];

/// Pattern tested against the directory being compiled to decide whether a
/// stage applies at all.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "String")]
pub struct RouteRule(Regex);

impl RouteRule {
  pub fn new(pattern: &str) -> Result<Self, regex::Error> {
    Regex::new(pattern).map(RouteRule)
  }

  pub fn matches(&self, context: &Path) -> bool {
    self.0.is_match(&context.to_string_lossy())
  }
}

impl TryFrom<String> for RouteRule {
  type Error = regex::Error;

  fn try_from(pattern: String) -> Result<Self, Self::Error> {
    RouteRule::new(&pattern)
  }
}

/// Hints for project config discovery.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveConfigOptions {
  /// Use this config file instead of searching ancestor directories.
  pub config: Option<PathBuf>,
  /// Reuse parsed config files for every file that resolves to them.
  pub use_cache: bool,
  /// Take `.editorconfig` files into account.
  pub editorconfig: bool,
}

impl Default for ResolveConfigOptions {
  fn default() -> Self {
    Self {
      config: None,
      use_cache: true,
      editorconfig: false,
    }
  }
}

/// Options supplied per rule by the host.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOptions {
  /// Only format when the build context matches. Absent matches everything.
  #[serde(default)]
  pub test: Option<RouteRule>,
  /// Keep the file on disk untouched, only pass formatted text downstream.
  #[serde(default)]
  pub skip_rewriting_source: Option<bool>,
  /// Leave a file alone the first time it passes through.
  #[serde(default)]
  pub ignore_initial: Option<bool>,
  #[serde(default)]
  pub watch: bool,
  #[serde(default)]
  pub resolve_config_options: ResolveConfigOptions,
  #[serde(flatten)]
  pub format_options: FormatOptions,
}

impl LoaderOptions {
  pub fn from_value(value: &Value) -> Result<Self, LoaderError> {
    if value.is_null() {
      return Ok(Self::default());
    }
    LoaderOptions::deserialize(value).map_err(|err| LoaderError::InvalidOptions { message: err.to_string() })
  }

  pub fn matches_context(&self, context: &Path) -> bool {
    self.test.as_ref().map(|rule| rule.matches(context)).unwrap_or(true)
  }
}
