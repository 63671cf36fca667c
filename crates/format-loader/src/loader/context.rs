use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::LoaderError;

/// What the host exposes to a stage for one invocation.
pub trait LoaderContext: Send + Sync {
  /// Directory of the module being built.
  fn context(&self) -> &Path;
  /// Root directory of the build.
  fn root_context(&self) -> &Path;
  /// Absolute path of the file being processed.
  fn resource_path(&self) -> &Path;
  /// Options of the rule entry that invoked the stage.
  fn options(&self) -> &Value;
  /// Marks the stage's result as safe to cache and rerun.
  fn cacheable(&self, flag: bool);
  fn emit_warning(&self, message: String);
  /// Whether a stage with this name comes after the current stage in the
  /// rule's chain.
  fn is_followed_by(&self, name: &str) -> bool;
}

/// Module content flowing between stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleSource {
  pub text: String,
  pub source_map: Option<Value>,
}

impl ModuleSource {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      source_map: None,
    }
  }

  pub fn with_source_map(mut self, source_map: Value) -> Self {
    self.source_map = Some(source_map);
    self
  }
}

/// A stage in a rule's chain.
///
/// The host calls `pitch` on every stage before any `run`. A stage returning
/// a result from `pitch` ends the chain with that result.
#[async_trait]
pub trait Stage: Send + Sync {
  fn name(&self) -> &str;

  async fn pitch(&self, _context: &dyn LoaderContext) -> Result<Option<ModuleSource>, LoaderError> {
    Ok(None)
  }

  async fn run(&self, source: ModuleSource, context: &dyn LoaderContext) -> Result<ModuleSource, LoaderError>;
}
