use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::LoaderContext;
use super::ModuleSource;
use super::Stage;
use crate::FormatSession;
use crate::LoaderError;
use crate::configuration::LoaderOptions;
use crate::environment::Environment;

pub const WATCH_COORDINATOR_NAME: &str = "watch-coordinator";

/// Text last seen by the watch coordinator, keyed by resource path.
///
/// At most one entry per path is pending; reading an entry consumes it.
#[derive(Default)]
pub struct WatchCache {
  pending: Mutex<HashMap<PathBuf, String>>,
}

impl WatchCache {
  pub fn record(&self, file_path: &Path, text: String) {
    self.pending.lock().insert(file_path.to_path_buf(), text);
  }

  pub fn take(&self, file_path: &Path) -> Option<String> {
    self.pending.lock().remove(file_path)
  }

  pub fn has_pending(&self, file_path: &Path) -> bool {
    self.pending.lock().contains_key(file_path)
  }

  /// Consumes the pending entry for a file and returns it only when the file
  /// on disk still holds exactly that text.
  ///
  /// A mismatch means the file was changed by someone else after the entry
  /// was recorded, so that change needs a full build.
  pub fn take_if_current(&self, file_path: &Path, environment: &impl Environment) -> Option<String> {
    let pending = self.take(file_path)?;
    match environment.read_file(file_path) {
      Ok(current_text) if current_text == pending => Some(pending),
      Ok(_) => {
        log_debug!(environment, "Discarding stale watch entry for {}", file_path.display());
        None
      }
      Err(err) => {
        log_debug!(environment, "Discarding watch entry for {}: {}", file_path.display(), err);
        None
      }
    }
  }
}

/// Records the text leaving the formatting stage so the rebuild caused by
/// that stage's own disk write can be short-circuited.
///
/// Place it after the `TransformStage` in the same rule, with the same options.
pub struct WatchCoordinator<TEnvironment: Environment> {
  session: Arc<FormatSession<TEnvironment>>,
}

impl<TEnvironment: Environment> WatchCoordinator<TEnvironment> {
  pub fn new(session: Arc<FormatSession<TEnvironment>>) -> Self {
    Self { session }
  }
}

#[async_trait]
impl<TEnvironment: Environment> Stage for WatchCoordinator<TEnvironment> {
  fn name(&self) -> &str {
    WATCH_COORDINATOR_NAME
  }

  async fn run(&self, source: ModuleSource, context: &dyn LoaderContext) -> Result<ModuleSource, LoaderError> {
    context.cacheable(true);
    let options = LoaderOptions::from_value(context.options())?;
    if !options.watch || !options.matches_context(context.context()) {
      return Ok(source);
    }

    let resource_path = context.resource_path();
    log_debug!(self.session.environment(), "Recording watch entry for {}", resource_path.display());
    self.session.watch_cache().record(resource_path, source.text.clone());
    Ok(source)
  }
}
