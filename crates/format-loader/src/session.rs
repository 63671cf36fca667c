use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::configuration::ConfigResolver;
use crate::environment::Environment;
use crate::ignores::IgnoreManager;
use crate::loader::WatchCache;

/// State shared by every stage invocation of one build session.
///
/// Create one per build (or per continuous watch run) and hand it to the
/// stages. Dropping it drops every cache, so independent sessions in the same
/// process never see each other's config, ignore rules or pending watch
/// entries.
pub struct FormatSession<TEnvironment: Environment> {
  environment: TEnvironment,
  config_resolver: ConfigResolver<TEnvironment>,
  ignore_manager: IgnoreManager<TEnvironment>,
  loaded_files: Mutex<HashSet<PathBuf>>,
  watch_cache: WatchCache,
}

impl<TEnvironment: Environment> FormatSession<TEnvironment> {
  pub fn new(environment: TEnvironment) -> Self {
    Self {
      config_resolver: ConfigResolver::new(environment.clone()),
      ignore_manager: IgnoreManager::new(environment.clone()),
      loaded_files: Default::default(),
      watch_cache: Default::default(),
      environment,
    }
  }

  pub fn environment(&self) -> &TEnvironment {
    &self.environment
  }

  pub fn config_resolver(&self) -> &ConfigResolver<TEnvironment> {
    &self.config_resolver
  }

  pub fn ignore_manager(&self) -> &IgnoreManager<TEnvironment> {
    &self.ignore_manager
  }

  pub fn watch_cache(&self) -> &WatchCache {
    &self.watch_cache
  }

  /// Records that a file went through the loader. Returns `true` the first time.
  pub fn mark_loaded(&self, file_path: &Path) -> bool {
    self.loaded_files.lock().insert(file_path.to_path_buf())
  }

  pub fn is_loaded(&self, file_path: &Path) -> bool {
    self.loaded_files.lock().contains(file_path)
  }

  /// Forgets the ignore rules so they're searched for again.
  pub fn reset_ignores(&self) {
    self.ignore_manager.reset();
  }
}
