use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use parking_lot::Mutex;

use crate::environment::Environment;
use crate::utils::ancestor_dirs;

pub const IGNORE_FILE_NAME: &str = ".prettierignore";

/// The ignore rules of a build session.
pub struct IgnoreSet {
  gitignore: Option<Gitignore>,
}

impl IgnoreSet {
  pub fn empty() -> Self {
    Self { gitignore: None }
  }

  /// Path of the ignore file the rules were loaded from.
  pub fn ignore_file_path(&self) -> Option<PathBuf> {
    self.gitignore.as_ref().map(|gitignore| gitignore.path().join(IGNORE_FILE_NAME))
  }

  /// Tests a file against the rules.
  ///
  /// Patterns are relative to the directory holding the ignore file, so files
  /// outside of that directory are never ignored.
  pub fn ignores(&self, file_path: &Path) -> bool {
    let Some(gitignore) = &self.gitignore else {
      return false;
    };
    match file_path.strip_prefix(gitignore.path()) {
      Ok(relative_path) if !relative_path.as_os_str().is_empty() => gitignore.matched_path_or_any_parents(relative_path, false).is_ignore(),
      _ => false,
    }
  }
}

/// Lazily discovers a single ignore file per session and answers membership
/// queries against it.
///
/// The ignore file is found by searching upward from the directory of the
/// first file queried. Later queries reuse it whatever their location.
pub struct IgnoreManager<TEnvironment: Environment> {
  environment: TEnvironment,
  ignore_set: Mutex<Option<Arc<IgnoreSet>>>,
}

impl<TEnvironment: Environment> IgnoreManager<TEnvironment> {
  pub fn new(environment: TEnvironment) -> Self {
    Self {
      environment,
      ignore_set: Default::default(),
    }
  }

  /// Whether the file should be left alone.
  ///
  /// A relative `file_path` is resolved against `build_context_root`.
  pub fn should_ignore(&self, file_path: &Path, build_context_root: &Path) -> bool {
    let file_path = if file_path.is_absolute() {
      file_path.to_path_buf()
    } else {
      build_context_root.join(file_path)
    };
    let ignored = self.get_ignore_set(&file_path).ignores(&file_path);
    if ignored {
      log_debug!(self.environment, "Ignored: {}", file_path.display());
    }
    ignored
  }

  /// Discards the discovered rules so the next query searches again.
  pub fn reset(&self) {
    *self.ignore_set.lock() = None;
  }

  pub fn get_ignore_set(&self, file_path: &Path) -> Arc<IgnoreSet> {
    // hold the lock while discovering so only one set is ever built
    let mut ignore_set = self.ignore_set.lock();
    ignore_set
      .get_or_insert_with(|| Arc::new(discover_ignore_set(file_path, &self.environment)))
      .clone()
  }
}

fn discover_ignore_set(file_path: &Path, environment: &impl Environment) -> IgnoreSet {
  let Some(start_dir) = file_path.parent() else {
    return IgnoreSet::empty();
  };
  let Some(dir) = ancestor_dirs(start_dir).find(|dir| environment.path_exists(dir.join(IGNORE_FILE_NAME))) else {
    log_debug!(environment, "No {} found for {}", IGNORE_FILE_NAME, file_path.display());
    return IgnoreSet::empty();
  };

  let ignore_file_path = dir.join(IGNORE_FILE_NAME);
  let text = match environment.read_file(&ignore_file_path) {
    Ok(text) => text,
    Err(err) => {
      log_warn!(environment, "Error reading {}, nothing will be ignored: {}", ignore_file_path.display(), err);
      return IgnoreSet::empty();
    }
  };

  let mut builder = GitignoreBuilder::new(dir);
  for line in text.lines() {
    if let Err(err) = builder.add_line(None, line) {
      log_debug!(environment, "Skipping invalid pattern in {}: {}", ignore_file_path.display(), err);
    }
  }
  match builder.build() {
    Ok(gitignore) => {
      log_debug!(environment, "Resolved ignore file: {}", ignore_file_path.display());
      IgnoreSet { gitignore: Some(gitignore) }
    }
    Err(err) => {
      log_warn!(environment, "Error building rules from {}, nothing will be ignored: {}", ignore_file_path.display(), err);
      IgnoreSet::empty()
    }
  }
}
