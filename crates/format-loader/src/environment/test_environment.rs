use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Environment;
use crate::utils::LogLevel;

#[derive(Clone)]
pub struct TestEnvironment {
  cwd: PathBuf,
  files: Arc<Mutex<HashMap<PathBuf, String>>>,
  read_only_paths: Arc<Mutex<HashSet<PathBuf>>>,
  write_counts: Arc<Mutex<HashMap<PathBuf, usize>>>,
  logged_errors: Arc<Mutex<Vec<String>>>,
  log_level: Arc<Mutex<LogLevel>>,
}

impl Default for TestEnvironment {
  fn default() -> Self {
    Self::new()
  }
}

impl TestEnvironment {
  pub fn new() -> TestEnvironment {
    TestEnvironment {
      cwd: PathBuf::from("/"),
      files: Default::default(),
      read_only_paths: Default::default(),
      write_counts: Default::default(),
      logged_errors: Default::default(),
      log_level: Arc::new(Mutex::new(LogLevel::Info)),
    }
  }

  /// Adds a file without counting it as a write.
  pub fn add_file(&self, file_path: impl AsRef<Path>, text: &str) {
    self.files.lock().insert(file_path.as_ref().to_path_buf(), text.to_string());
  }

  pub fn get_file(&self, file_path: impl AsRef<Path>) -> Option<String> {
    self.files.lock().get(file_path.as_ref()).cloned()
  }

  pub fn set_read_only(&self, file_path: impl AsRef<Path>) {
    self.read_only_paths.lock().insert(file_path.as_ref().to_path_buf());
  }

  pub fn write_count(&self, file_path: impl AsRef<Path>) -> usize {
    self.write_counts.lock().get(file_path.as_ref()).copied().unwrap_or(0)
  }

  pub fn set_log_level(&self, log_level: LogLevel) {
    *self.log_level.lock() = log_level;
  }

  pub fn take_logged_errors(&self) -> Vec<String> {
    std::mem::take(&mut *self.logged_errors.lock())
  }
}

impl Environment for TestEnvironment {
  fn read_file(&self, file_path: impl AsRef<Path>) -> std::io::Result<String> {
    let files = self.files.lock();
    match files.get(file_path.as_ref()) {
      Some(text) => Ok(text.clone()),
      None => Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Could not find file at path {}", file_path.as_ref().display()),
      )),
    }
  }

  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> std::io::Result<()> {
    let file_path = file_path.as_ref();
    if self.read_only_paths.lock().contains(file_path) {
      return Err(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        format!("Permission denied writing {}", file_path.display()),
      ));
    }
    self.files.lock().insert(file_path.to_path_buf(), file_text.to_string());
    *self.write_counts.lock().entry(file_path.to_path_buf()).or_default() += 1;
    Ok(())
  }

  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool {
    let file_path = file_path.as_ref();
    // directories only exist implicitly as ancestors of files
    self.files.lock().keys().any(|path| path.starts_with(file_path))
  }

  fn cwd(&self) -> PathBuf {
    self.cwd.clone()
  }

  fn log_level(&self) -> LogLevel {
    *self.log_level.lock()
  }

  fn log_stderr_with_context(&self, text: &str, _context_name: &str) {
    self.logged_errors.lock().push(text.to_string());
  }
}
