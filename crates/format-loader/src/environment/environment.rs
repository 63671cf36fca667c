use std::path::Path;
use std::path::PathBuf;

use crate::utils::LogLevel;

pub const DEFAULT_LOG_CONTEXT_NAME: &str = "format-loader";

/// Everything a loader stage needs from the outside world.
///
/// Stages never touch `std::fs` directly so that a whole build session can
/// be driven against an in-memory file system in tests.
pub trait Environment: Clone + std::marker::Send + std::marker::Sync + 'static {
  fn read_file(&self, file_path: impl AsRef<Path>) -> std::io::Result<String>;
  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> std::io::Result<()>;
  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool;
  fn cwd(&self) -> PathBuf;
  fn log_level(&self) -> LogLevel;
  fn log_stderr(&self, text: &str) {
    self.log_stderr_with_context(text, DEFAULT_LOG_CONTEXT_NAME);
  }
  /// Logs to stderr providing the context name.
  /// This will cause the logger to output the context name when it changes.
  fn log_stderr_with_context(&self, text: &str, context_name: &str);
}

// use macros here so the expressions provided are only evaluated when the level is enabled
macro_rules! log_debug {
  ($environment:expr, $($arg:tt)*) => {
    if $environment.log_level().allows($crate::utils::LogLevel::Debug) {
      let mut text = String::from("[DEBUG] ");
      text.push_str(&format!($($arg)*));
      $environment.log_stderr(&text);
    }
  };
}

macro_rules! log_warn {
  ($environment:expr, $($arg:tt)*) => {
    if $environment.log_level().allows($crate::utils::LogLevel::Warn) {
      $environment.log_stderr(&format!($($arg)*));
    }
  };
}

macro_rules! log_error {
  ($environment:expr, $($arg:tt)*) => {
    if $environment.log_level().allows($crate::utils::LogLevel::Error) {
      $environment.log_stderr(&format!($($arg)*));
    }
  };
}
