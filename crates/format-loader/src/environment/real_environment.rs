use std::fs;
use std::path::Path;
use std::path::PathBuf;

use super::Environment;
use crate::utils::LogLevel;
use crate::utils::Logger;
use crate::utils::LoggerOptions;

#[derive(Clone, Debug)]
pub struct RealEnvironmentOptions {
  pub log_level: LogLevel,
}

impl Default for RealEnvironmentOptions {
  fn default() -> Self {
    Self { log_level: LogLevel::Info }
  }
}

#[derive(Clone)]
pub struct RealEnvironment {
  logger: Logger,
}

impl RealEnvironment {
  pub fn new(options: &RealEnvironmentOptions) -> RealEnvironment {
    RealEnvironment {
      logger: Logger::new(&LoggerOptions {
        initial_context_name: super::DEFAULT_LOG_CONTEXT_NAME.to_string(),
        log_level: options.log_level,
      }),
    }
  }
}

impl Default for RealEnvironment {
  fn default() -> Self {
    RealEnvironment::new(&Default::default())
  }
}

impl Environment for RealEnvironment {
  fn read_file(&self, file_path: impl AsRef<Path>) -> std::io::Result<String> {
    log_debug!(self, "Reading file: {}", file_path.as_ref().display());
    fs::read_to_string(file_path)
  }

  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> std::io::Result<()> {
    log_debug!(self, "Writing file: {}", file_path.as_ref().display());
    fs::write(file_path, file_text)
  }

  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool {
    file_path.as_ref().exists()
  }

  fn cwd(&self) -> PathBuf {
    // fall back to the root rather than failing config resolution
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
  }

  fn log_level(&self) -> LogLevel {
    self.logger.log_level()
  }

  fn log_stderr_with_context(&self, text: &str, context_name: &str) {
    self.logger.log_stderr_with_context(text, context_name);
  }
}
