use parking_lot::Mutex;
use std::io::Stderr;
use std::io::Write;
use std::io::stderr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
  // ordered by verbosity
  Debug = 0,
  Info = 1,
  Warn = 2,
  Error = 3,
  Silent = 4,
}

impl LogLevel {
  /// Whether a message logged at `level` should be output.
  pub fn allows(self, level: LogLevel) -> bool {
    self != LogLevel::Silent && level >= self
  }
}

impl std::str::FromStr for LogLevel {
  type Err = String;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    match text {
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      "silent" => Ok(LogLevel::Silent),
      _ => Err(format!("Unknown log level: {}", text)),
    }
  }
}

#[derive(Clone)]
pub struct LoggerOptions {
  pub initial_context_name: String,
  pub log_level: LogLevel,
}

#[derive(Clone)]
pub struct Logger {
  output_lock: Arc<Mutex<LoggerState>>,
  log_level: LogLevel,
}

struct LoggerState {
  last_context_name: String,
  std_err: Stderr,
}

impl Logger {
  pub fn new(options: &LoggerOptions) -> Self {
    Logger {
      output_lock: Arc::new(Mutex::new(LoggerState {
        last_context_name: options.initial_context_name.clone(),
        std_err: stderr(),
      })),
      log_level: options.log_level,
    }
  }

  #[inline]
  pub fn log_level(&self) -> LogLevel {
    self.log_level
  }

  pub fn log_stderr_with_context(&self, text: &str, context_name: &str) {
    if self.log_level == LogLevel::Silent {
      return;
    }
    let mut state = self.output_lock.lock();
    let mut output_text = String::new();
    if state.last_context_name != context_name {
      output_text.push_str(&format!("[{}]\n", context_name));
      state.last_context_name = context_name.to_string();
    }
    output_text.push_str(text);
    output_text.push('\n');
    // nothing sensible to do if stderr is gone
    let _ = state.std_err.write_all(output_text.as_bytes());
  }
}
