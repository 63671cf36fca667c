use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single stage invocation. The host reports it against the
/// module being built; nothing is retried.
#[derive(Debug, Error)]
pub enum LoaderError {
  #[error("Invalid loader options. {message}")]
  InvalidOptions { message: String },
  #[error("Error resolving configuration for {}", .file_path.display())]
  ConfigDiscovery {
    file_path: PathBuf,
    #[source]
    source: anyhow::Error,
  },
  #[error("Error formatting {} with {engine}", .file_path.display())]
  Format {
    file_path: PathBuf,
    engine: String,
    #[source]
    source: anyhow::Error,
  },
  #[error("Error writing formatted text to {}", .file_path.display())]
  DiskWrite {
    file_path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}
