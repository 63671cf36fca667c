use anyhow::Result;
use async_trait::async_trait;

use crate::configuration::FormatOptions;

/// The formatter doing the actual work.
///
/// Implementations are expected to leave regions marked by their own ignore
/// comment convention untouched; the loader does not look at the text.
#[async_trait]
pub trait FormatEngine: Send + Sync {
  /// Name used in error messages.
  fn name(&self) -> &str;

  /// Formats the text or fails when it can't be parsed.
  async fn format_text(&self, file_text: &str, options: &FormatOptions) -> Result<String>;

  /// Whether the text is already formatted according to the options.
  async fn check(&self, file_text: &str, options: &FormatOptions) -> Result<bool> {
    Ok(self.format_text(file_text, options).await? == file_text)
  }
}
