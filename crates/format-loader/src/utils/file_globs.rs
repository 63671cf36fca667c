use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use ignore::Match;
use ignore::overrides::Override;
use ignore::overrides::OverrideBuilder;

/// A set of glob patterns resolved against a base directory.
///
/// Patterns without a slash match a file name at any depth (`*.js` matches
/// `src/a.js`), patterns with a slash are anchored to the base directory.
pub struct FileGlobs {
  base_dir: PathBuf,
  matcher: Override,
}

impl std::fmt::Debug for FileGlobs {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FileGlobs").field("base_dir", &self.base_dir).finish()
  }
}

impl FileGlobs {
  pub fn new(base_dir: &Path, patterns: &[String]) -> Result<FileGlobs> {
    let mut builder = OverrideBuilder::new(base_dir);
    for pattern in patterns {
      builder.add(&process_pattern(pattern))?;
    }
    Ok(FileGlobs {
      base_dir: base_dir.to_path_buf(),
      matcher: builder.build()?,
    })
  }

  pub fn is_match(&self, file_path: impl AsRef<Path>) -> bool {
    let Ok(relative_path) = file_path.as_ref().strip_prefix(&self.base_dir) else {
      return false;
    };
    matches!(self.matcher.matched(relative_path, false), Match::Whitelist(_))
  }
}

fn process_pattern(pattern: &str) -> String {
  // Convert all backslashes to forward slashes.
  let pattern = pattern.replace('\\', "/");
  if pattern.contains('/') {
    pattern.trim_start_matches("./").trim_start_matches('/').to_string()
  } else {
    format!("**/{}", pattern)
  }
}
