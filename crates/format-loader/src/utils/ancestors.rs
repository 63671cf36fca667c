use std::path::Path;

/// Upper bound on how many directories an upward search visits.
///
/// `Path::ancestors` is purely lexical so it always terminates at the root,
/// but a symlinked or deeply nested tree should not turn a lookup into a walk
/// of unbounded length.
pub const MAX_ANCESTOR_DEPTH: usize = 256;

/// Iterates `start_dir` and then each of its ancestors up to the file system root.
pub fn ancestor_dirs(start_dir: &Path) -> impl Iterator<Item = &Path> {
  start_dir.ancestors().take(MAX_ANCESTOR_DEPTH)
}

/// Returns the first value produced by `find` when visiting `start_dir` and its ancestors.
pub fn find_in_ancestor_dirs<T, E>(start_dir: &Path, mut find: impl FnMut(&Path) -> Result<Option<T>, E>) -> Result<Option<T>, E> {
  for dir in ancestor_dirs(start_dir) {
    if let Some(value) = find(dir)? {
      return Ok(Some(value));
    }
  }
  Ok(None)
}
