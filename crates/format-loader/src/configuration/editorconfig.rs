use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use indexmap::IndexMap;

use super::FormatOptions;
use crate::environment::Environment;
use crate::utils::FileGlobs;
use crate::utils::ancestor_dirs;

pub const EDITORCONFIG_FILE_NAME: &str = ".editorconfig";

struct EditorConfigFile {
  is_root: bool,
  sections: Vec<EditorConfigSection>,
}

struct EditorConfigSection {
  // `None` when the section header isn't a valid glob
  globs: Option<FileGlobs>,
  properties: Vec<(String, String)>,
}

impl EditorConfigSection {
  fn applies_to(&self, file_path: &Path) -> bool {
    self.globs.as_ref().is_some_and(|globs| globs.is_match(file_path))
  }
}

/// Resolves the formatting options `.editorconfig` files declare for a file.
///
/// Files are read from the file's directory upward until one declares
/// `root = true`. Closer files and later sections win.
pub fn resolve_editorconfig_options(file_path: &Path, environment: &impl Environment) -> Result<FormatOptions> {
  let Some(start_dir) = file_path.parent() else {
    return Ok(FormatOptions::new());
  };

  let mut files = Vec::new();
  for dir in ancestor_dirs(start_dir) {
    let editorconfig_path = dir.join(EDITORCONFIG_FILE_NAME);
    if !environment.path_exists(&editorconfig_path) {
      continue;
    }
    let text = environment
      .read_file(&editorconfig_path)
      .with_context(|| format!("Error reading {}", editorconfig_path.display()))?;
    log_debug!(environment, "Resolved editorconfig: {}", editorconfig_path.display());
    let file = parse_editorconfig(dir, &text, environment);
    let is_root = file.is_root;
    files.push(file);
    if is_root {
      break;
    }
  }

  let mut properties = IndexMap::new();
  for file in files.iter().rev() {
    for section in file.sections.iter().filter(|s| s.applies_to(file_path)) {
      for (key, value) in &section.properties {
        properties.insert(key.as_str(), value.as_str());
      }
    }
  }
  Ok(editorconfig_to_format_options(&properties))
}

fn parse_editorconfig(dir: &Path, text: &str, environment: &impl Environment) -> EditorConfigFile {
  let mut is_root = false;
  let mut sections = Vec::new();
  let mut current_section: Option<EditorConfigSection> = None;

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
      continue;
    }

    if let Some(pattern) = line.strip_prefix('[').and_then(|line| line.strip_suffix(']')) {
      sections.extend(current_section.take());
      let globs = match FileGlobs::new(dir, &[pattern.to_string()]) {
        Ok(globs) => Some(globs),
        Err(err) => {
          log_debug!(environment, "Skipping editorconfig section [{}] in {}: {:#}", pattern, dir.display(), err);
          None
        }
      };
      current_section = Some(EditorConfigSection {
        globs,
        properties: Vec::new(),
      });
      continue;
    }

    let Some((key, value)) = line.split_once('=') else {
      continue;
    };
    let key = key.trim().to_lowercase();
    let value = value.trim().to_lowercase();
    match current_section.as_mut() {
      Some(section) => section.properties.push((key, value)),
      None if key == "root" => is_root = value == "true",
      None => {}
    }
  }
  sections.extend(current_section);

  EditorConfigFile { is_root, sections }
}

fn editorconfig_to_format_options(properties: &IndexMap<&str, &str>) -> FormatOptions {
  let mut options = FormatOptions::new();
  let get_number = |key: &str| properties.get(key).and_then(|value| value.parse::<u64>().ok());

  match properties.get("indent_style").copied() {
    Some("tab") => options.insert("useTabs", true),
    Some("space") => options.insert("useTabs", false),
    _ => {}
  }

  let tab_width = get_number("tab_width");
  let indent_width = match properties.get("indent_size").copied() {
    Some("tab") | None => tab_width,
    Some(_) => get_number("indent_size").or(tab_width),
  };
  if let Some(indent_width) = indent_width {
    options.insert("tabWidth", indent_width);
  }

  if let Some(max_line_length) = get_number("max_line_length") {
    options.insert("printWidth", max_line_length);
  }

  if let Some(end_of_line @ ("lf" | "crlf" | "cr")) = properties.get("end_of_line").copied() {
    options.insert("endOfLine", end_of_line);
  }

  options
}
