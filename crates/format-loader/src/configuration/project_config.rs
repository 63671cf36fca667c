use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use serde::Deserialize;
use serde_json::Value;

use super::FormatOptions;
use crate::environment::Environment;
use crate::utils::FileGlobs;
use crate::utils::find_in_ancestor_dirs;

/// Checked in this order in every directory on the way up.
pub static CONFIG_FILE_NAMES: [&str; 7] = [
  "package.json",
  ".prettierrc",
  ".prettierrc.json",
  ".prettierrc.jsonc",
  ".prettierrc.yaml",
  ".prettierrc.yml",
  ".prettierrc.toml",
];

const PACKAGE_JSON_CONFIG_KEY: &str = "prettier";

/// A parsed project configuration file.
#[derive(Debug)]
pub struct ProjectConfig {
  pub file_path: PathBuf,
  options: FormatOptions,
  overrides: Vec<ConfigOverride>,
}

#[derive(Debug)]
struct ConfigOverride {
  files: FileGlobs,
  exclude_files: Option<FileGlobs>,
  options: FormatOptions,
}

impl ConfigOverride {
  fn applies_to(&self, file_path: &Path) -> bool {
    self.files.is_match(file_path) && !self.exclude_files.as_ref().map(|globs| globs.is_match(file_path)).unwrap_or(false)
  }
}

impl ProjectConfig {
  /// Gets the options for a file with every matching override applied in order.
  pub fn options_for_file(&self, file_path: &Path) -> FormatOptions {
    let mut options = self.options.clone();
    for config_override in self.overrides.iter().filter(|o| o.applies_to(file_path)) {
      options.extend_with(&config_override.options);
    }
    options
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProjectConfig {
  #[serde(default)]
  overrides: Vec<RawConfigOverride>,
  #[serde(flatten)]
  options: FormatOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfigOverride {
  files: OneOrMany,
  #[serde(default)]
  exclude_files: Option<OneOrMany>,
  #[serde(default)]
  options: FormatOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

impl OneOrMany {
  fn into_vec(self) -> Vec<String> {
    match self {
      OneOrMany::One(value) => vec![value],
      OneOrMany::Many(values) => values,
    }
  }
}

/// Gets the config files that exist in `dir`, in search order.
pub fn get_config_file_candidates_in_dir(dir: &Path, environment: &impl Environment) -> Vec<PathBuf> {
  CONFIG_FILE_NAMES
    .iter()
    .map(|name| dir.join(name))
    .filter(|path| environment.path_exists(path))
    .collect()
}

/// Searches `start_dir` and its ancestors for the nearest project config.
///
/// `load` is given every candidate file in search order and returns `None`
/// when the candidate holds no config (ex. a `package.json` without a
/// `prettier` key), in which case the search continues.
pub fn discover_project_config<T>(
  start_dir: &Path,
  environment: &impl Environment,
  mut load: impl FnMut(&Path) -> Result<Option<T>>,
) -> Result<Option<T>> {
  find_in_ancestor_dirs(start_dir, |dir| {
    for candidate in get_config_file_candidates_in_dir(dir, environment) {
      if let Some(config) = load(&candidate)? {
        return Ok(Some(config));
      }
    }
    Ok(None)
  })
}

/// Reads and parses a project config file.
///
/// Returns `None` for a `package.json` that does not configure the formatter.
pub fn read_project_config(file_path: &Path, environment: &impl Environment) -> Result<Option<ProjectConfig>> {
  let file_text = environment
    .read_file(file_path)
    .with_context(|| format!("Error reading config file {}", file_path.display()))?;
  let value = parse_config_file_text(file_path, &file_text, environment).with_context(|| format!("Error parsing config file {}", file_path.display()))?;
  let Some(value) = value else {
    return Ok(None);
  };
  let config = project_config_from_value(file_path, value).with_context(|| format!("Invalid config file {}", file_path.display()))?;
  log_debug!(environment, "Resolved config file: {}", file_path.display());
  Ok(Some(config))
}

fn parse_config_file_text(file_path: &Path, file_text: &str, environment: &impl Environment) -> Result<Option<Value>> {
  let file_name = file_path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
  if file_name == "package.json" {
    let package_json: Value = serde_json::from_str(file_text)?;
    return Ok(match package_json.get(PACKAGE_JSON_CONFIG_KEY) {
      Some(Value::String(shared_config)) => {
        log_warn!(
          environment,
          "Ignoring shared configuration '{}' in {}. Only inline configuration objects are supported.",
          shared_config,
          file_path.display()
        );
        None
      }
      Some(value) => Some(value.clone()),
      None => None,
    });
  }

  let extension = file_path.extension().map(|ext| ext.to_string_lossy()).unwrap_or_default();
  match extension.as_ref() {
    "toml" => return Ok(Some(toml::from_str::<Value>(file_text)?)),
    "yaml" | "yml" => return Ok(Some(parse_yaml(file_text)?)),
    _ => {}
  }

  match jsonc_parser::parse_to_serde_value(file_text, &Default::default()) {
    // an empty file is an empty config
    Ok(value) => Ok(Some(value.unwrap_or_else(empty_config))),
    // an extensionless rc file may hold yaml
    Err(err) if extension.is_empty() => match parse_yaml(file_text) {
      Ok(value) => Ok(Some(value)),
      Err(_) => Err(anyhow!("{}", err)),
    },
    Err(err) => Err(anyhow!("{}", err)),
  }
}

fn parse_yaml(file_text: &str) -> Result<Value> {
  if file_text.trim().is_empty() {
    return Ok(empty_config());
  }
  let value: Value = serde_yaml::from_str(file_text)?;
  Ok(if value.is_null() { empty_config() } else { value })
}

fn empty_config() -> Value {
  Value::Object(Default::default())
}

fn project_config_from_value(file_path: &Path, value: Value) -> Result<ProjectConfig> {
  let raw: RawProjectConfig = serde_json::from_value(value)?;
  let base_dir = file_path.parent().unwrap_or(file_path);
  let mut overrides = Vec::with_capacity(raw.overrides.len());
  for raw_override in raw.overrides {
    overrides.push(ConfigOverride {
      files: FileGlobs::new(base_dir, &raw_override.files.into_vec())?,
      exclude_files: match raw_override.exclude_files {
        Some(exclude_files) => Some(FileGlobs::new(base_dir, &exclude_files.into_vec())?),
        None => None,
      },
      options: raw_override.options,
    });
  }
  Ok(ProjectConfig {
    file_path: file_path.to_path_buf(),
    options: raw.options,
    overrides,
  })
}
