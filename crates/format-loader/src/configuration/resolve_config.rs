use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use parking_lot::Mutex;

use super::FILE_PATH_KEY;
use super::FormatOptions;
use super::IGNORE_INITIAL_KEY;
use super::LoaderOptions;
use super::ProjectConfig;
use super::RULE_ONLY_KEYS;
use super::ResolveConfigOptions;
use super::SKIP_REWRITING_SOURCE_KEY;
use super::discover_project_config;
use super::read_project_config;
use super::resolve_editorconfig_options;
use crate::LoaderError;
use crate::environment::Environment;

/// The effective configuration for one file.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
  pub file_path: PathBuf,
  /// The project config file that contributed, if any.
  pub config_file_path: Option<PathBuf>,
  pub skip_rewriting_source: bool,
  pub ignore_initial: bool,
  /// What the formatting engine receives, including `filepath`.
  pub format_options: FormatOptions,
}

/// Option layers found on disk for a file, lowest precedence first.
#[derive(Debug, Default)]
pub struct DiscoveredConfig {
  pub config_file_path: Option<PathBuf>,
  pub editorconfig: FormatOptions,
  pub project: FormatOptions,
}

/// Merges the option layers for a file.
///
/// Precedence, later wins per key: editorconfig, project config, rule
/// pass-through options, then `filepath`. The control keys are taken out of
/// the merged project layers and overridden by the rule's own values.
pub fn merge_config(file_path: &Path, discovered: DiscoveredConfig, options: &LoaderOptions) -> Result<ResolvedConfig> {
  let mut format_options = discovered.editorconfig;
  format_options.extend_with(&discovered.project);

  let project_skip_rewriting_source = format_options.take_bool(SKIP_REWRITING_SOURCE_KEY)?;
  let project_ignore_initial = format_options.take_bool(IGNORE_INITIAL_KEY)?;
  for key in RULE_ONLY_KEYS {
    format_options.remove(key);
  }

  format_options.extend_with(&options.format_options);
  format_options.insert(FILE_PATH_KEY, file_path.to_string_lossy().to_string());

  Ok(ResolvedConfig {
    file_path: file_path.to_path_buf(),
    config_file_path: discovered.config_file_path,
    skip_rewriting_source: options.skip_rewriting_source.or(project_skip_rewriting_source).unwrap_or(false),
    ignore_initial: options.ignore_initial.or(project_ignore_initial).unwrap_or(false),
    format_options,
  })
}

/// Parsed config files keyed by their path. `None` marks a file that was
/// read but holds no configuration.
#[derive(Default)]
struct ConfigFileCache {
  files: Mutex<HashMap<PathBuf, Option<Arc<ProjectConfig>>>>,
}

impl ConfigFileCache {
  fn get_or_read(&self, file_path: &Path, use_cache: bool, environment: &impl Environment) -> Result<Option<Arc<ProjectConfig>>> {
    if use_cache {
      if let Some(config) = self.files.lock().get(file_path) {
        return Ok(config.clone());
      }
    }
    let config = read_project_config(file_path, environment)?.map(Arc::new);
    if use_cache {
      self.files.lock().insert(file_path.to_path_buf(), config.clone());
    }
    Ok(config)
  }
}

/// Resolves and caches the effective configuration per file.
///
/// Entries are never invalidated while the resolver lives, so a config file
/// edited mid-session is only seen by the next session.
pub struct ConfigResolver<TEnvironment: Environment> {
  environment: TEnvironment,
  resolved: Mutex<HashMap<PathBuf, Arc<ResolvedConfig>>>,
  config_files: Arc<ConfigFileCache>,
}

impl<TEnvironment: Environment> ConfigResolver<TEnvironment> {
  pub fn new(environment: TEnvironment) -> Self {
    Self {
      environment,
      resolved: Default::default(),
      config_files: Default::default(),
    }
  }

  pub fn get_cached(&self, file_path: &Path) -> Option<Arc<ResolvedConfig>> {
    self.resolved.lock().get(file_path).cloned()
  }

  pub async fn resolve(&self, file_path: &Path, options: &LoaderOptions) -> Result<Arc<ResolvedConfig>, LoaderError> {
    if let Some(resolved) = self.get_cached(file_path) {
      log_debug!(self.environment, "Using cached config for {}", file_path.display());
      return Ok(resolved);
    }

    let to_config_error = |source: anyhow::Error| LoaderError::ConfigDiscovery {
      file_path: file_path.to_path_buf(),
      source,
    };

    // discovery walks the file system, so keep it off the async runtime's thread
    let discovered = tokio::task::spawn_blocking({
      let environment = self.environment.clone();
      let config_files = self.config_files.clone();
      let file_path = file_path.to_path_buf();
      let resolve_options = options.resolve_config_options.clone();
      move || discover_config(&file_path, &resolve_options, &config_files, &environment)
    })
    .await
    .context("Config discovery task failed")?
    .map_err(to_config_error)?;

    let resolved = Arc::new(merge_config(file_path, discovered, options).map_err(to_config_error)?);
    // another invocation for the same file may have finished first; both
    // computed the value from the same inputs so the last write wins
    self.resolved.lock().insert(file_path.to_path_buf(), resolved.clone());
    Ok(resolved)
  }
}

fn discover_config(
  file_path: &Path,
  resolve_options: &ResolveConfigOptions,
  config_files: &ConfigFileCache,
  environment: &impl Environment,
) -> Result<DiscoveredConfig> {
  let project_config = match &resolve_options.config {
    Some(config_path) => {
      let config_path = if config_path.is_absolute() {
        config_path.clone()
      } else {
        environment.cwd().join(config_path)
      };
      let config = config_files.get_or_read(&config_path, resolve_options.use_cache, environment)?;
      // an explicitly provided config must configure something
      Some(config.with_context(|| format!("No configuration found in {}", config_path.display()))?)
    }
    None => match file_path.parent() {
      Some(start_dir) => discover_project_config(start_dir, environment, |candidate| {
        config_files.get_or_read(candidate, resolve_options.use_cache, environment)
      })?,
      None => None,
    },
  };
  if project_config.is_none() {
    log_debug!(environment, "No config file found for {}", file_path.display());
  }

  let editorconfig = if resolve_options.editorconfig {
    resolve_editorconfig_options(file_path, environment)?
  } else {
    FormatOptions::new()
  };

  Ok(DiscoveredConfig {
    config_file_path: project_config.as_ref().map(|config| config.file_path.clone()),
    project: project_config.map(|config| config.options_for_file(file_path)).unwrap_or_default(),
    editorconfig,
  })
}
