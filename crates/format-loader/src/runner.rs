use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Context;
use anyhow::Result;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;

use crate::LoaderError;
use crate::environment::Environment;
use crate::loader::LoaderContext;
use crate::loader::ModuleSource;
use crate::loader::Stage;
use crate::utils::LogLevel;

/// A stage along with the options of its rule entry.
#[derive(Clone)]
pub struct RuleStage {
  pub stage: Arc<dyn Stage>,
  pub options: Value,
}

impl RuleStage {
  pub fn new(stage: Arc<dyn Stage>, options: Value) -> Self {
    Self { stage, options }
  }
}

/// Routes resources whose path matches `test` through `stages`.
#[derive(Clone)]
pub struct Rule {
  pub test: Regex,
  pub stages: Vec<RuleStage>,
}

#[derive(Debug)]
pub struct RunOutput {
  pub source: ModuleSource,
  /// Every stage that ran marked itself cacheable and none opted out.
  pub cacheable: bool,
  pub warnings: Vec<String>,
  /// Name of the stage whose pitch ended the run.
  pub pitched_by: Option<String>,
}

/// A minimal host driving stages the way a bundler's loader chain does.
///
/// All `pitch` hooks run first in listed order and the first one producing a
/// result ends the run. Otherwise `run` is called on every stage in listed
/// order with each stage receiving the previous one's output.
pub struct LoaderRunner<TEnvironment: Environment> {
  environment: TEnvironment,
  root_context: PathBuf,
  rules: Vec<Rule>,
}

impl<TEnvironment: Environment> LoaderRunner<TEnvironment> {
  pub fn new(environment: TEnvironment, root_context: impl AsRef<Path>) -> Self {
    Self {
      environment,
      root_context: root_context.as_ref().to_path_buf(),
      rules: Vec::new(),
    }
  }

  pub fn add_rule(&mut self, rule: Rule) {
    self.rules.push(rule);
  }

  pub fn root_context(&self) -> &Path {
    &self.root_context
  }

  /// Builds a resource. Returns `None` when no rule applies to it.
  pub async fn run(&self, resource_path: &Path) -> Result<Option<RunOutput>> {
    let Some(rule) = self.rules.iter().find(|rule| rule.test.is_match(&resource_path.to_string_lossy())) else {
      log_debug!(self.environment, "No rule for {}", resource_path.display());
      return Ok(None);
    };

    let text = self
      .environment
      .read_file(resource_path)
      .with_context(|| format!("Error reading {}", resource_path.display()))?;
    let state = RunState {
      context: resource_path.parent().map(|dir| dir.to_path_buf()).unwrap_or_default(),
      root_context: self.root_context.clone(),
      resource_path: resource_path.to_path_buf(),
      stage_names: rule.stages.iter().map(|entry| entry.stage.name().to_string()).collect(),
      marked_cacheable: AtomicBool::new(false),
      opted_out_of_cache: AtomicBool::new(false),
      warnings: Default::default(),
    };

    let mut pitched_by = None;
    let mut pitched_source = None;
    for (stage_index, entry) in rule.stages.iter().enumerate() {
      let stage_name = entry.stage.name();
      let context = StageContext::new(&state, stage_index, stage_name, &entry.options);
      let result = entry.stage.pitch(&context).await;
      if let Some(source) = self.handle_stage_result(stage_name, resource_path, result)? {
        log_debug!(self.environment, "{} pitched {}", stage_name, resource_path.display());
        pitched_by = Some(stage_name.to_string());
        pitched_source = Some(source);
        break;
      }
    }

    let source = match pitched_source {
      Some(source) => source,
      None => {
        let mut source = ModuleSource::new(text);
        for (stage_index, entry) in rule.stages.iter().enumerate() {
          let stage_name = entry.stage.name();
          let context = StageContext::new(&state, stage_index, stage_name, &entry.options);
          let result = entry.stage.run(source, &context).await;
          source = self.handle_stage_result(stage_name, resource_path, result)?;
        }
        source
      }
    };

    let warnings = std::mem::take(&mut *state.warnings.lock());
    self.log_warnings(&warnings);
    Ok(Some(RunOutput {
      source,
      cacheable: state.marked_cacheable.load(Ordering::SeqCst) && !state.opted_out_of_cache.load(Ordering::SeqCst),
      warnings: warnings.into_iter().map(|(_, warning)| warning).collect(),
      pitched_by,
    }))
  }

  fn handle_stage_result<T>(&self, stage_name: &str, resource_path: &Path, result: Result<T, LoaderError>) -> Result<T> {
    match result {
      Ok(value) => Ok(value),
      Err(err) => {
        log_error!(self.environment, "Error in {} for {}: {}", stage_name, resource_path.display(), err);
        Err(anyhow::Error::new(err).context(format!("Stage {} failed for {}", stage_name, resource_path.display())))
      }
    }
  }

  fn log_warnings(&self, warnings: &[(String, String)]) {
    if !self.environment.log_level().allows(LogLevel::Warn) {
      return;
    }
    for (stage_name, warning) in warnings {
      self.environment.log_stderr_with_context(warning, stage_name);
    }
  }
}

struct RunState {
  context: PathBuf,
  root_context: PathBuf,
  resource_path: PathBuf,
  stage_names: Vec<String>,
  marked_cacheable: AtomicBool,
  opted_out_of_cache: AtomicBool,
  /// Warnings along with the name of the stage emitting them.
  warnings: Mutex<Vec<(String, String)>>,
}

struct StageContext<'a> {
  state: &'a RunState,
  stage_index: usize,
  stage_name: &'a str,
  options: &'a Value,
}

impl<'a> StageContext<'a> {
  fn new(state: &'a RunState, stage_index: usize, stage_name: &'a str, options: &'a Value) -> Self {
    Self {
      state,
      stage_index,
      stage_name,
      options,
    }
  }
}

impl LoaderContext for StageContext<'_> {
  fn context(&self) -> &Path {
    &self.state.context
  }

  fn root_context(&self) -> &Path {
    &self.state.root_context
  }

  fn resource_path(&self) -> &Path {
    &self.state.resource_path
  }

  fn options(&self) -> &Value {
    self.options
  }

  fn cacheable(&self, flag: bool) {
    if flag {
      self.state.marked_cacheable.store(true, Ordering::SeqCst);
    } else {
      self.state.opted_out_of_cache.store(true, Ordering::SeqCst);
    }
  }

  fn emit_warning(&self, message: String) {
    self.state.warnings.lock().push((self.stage_name.to_string(), message));
  }

  fn is_followed_by(&self, name: &str) -> bool {
    self.state.stage_names.iter().skip(self.stage_index + 1).any(|stage_name| stage_name == name)
  }
}
