use std::sync::Arc;

use async_trait::async_trait;

use super::LoaderContext;
use super::ModuleSource;
use super::Stage;
use super::WATCH_COORDINATOR_NAME;
use crate::FormatEngine;
use crate::FormatSession;
use crate::LoaderError;
use crate::configuration::FormatOptions;
use crate::configuration::LoaderOptions;
use crate::environment::Environment;

pub const TRANSFORM_STAGE_NAME: &str = "format-loader";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformMode {
  /// Resolve project config, honor ignore files and `ignoreInitial`.
  #[default]
  Resolved,
  /// Format with the rule options alone.
  Plain,
}

/// The stage that formats a module and writes the result back to its file.
pub struct TransformStage<TEnvironment: Environment> {
  session: Arc<FormatSession<TEnvironment>>,
  engine: Arc<dyn FormatEngine>,
  mode: TransformMode,
}

impl<TEnvironment: Environment> TransformStage<TEnvironment> {
  pub fn new(session: Arc<FormatSession<TEnvironment>>, engine: Arc<dyn FormatEngine>) -> Self {
    Self {
      session,
      engine,
      mode: TransformMode::default(),
    }
  }

  pub fn with_mode(mut self, mode: TransformMode) -> Self {
    self.mode = mode;
    self
  }

  /// Gets the options to format with, or `None` when the file should pass
  /// through untouched.
  async fn get_format_plan(&self, options: &LoaderOptions, context: &dyn LoaderContext) -> Result<Option<FormatPlan>, LoaderError> {
    let environment = self.session.environment();
    let resource_path = context.resource_path();

    if self.mode == TransformMode::Plain {
      return Ok(Some(FormatPlan {
        format_options: options.format_options.clone(),
        skip_rewriting_source: false,
      }));
    }

    if self.session.ignore_manager().should_ignore(resource_path, context.root_context()) {
      return Ok(None);
    }

    let resolved = self.session.config_resolver().resolve(resource_path, options).await?;
    if resolved.ignore_initial && self.session.mark_loaded(resource_path) {
      log_debug!(environment, "Skipping initial pass: {}", resource_path.display());
      return Ok(None);
    }

    Ok(Some(FormatPlan {
      format_options: resolved.format_options.clone(),
      skip_rewriting_source: resolved.skip_rewriting_source,
    }))
  }
}

struct FormatPlan {
  format_options: FormatOptions,
  skip_rewriting_source: bool,
}

#[async_trait]
impl<TEnvironment: Environment> Stage for TransformStage<TEnvironment> {
  fn name(&self) -> &str {
    TRANSFORM_STAGE_NAME
  }

  /// Short-circuits the rebuild triggered by this stage's own disk write.
  async fn pitch(&self, context: &dyn LoaderContext) -> Result<Option<ModuleSource>, LoaderError> {
    if self.mode == TransformMode::Plain {
      return Ok(None);
    }
    let options = LoaderOptions::from_value(context.options())?;
    if !options.watch || !options.matches_context(context.context()) {
      return Ok(None);
    }

    let environment = self.session.environment();
    let resource_path = context.resource_path();
    match self.session.watch_cache().take_if_current(resource_path, environment) {
      Some(text) => {
        log_debug!(environment, "Short-circuiting rebuild of {}", resource_path.display());
        context.cacheable(true);
        Ok(Some(ModuleSource::new(text)))
      }
      None => Ok(None),
    }
  }

  async fn run(&self, source: ModuleSource, context: &dyn LoaderContext) -> Result<ModuleSource, LoaderError> {
    context.cacheable(true);
    let environment = self.session.environment();
    let resource_path = context.resource_path();
    let options = LoaderOptions::from_value(context.options())?;

    if !options.matches_context(context.context()) {
      log_debug!(environment, "Route does not match {}, skipping: {}", context.context().display(), resource_path.display());
      return Ok(source);
    }

    if options.watch && self.mode == TransformMode::Resolved && !context.is_followed_by(WATCH_COORDINATOR_NAME) {
      context.emit_warning(format!(
        "The watch option is set but no {} stage follows {}. Every change to {} will be built twice.",
        WATCH_COORDINATOR_NAME,
        TRANSFORM_STAGE_NAME,
        resource_path.display()
      ));
    }

    let Some(plan) = self.get_format_plan(&options, context).await? else {
      return Ok(source);
    };

    let formatted_text = self
      .engine
      .format_text(&source.text, &plan.format_options)
      .await
      .map_err(|err| LoaderError::Format {
        file_path: resource_path.to_path_buf(),
        engine: self.engine.name().to_string(),
        source: err,
      })?;

    if formatted_text != source.text && !plan.skip_rewriting_source {
      log_debug!(environment, "Writing formatted file: {}", resource_path.display());
      environment
        .write_file(resource_path, &formatted_text)
        .map_err(|err| LoaderError::DiskWrite {
          file_path: resource_path.to_path_buf(),
          source: err,
        })?;
    }

    Ok(ModuleSource {
      text: formatted_text,
      source_map: source.source_map,
    })
  }
}
