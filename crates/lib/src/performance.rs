//! CDS and Spring AOT training-run orchestration.
//!
//! [`SpringPerformance`] contributes the `spring-performance` layer. Depending
//! on the resolved [`TrainingRunConfig`] it either records launch defaults
//! only, or rebuilds the application into a CDS layout and runs the
//! application once with `-XX:ArchiveClassesAtExit` so the JVM dumps a shared
//! archive.
//!
//! # Stages
//!
//! ```text
//! Disabled -> Extracting -> Repackaging -> NormalizingTimestamps -> TrainingRun -> Complete
//!                  \______________\__________________\__________________\______-> Failed
//! ```
//!
//! Each stage consumes the working directory left by the previous one, so the
//! pipeline is strictly sequential. The whole sequence runs inside the layer
//! contributor: with unchanged inputs none of it runs again.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::{self, ArchiveError};
use crate::config::{BPL_JVM_CDS_ENABLED, BPL_SPRING_AOT_ENABLED, ConfigError, JAVA_TOOL_OPTIONS, TrainingRunConfig};
use crate::consts::{PERFORMANCE_LAYER, RUNNER_JAR, SHARED_ARCHIVE};
use crate::execute::{ExecuteError, Execution, Executor};
use crate::extract::{self, ExtractError};
use crate::format::PackagingFormat;
use crate::jvm::java_command;
use crate::layer::{ContributionStatus, Layer, LayerContributor, LayerError, LayerTypes};
use crate::manifest::{AppManifest, ManifestError};
use crate::timestamps;
use crate::util::hash::{DirHashError, FileEntry, Fingerprint, list_files};

/// Errors contributing the performance layer.
#[derive(Debug, thiserror::Error)]
pub enum PerformanceError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("unable to contribute spring-performance layer: {0}")]
  Manifest(#[from] ManifestError),

  #[error("error extracting application: {0}")]
  Extract(#[from] ExtractError),

  #[error("error repackaging application: {0}")]
  Archive(#[from] ArchiveError),

  #[error("training run failed: {0}")]
  TrainingRun(#[source] ExecuteError),

  #[error("unable to list application files: {0}")]
  Listing(#[from] DirHashError),

  #[error(transparent)]
  Layer(#[from] LayerError),

  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PerformanceError + '_ {
  move |source| PerformanceError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Stage of the training-run pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceState {
  Disabled,
  Extracting,
  Repackaging,
  NormalizingTimestamps,
  TrainingRun,
  Complete,
  Failed,
}

impl fmt::Display for PerformanceState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      PerformanceState::Disabled => "disabled",
      PerformanceState::Extracting => "extracting",
      PerformanceState::Repackaging => "repackaging",
      PerformanceState::NormalizingTimestamps => "normalizing-timestamps",
      PerformanceState::TrainingRun => "training-run",
      PerformanceState::Complete => "complete",
      PerformanceState::Failed => "failed",
    };
    write!(f, "{}", name)
  }
}

/// Inputs the performance layer is keyed on.
///
/// Only relative paths and contents take part, so two identical applications
/// in different directories share a fingerprint.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetadata {
  pub manifest: std::collections::BTreeMap<String, String>,
  pub files: Vec<FileEntry>,
  pub config: TrainingRunConfig,
  pub format: PackagingFormat,
}

impl Fingerprint for PerformanceMetadata {}

/// What a contribution did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceOutcome {
  /// The layer, or `None` when nothing was requested.
  pub layer: Option<Layer>,
  pub status: Option<ContributionStatus>,
  pub state: PerformanceState,
}

/// Orchestrates the training run for one application.
pub struct SpringPerformance<E> {
  executor: E,
  app_path: PathBuf,
  manifest: AppManifest,
  config: TrainingRunConfig,
  format: PackagingFormat,
  java: PathBuf,
}

impl<E: Executor> SpringPerformance<E> {
  /// Create an orchestrator with an already resolved configuration.
  ///
  /// The `java` command is resolved from `JRE_HOME`/`JAVA_HOME` now.
  /// `config.rezip` is recomputed from `format` and the shape of `app_path`:
  /// the tools jar mode cannot extract a directory into itself.
  pub fn new(
    executor: E,
    app_path: impl Into<PathBuf>,
    manifest: AppManifest,
    mut config: TrainingRunConfig,
    format: PackagingFormat,
  ) -> Self {
    let app_path = app_path.into();
    config.rezip = format.requires_rezip(&app_path);
    Self {
      executor,
      app_path,
      manifest,
      config,
      format,
      java: java_command(),
    }
  }

  /// Resolve format and configuration from the manifest and environment.
  pub fn from_env(
    executor: E,
    app_path: impl Into<PathBuf>,
    manifest: AppManifest,
    additional_libs: &[String],
  ) -> Result<Self, PerformanceError> {
    let app_path = app_path.into();
    let format = PackagingFormat::from_version(manifest.boot_version.as_deref());
    let config = TrainingRunConfig::resolve(&app_path, format, additional_libs)?;
    Ok(Self::new(executor, app_path, manifest, config, format))
  }

  pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
    self.java = java.into();
    self
  }

  pub fn config(&self) -> &TrainingRunConfig {
    &self.config
  }

  /// Compute the layer metadata from the current application tree.
  pub fn metadata(&self) -> Result<PerformanceMetadata, PerformanceError> {
    Ok(PerformanceMetadata {
      manifest: self.manifest.entries.clone(),
      files: list_files(&self.app_path, &[])?,
      config: self.config.clone(),
      format: self.format,
    })
  }

  /// Contribute the performance layer under `layers_dir`.
  ///
  /// With neither AOT nor a training run requested this is a no-op and no
  /// layer is created.
  pub async fn contribute(&self, layers_dir: &Path) -> Result<PerformanceOutcome, PerformanceError> {
    if !self.config.is_requested() {
      debug!("neither Spring AOT nor a CDS training run requested");
      return Ok(PerformanceOutcome {
        layer: None,
        status: None,
        state: PerformanceState::Complete,
      });
    }

    let contributor = LayerContributor::new(PERFORMANCE_LAYER, self.metadata()?, LayerTypes::BUILD_AND_LAUNCH);
    let mut state = PerformanceState::Disabled;

    let result = contributor
      .contribute(layers_dir, |layer| self.run(layer, &mut state))
      .await;

    match result {
      Ok((layer, status)) => Ok(PerformanceOutcome {
        layer: Some(layer),
        status: Some(status),
        state: PerformanceState::Complete,
      }),
      Err(e) => {
        error!(state = %state, error = %e, "performance layer contribution failed");
        transition(&mut state, PerformanceState::Failed);
        Err(e)
      }
    }
  }

  async fn run(&self, mut layer: Layer, state: &mut PerformanceState) -> Result<Layer, PerformanceError> {
    layer.launch_default(BPL_SPRING_AOT_ENABLED, self.config.aot_enabled);

    if !self.config.training_run {
      info!("Spring AOT enabled for launch, skipping training run");
      return Ok(layer);
    }

    let start_class = self.manifest.require_start_class()?.to_string();
    layer.launch_default(BPL_JVM_CDS_ENABLED, true);

    self.prepare(&layer, state).await?;

    transition(state, PerformanceState::NormalizingTimestamps);
    timestamps::normalize(&self.app_path);

    transition(state, PerformanceState::TrainingRun);
    self.training_run(&start_class).await?;

    self.collect(&layer).await?;
    transition(state, PerformanceState::Complete);
    Ok(layer)
  }

  /// Turn the application into the CDS layout, by whichever strategy the
  /// packaging format supports.
  async fn prepare(&self, layer: &Layer, state: &mut PerformanceState) -> Result<(), PerformanceError> {
    if !self.format.supports_tools_extract() {
      transition(state, PerformanceState::Extracting);
      extract::manual_layout(&self.app_path, &self.manifest)?;
      return Ok(());
    }

    // Keeps the temporary jar alive until extraction finished.
    let mut _staging = None;
    let mut jar = self.app_path.clone();

    if self.config.rezip {
      transition(state, PerformanceState::Repackaging);
      let dir = tempfile::Builder::new()
        .prefix("bootpack-jar")
        .tempdir()
        .map_err(io_err(&self.app_path))?;
      let temp_jar = dir.path().join(RUNNER_JAR);
      archive::create_jar(&self.app_path, &temp_jar)?;

      let persisted = layer.path.join(RUNNER_JAR);
      tokio::fs::copy(&temp_jar, &persisted).await.map_err(io_err(&persisted))?;
      tokio::fs::remove_dir_all(&self.app_path)
        .await
        .map_err(io_err(&self.app_path))?;

      jar = temp_jar;
      _staging = Some(dir);
    }

    transition(state, PerformanceState::Extracting);
    extract::extract_with_tools(&self.executor, &self.java, &jar, &self.app_path).await?;
    Ok(())
  }

  fn training_execution(&self, start_class: &str) -> Execution {
    let mut args = Vec::new();
    if self.config.aot_enabled {
      args.push("-Dspring.aot.enabled=true".to_string());
    }
    args.extend([
      "-Dspring.context.exit=onRefresh".to_string(),
      format!("-XX:ArchiveClassesAtExit={}", SHARED_ARCHIVE),
      "-cp".to_string(),
      self.config.classpath.clone(),
      start_class.to_string(),
    ]);

    let execution = Execution::new(self.java.to_string_lossy())
      .with_args(args)
      .with_dir(&self.app_path)
      .without_env(JAVA_TOOL_OPTIONS);

    match &self.config.java_tool_options {
      Some(options) => execution.with_env(JAVA_TOOL_OPTIONS, options.as_str()),
      None => execution,
    }
  }

  async fn training_run(&self, start_class: &str) -> Result<(), PerformanceError> {
    let execution = self.training_execution(start_class);
    info!(cmd = %execution.display(), dir = %self.app_path.display(), "starting training run");
    let output = self
      .executor
      .execute(execution)
      .await
      .map_err(PerformanceError::TrainingRun)?;
    debug!(stdout = %output.stdout, stderr = %output.stderr, "training run finished");
    Ok(())
  }

  /// Copy the training run's artifacts into the layer.
  async fn collect(&self, layer: &Layer) -> Result<(), PerformanceError> {
    let archive = self.app_path.join(SHARED_ARCHIVE);
    if archive.is_file() {
      let target = layer.path.join(SHARED_ARCHIVE);
      tokio::fs::copy(&archive, &target).await.map_err(io_err(&target))?;
    } else {
      warn!(path = %archive.display(), "training run did not produce a shared archive");
    }

    let runner = self.app_path.join(RUNNER_JAR);
    let persisted = layer.path.join(RUNNER_JAR);
    if runner.is_file() && !persisted.exists() {
      tokio::fs::copy(&runner, &persisted).await.map_err(io_err(&persisted))?;
    }
    Ok(())
  }
}

fn transition(state: &mut PerformanceState, next: PerformanceState) {
  debug!(from = %state, to = %next, "performance state");
  *state = next;
}
