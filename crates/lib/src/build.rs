//! Build planning.
//!
//! A build happens in two steps. [`BuildPlan::resolve`] reads the
//! application and the environment and decides everything up front: labels,
//! dependencies, whether Spring Cloud Bindings is added, the training-run
//! configuration, image slices and process types. [`BuildPlan::execute`] then
//! contributes the layers, in order, through the given [`Executor`].
//!
//! Resolving first means a configuration error surfaces before anything in the
//! application directory or the layers root is touched. The one exception is
//! an application shipped as an executable jar, which is unpacked in place
//! during resolution.
//!
//! A native-image build contributes the native classpath layer only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{self, ArchiveError};
use crate::config::{self, BP_SPRING_CLOUD_BINDINGS_DISABLED, BP_SPRING_CLOUD_BINDINGS_VERSION, ConfigError, TrainingRunConfig};
use crate::consts::{
  LABEL_IMAGE_TITLE, LABEL_IMAGE_VERSION, LABEL_SPRING_BOOT_VERSION, MANIFEST_PATH, SPRING_CLOUD_BINDINGS,
  SPRING_CLOUD_BINDINGS_LAYER,
};
use crate::dependencies::{self, Dependency, DependencyError};
use crate::execute::Executor;
use crate::format::{PackagingFormat, parse_boot_version};
use crate::generations::{GenerationError, GenerationValidator, SPRING_BOOT_SLUG};
use crate::helper::{CLOUD_BINDINGS_HELPER, PERFORMANCE_HELPER};
use crate::jvm;
use crate::layer::{ContributionStatus, Layer, LayerContributor, LayerError, LayerTypes};
use crate::manifest::{AppManifest, ManifestError};
use crate::metadata::{self, MetadataError};
use crate::native_image::{self, NativeImageError};
use crate::performance::{PerformanceError, PerformanceState, SpringPerformance};
use crate::slices::{self, Slice, SlicesError};
use crate::util::hash::{DirHashError, Fingerprint, hash_file};
use crate::web_app_type::{self, ClassIndex, WebApplicationType, WebApplicationTypeError};

const PROCESS_TYPES: [&str; 3] = ["spring-boot-app", "task", "web"];
const DEFAULT_PROCESS_TYPE: &str = "web";

/// Errors planning or running a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
  #[error("unable to read application manifest: {0}")]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("unable to list dependencies: {0}")]
  Dependencies(#[from] DependencyError),

  #[error("unable to hash artifact: {0}")]
  Hash(#[from] DirHashError),

  #[error("unable to generate configuration metadata labels: {0}")]
  Metadata(#[from] MetadataError),

  #[error("unable to validate spring-boot version: {0}")]
  Generation(#[from] GenerationError),

  #[error("unable to contribute native image classpath: {0}")]
  NativeImage(#[from] NativeImageError),

  #[error(transparent)]
  Performance(#[from] PerformanceError),

  #[error("unable to determine web application type: {0}")]
  WebApplicationType(#[from] WebApplicationTypeError),

  #[error("error creating slices: {0}")]
  Slices(#[from] SlicesError),

  #[error(transparent)]
  Layer(#[from] LayerError),

  #[error("unable to find Spring Boot executable jar in {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid Spring Cloud Bindings artifact {0}")]
  InvalidArtifact(PathBuf),

  #[error("error finding Main-Class or Start-Class manifest entry for the process types")]
  MissingMainClass,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
  move |source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// What the caller asks for.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
  pub app_root: PathBuf,
  pub layers_dir: PathBuf,
  /// Spring Cloud Bindings jar to link into the application.
  pub cloud_bindings: Option<PathBuf>,
  /// Build a native image regardless of what the application declares.
  pub native_image: bool,
  /// `java` command; resolved from `JRE_HOME`/`JAVA_HOME` when unset.
  pub java: Option<PathBuf>,
  /// `spring-generations.toml` to check the Boot version against.
  pub generations: Option<PathBuf>,
}

impl BuildOptions {
  pub fn new(app_root: impl Into<PathBuf>, layers_dir: impl Into<PathBuf>) -> Self {
    Self {
      app_root: app_root.into(),
      layers_dir: layers_dir.into(),
      ..Default::default()
    }
  }

  pub fn with_cloud_bindings(mut self, artifact: impl Into<PathBuf>) -> Self {
    self.cloud_bindings = Some(artifact.into());
    self
  }

  pub fn with_native_image(mut self, native_image: bool) -> Self {
    self.native_image = native_image;
    self
  }

  pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
    self.java = Some(java.into());
    self
  }

  pub fn with_generations(mut self, path: impl Into<PathBuf>) -> Self {
    self.generations = Some(path.into());
    self
  }
}

/// A launch process type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
  #[serde(rename = "type")]
  pub kind: String,
  pub command: String,
  pub args: Vec<String>,
  pub default: bool,
}

/// A contributed layer and whether it was rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
  #[serde(flatten)]
  pub layer: Layer,
  pub status: ContributionStatus,
}

/// Everything a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildResult {
  pub labels: BTreeMap<String, String>,
  pub layers: Vec<LayerReport>,
  pub processes: Vec<Process>,
  pub helpers: Vec<String>,
  pub slices: Vec<Slice>,
  pub dependencies: Vec<Dependency>,
  pub cloud_bindings_version: Option<String>,
  pub web_application_type: Option<WebApplicationType>,
  pub performance: Option<PerformanceState>,
  /// End-of-support notices for the application's Boot version.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
  /// Arguments for the native-image compiler, native builds only.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub native_image_arguments: Vec<String>,
}

/// Spring Cloud Bindings to add to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudBindings {
  /// Major version line the artifact should come from.
  pub version: String,
  pub artifact: Option<PathBuf>,
}

/// The JVM (non-native) part of a plan.
#[derive(Debug, Clone)]
pub struct JvmPlan {
  pub cloud_bindings: Option<CloudBindings>,
  pub training: TrainingRunConfig,
  pub format: PackagingFormat,
  pub java: PathBuf,
  pub class_index: ClassIndex,
  pub slices: Vec<Slice>,
  pub helpers: Vec<String>,
  pub processes: Vec<Process>,
}

#[derive(Debug, Clone)]
pub enum BuildMode {
  Native,
  Jvm(Box<JvmPlan>),
}

/// A fully resolved build, ready to execute.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  pub app_root: PathBuf,
  pub layers_dir: PathBuf,
  pub manifest: AppManifest,
  pub labels: BTreeMap<String, String>,
  pub dependencies: Vec<Dependency>,
  pub warnings: Vec<String>,
  pub mode: BuildMode,
}

impl BuildPlan {
  /// Resolve a plan for the application in `options.app_root`.
  ///
  /// Returns `None` when the directory holds no Spring Boot application.
  pub fn resolve(options: &BuildOptions) -> Result<Option<Self>, BuildError> {
    let app_root = &options.app_root;
    let mut manifest = AppManifest::read(app_root)?;
    let mut boot_jar_main_class = None;

    if manifest.boot_version.is_none() {
      let Some((jar, jar_manifest)) = find_boot_jar(app_root)? else {
        info!(app = %app_root.display(), "no Spring Boot application found");
        return Ok(None);
      };
      explode_boot_jar(&jar, app_root)?;
      boot_jar_main_class = Some(jar_manifest.main_class.clone().ok_or(BuildError::MissingMainClass)?);
      manifest = jar_manifest;
    }

    let labels = labels(app_root, &manifest)?;
    let warnings = validate_generation(options, &manifest)?;
    let lib_dir = app_root.join(manifest.require_lib()?.trim_end_matches('/'));
    let dependencies = dependencies::list(&lib_dir)?;

    let mode = if native_image::is_native_requested(&manifest, options.native_image) {
      info!("native image requested");
      BuildMode::Native
    } else {
      let plan = Self::resolve_jvm(options, &manifest, &dependencies, boot_jar_main_class)?;
      BuildMode::Jvm(Box::new(plan))
    };

    Ok(Some(Self {
      app_root: app_root.clone(),
      layers_dir: options.layers_dir.clone(),
      manifest,
      labels,
      dependencies,
      warnings,
      mode,
    }))
  }

  fn resolve_jvm(
    options: &BuildOptions,
    manifest: &AppManifest,
    dependencies: &[Dependency],
    boot_jar_main_class: Option<String>,
  ) -> Result<JvmPlan, BuildError> {
    let app_root = &options.app_root;
    let mut helpers = Vec::new();
    let mut additional_libs = Vec::new();

    let cloud_bindings = match cloud_bindings_version(manifest, dependencies)? {
      Some(version) => {
        helpers.push(CLOUD_BINDINGS_HELPER.to_string());
        match &options.cloud_bindings {
          Some(artifact) => additional_libs.push(artifact_name(artifact)?),
          None => warn!(version = %version, "no Spring Cloud Bindings artifact supplied, registering the helper only"),
        }
        Some(CloudBindings {
          version,
          artifact: options.cloud_bindings.clone(),
        })
      }
      None => None,
    };

    let format = PackagingFormat::from_version(manifest.boot_version.as_deref());
    let training = TrainingRunConfig::resolve(app_root, format, &additional_libs)?;
    if training.is_requested() {
      info!(training = training.training_run, aot = training.aot_enabled, "performance layer requested");
      helpers.push(PERFORMANCE_HELPER.to_string());
    }

    let classes_dir = app_root.join(manifest.require_classes()?.trim_end_matches('/'));
    let lib_dir = app_root.join(manifest.require_lib()?.trim_end_matches('/'));
    let class_index = ClassIndex::scan(&classes_dir, &lib_dir)?;
    let slices = slices::resolve(app_root, manifest)?;

    let processes = if training.training_run {
      let start_class = manifest.start_class.as_deref().ok_or(BuildError::MissingMainClass)?;
      processes(start_class, Some(&training.classpath))
    } else if let Some(main_class) = &boot_jar_main_class {
      processes(main_class, None)
    } else {
      debug!("exploded application without a training run, no process types");
      Vec::new()
    };

    Ok(JvmPlan {
      cloud_bindings,
      training,
      format,
      java: options.java.clone().unwrap_or_else(jvm::java_command),
      class_index,
      slices,
      helpers,
      processes,
    })
  }

  /// Contribute the planned layers.
  pub async fn execute<E: Executor>(self, executor: &E) -> Result<BuildResult, BuildError> {
    let mut result = BuildResult {
      labels: self.labels,
      dependencies: self.dependencies,
      warnings: self.warnings,
      ..Default::default()
    };

    let plan = match self.mode {
      BuildMode::Native => {
        let (layer, status) = native_image::contribute(&self.app_root, &self.layers_dir, &self.manifest).await?;
        result.native_image_arguments = native_image::layer_arguments(&layer, &self.manifest);
        result.layers.push(LayerReport { layer, status });
        return Ok(result);
      }
      BuildMode::Jvm(plan) => *plan,
    };

    if let Some(CloudBindings {
      version,
      artifact: Some(artifact),
    }) = &plan.cloud_bindings
    {
      let lib_dir = self.app_root.join(self.manifest.require_lib()?.trim_end_matches('/'));
      let (layer, status) = contribute_cloud_bindings(artifact, version, &self.layers_dir, &lib_dir).await?;
      result.layers.push(LayerReport { layer, status });
    }
    result.cloud_bindings_version = plan.cloud_bindings.map(|b| b.version);

    let (layer, status) = web_app_type::contribute(&self.app_root, &self.layers_dir, &plan.class_index).await?;
    result.web_application_type = Some(plan.class_index.resolve());
    result.layers.push(LayerReport { layer, status });

    let performance = SpringPerformance::new(executor, &self.app_root, self.manifest, plan.training, plan.format)
      .with_java(plan.java);
    let outcome = performance.contribute(&self.layers_dir).await?;
    if let (Some(layer), Some(status)) = (outcome.layer, outcome.status) {
      result.layers.push(LayerReport { layer, status });
      result.performance = Some(outcome.state);
    }

    result.slices = plan.slices;
    result.helpers = plan.helpers;
    result.processes = plan.processes;
    Ok(result)
  }
}

/// Resolve and execute a build in one go.
pub async fn build<E: Executor>(executor: &E, options: &BuildOptions) -> Result<Option<BuildResult>, BuildError> {
  match BuildPlan::resolve(options)? {
    Some(plan) => Ok(Some(plan.execute(executor).await?)),
    None => Ok(None),
  }
}

/// Image labels derived from the manifest, plus the configuration metadata
/// labels when the application ships Data Flow metadata.
pub fn labels(app_root: &Path, manifest: &AppManifest) -> Result<BTreeMap<String, String>, BuildError> {
  let mut labels: BTreeMap<String, String> = [
    (LABEL_SPRING_BOOT_VERSION, &manifest.boot_version),
    (LABEL_IMAGE_TITLE, &manifest.implementation_title),
    (LABEL_IMAGE_VERSION, &manifest.implementation_version),
  ]
  .into_iter()
  .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
  .collect();

  labels.extend(metadata::labels(app_root, manifest)?);
  Ok(labels)
}

/// Check the Boot version against the configured generations file.
fn validate_generation(options: &BuildOptions, manifest: &AppManifest) -> Result<Vec<String>, BuildError> {
  let (Some(path), Some(version)) = (&options.generations, &manifest.boot_version) else {
    return Ok(Vec::new());
  };
  let validator = GenerationValidator::load(path)?;
  Ok(validator.validate(SPRING_BOOT_SLUG, version)?.into_iter().collect())
}

/// `spring-boot-app`, `task` and `web` processes running `main_class`.
pub fn processes(main_class: &str, classpath: Option<&str>) -> Vec<Process> {
  let mut args = Vec::new();
  if let Some(classpath) = classpath {
    args.push("-cp".to_string());
    args.push(classpath.to_string());
  }
  args.push(main_class.to_string());

  PROCESS_TYPES
    .iter()
    .map(|kind| Process {
      kind: kind.to_string(),
      command: "java".to_string(),
      args: args.clone(),
      default: *kind == DEFAULT_PROCESS_TYPE,
    })
    .collect()
}

/// Spring Cloud Bindings version line to add, or `None` when it is not wanted.
///
/// Boot 3.0.0 and earlier use the `1` line; later versions use `2`.
pub fn cloud_bindings_version(
  manifest: &AppManifest,
  dependencies: &[Dependency],
) -> Result<Option<String>, ConfigError> {
  if dependencies::has_dependency(dependencies, SPRING_CLOUD_BINDINGS) {
    info!("a Spring Cloud Bindings library was found in the application, not adding another one");
    return Ok(None);
  }
  if config::resolve_bool(BP_SPRING_CLOUD_BINDINGS_DISABLED)? {
    debug!("Spring Cloud Bindings disabled");
    return Ok(None);
  }
  if let Some(version) = config::resolve(BP_SPRING_CLOUD_BINDINGS_VERSION) {
    return Ok(Some(version));
  }

  let boot = manifest
    .boot_version
    .as_deref()
    .and_then(parse_boot_version)
    .ok_or_else(|| ConfigError::UnknownBindingsVersion {
      boot_version: manifest.boot_version.clone(),
    })?;
  let line = if boot <= Version::new(3, 0, 0) { "1" } else { "2" };
  Ok(Some(line.to_string()))
}

/// First jar under `app_root` (in name order) whose manifest has both
/// `Main-Class` and `Spring-Boot-Version`.
pub fn find_boot_jar(app_root: &Path) -> Result<Option<(PathBuf, AppManifest)>, BuildError> {
  for entry in WalkDir::new(app_root).sort_by_file_name() {
    let entry = entry.map_err(|source| BuildError::Walk {
      path: app_root.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "jar") {
      continue;
    }

    let Some(bytes) = archive::read_entry(path, MANIFEST_PATH)? else {
      continue;
    };
    let manifest = AppManifest::parse(&String::from_utf8_lossy(&bytes))?;
    if manifest.main_class.is_some() && manifest.boot_version.is_some() {
      info!(jar = %path.display(), "found Spring Boot executable jar");
      return Ok(Some((path.to_path_buf(), manifest)));
    }
  }
  Ok(None)
}

/// Replace the contents of `app_root` with the unpacked `jar`.
pub fn explode_boot_jar(jar: &Path, app_root: &Path) -> Result<(), BuildError> {
  let staging = tempfile::Builder::new()
    .prefix("bootpack-jar")
    .tempdir()
    .map_err(io_err(app_root))?;

  let entries = archive::extract_zip(jar, staging.path())?;
  archive::clear_dir(app_root)?;
  archive::copy_tree(staging.path(), app_root)?;

  info!(jar = %jar.display(), entries, "unpacked executable jar");
  Ok(())
}

fn artifact_name(artifact: &Path) -> Result<String, BuildError> {
  artifact
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .ok_or_else(|| BuildError::InvalidArtifact(artifact.to_path_buf()))
}

#[derive(Debug, Clone, Serialize)]
struct CloudBindingsMetadata {
  artifact: String,
  sha256: String,
  version: String,
}

impl Fingerprint for CloudBindingsMetadata {}

/// Copy the bindings jar into its launch layer and link it into `lib_dir`.
async fn contribute_cloud_bindings(
  artifact: &Path,
  version: &str,
  layers_dir: &Path,
  lib_dir: &Path,
) -> Result<(Layer, ContributionStatus), BuildError> {
  let name = artifact_name(artifact)?;
  let metadata = CloudBindingsMetadata {
    artifact: name.clone(),
    sha256: hash_file(artifact)?.0,
    version: version.to_string(),
  };
  let contributor = LayerContributor::new(SPRING_CLOUD_BINDINGS_LAYER, metadata, LayerTypes::LAUNCH);

  let file_name = name.as_str();
  let (layer, status) = contributor
    .contribute(layers_dir, |layer| async move {
      let target = layer.path.join(file_name);
      tokio::fs::copy(artifact, &target).await.map_err(io_err(&target))?;
      info!(artifact = %file_name, "contributed Spring Cloud Bindings");
      Ok::<_, BuildError>(layer)
    })
    .await?;

  tokio::fs::create_dir_all(lib_dir).await.map_err(io_err(lib_dir))?;
  let link = lib_dir.join(&name);
  if link.symlink_metadata().is_ok() {
    tokio::fs::remove_file(&link).await.map_err(io_err(&link))?;
  }
  symlink_file(&layer.path.join(&name), &link).map_err(io_err(&link))?;
  debug!(link = %link.display(), "linked Spring Cloud Bindings into the application");

  Ok((layer, status))
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}
