//! Archive extraction into a CDS-friendly layout.
//!
//! A CDS training run needs the application split into a small launcher jar
//! whose manifest carries the classpath, the application classes as a jar, and
//! every dependency as a plain file. Spring Boot 3.3 and later produce this
//! layout through the `tools` jar mode; for older formats it is assembled here.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{self, ArchiveError};
use crate::classpath::{self, ClasspathError, ClasspathLayout};
use crate::consts::{APPLICATION_DIR, DEPENDENCIES_DIR, MANIFEST_PATH, RUNNER_JAR};
use crate::execute::{ExecuteError, Execution, Executor};
use crate::manifest::{AppManifest, ManifestError, write_runner_manifest};

/// Errors producing the extracted layout.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
  #[error("error extracting {jar} with the tools jar mode: {source}")]
  Tools {
    jar: PathBuf,
    #[source]
    source: ExecuteError,
  },

  #[error("extraction destination {dest} contains the archive {jar}")]
  SourceInsideDestination { jar: PathBuf, dest: PathBuf },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Classpath(#[from] ClasspathError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
  move |source| ExtractError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Run `java -Djarmode=tools -jar <jar> extract --destination <dest>`.
///
/// The destination is replaced entirely. The process runs in the jar's
/// directory.
pub async fn extract_with_tools<E: Executor>(
  executor: &E,
  java: &Path,
  jar: &Path,
  dest: &Path,
) -> Result<(), ExtractError> {
  if jar.starts_with(dest) {
    return Err(ExtractError::SourceInsideDestination {
      jar: jar.to_path_buf(),
      dest: dest.to_path_buf(),
    });
  }

  if dest.exists() {
    tokio::fs::remove_dir_all(dest).await.map_err(io_err(dest))?;
  }

  info!(jar = %jar.display(), dest = %dest.display(), "extracting jar with tools jar mode");

  let execution = Execution::new(java.to_string_lossy())
    .with_args([
      "-Djarmode=tools".to_string(),
      "-jar".to_string(),
      jar.to_string_lossy().into_owned(),
      "extract".to_string(),
      "--destination".to_string(),
      dest.to_string_lossy().into_owned(),
    ])
    .with_dir(jar.parent().unwrap_or(Path::new("")));

  executor
    .execute(execution)
    .await
    .map_err(|source| ExtractError::Tools {
      jar: jar.to_path_buf(),
      source,
    })?;
  Ok(())
}

/// Result of assembling the layout by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsLayout {
  /// Path of the application jar, relative to the application root.
  pub application_jar: String,
  /// `Class-Path` of the runner manifest, application jar first.
  pub classpath: Vec<String>,
  /// Number of library files copied into `dependencies/`.
  pub dependencies: usize,
}

/// `application/<Implementation-Title>-<Implementation-Version>.jar`, or
/// `application/application.jar` when either attribute is missing.
pub fn application_jar_name(manifest: &AppManifest) -> String {
  match (&manifest.implementation_title, &manifest.implementation_version) {
    (Some(title), Some(version)) => format!("{}/{}-{}.jar", APPLICATION_DIR, title, version),
    _ => format!("{}/application.jar", APPLICATION_DIR),
  }
}

/// Rebuild the exploded application at `app_root` into the CDS layout:
///
/// ```text
/// runner.jar               manifest only: Main-Class + Class-Path
/// application/<name>.jar   the application classes, stored
/// dependencies/*.jar       the libraries, symlinks dereferenced
/// ```
///
/// The previous contents of `app_root` are removed.
pub fn manual_layout(app_root: &Path, manifest: &AppManifest) -> Result<CdsLayout, ExtractError> {
  let start_class = manifest.require_start_class()?;
  let layout = ClasspathLayout::from_manifest(manifest)?;
  let entries = classpath::resolve(app_root, manifest)?;

  let staging = tempfile::Builder::new()
    .prefix("bootpack-layout")
    .tempdir()
    .map_err(io_err(app_root))?;
  let stage = staging.path().join("layout");
  let runner_source = staging.path().join("runner");

  let application_jar = application_jar_name(manifest);
  archive::create_jar(&app_root.join(&layout.classes), &stage.join(&application_jar))?;

  let mut classpath = vec![application_jar.clone()];
  classpath.extend(classpath::relocate(&entries, &layout.lib, DEPENDENCIES_DIR));

  let manifest_path = runner_source.join(MANIFEST_PATH);
  write_runner_manifest(&manifest_path, start_class, &classpath).map_err(io_err(&manifest_path))?;
  archive::create_jar(&runner_source, &stage.join(RUNNER_JAR))?;

  let dependencies = archive::copy_tree(&app_root.join(&layout.lib), &stage.join(DEPENDENCIES_DIR))?;
  debug!(count = dependencies, "copied dependencies");

  archive::clear_dir(app_root)?;
  archive::copy_tree(&stage, app_root)?;

  info!(
    app = %app_root.display(),
    application_jar = %application_jar,
    entries = classpath.len(),
    "assembled CDS layout"
  );

  Ok(CdsLayout {
    application_jar,
    classpath,
    dependencies,
  })
}
