//! Native image support.
//!
//! A native build does not train a JVM. It exports the application classpath
//! for the native-image compiler and produces its argument list.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classpath::{self, ClasspathError};
use crate::config::{self, BP_MAVEN_ACTIVE_PROFILES, BP_NATIVE_IMAGE_BUILD_ARGUMENTS};
use crate::consts::NATIVE_IMAGE_CLASSPATH_LAYER;
use crate::layer::{ContributionStatus, Layer, LayerContributor, LayerError, LayerTypes};
use crate::manifest::{AppManifest, ManifestError};
use crate::util::hash::Fingerprint;

/// Build environment variable the classpath is exported as.
pub const CLASSPATH: &str = "CLASSPATH";

#[derive(Debug, thiserror::Error)]
pub enum NativeImageError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Classpath(#[from] ClasspathError),

  #[error(transparent)]
  Layer(#[from] LayerError),
}

/// Whether the application should be compiled to a native image.
///
/// `requested` is the caller's explicit choice. Otherwise a native-processed
/// manifest or an active `native` Maven profile turns it on.
pub fn is_native_requested(manifest: &AppManifest, requested: bool) -> bool {
  if requested || manifest.native_processed {
    return true;
  }

  config::resolve(BP_MAVEN_ACTIVE_PROFILES)
    .is_some_and(|profiles| profiles.split(',').map(str::trim).any(|p| p == "native" || p == "?native"))
}

/// Absolute classpath entries: classes dir, every indexed library, then the
/// application root itself.
pub fn classpath(app_root: &Path, manifest: &AppManifest) -> Result<Vec<PathBuf>, NativeImageError> {
  let classes = manifest.require_classes()?;
  let mut entries = vec![app_root.join(classes.trim_end_matches('/'))];
  entries.extend(classpath::resolve(app_root, manifest)?.iter().map(|e| app_root.join(e)));
  entries.push(app_root.to_path_buf());
  Ok(entries)
}

/// Join classpath entries with `:`.
pub fn join_classpath(entries: &[PathBuf]) -> String {
  entries
    .iter()
    .map(|e| e.to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join(":")
}

/// Arguments for the native-image compiler.
///
/// User arguments from `BP_NATIVE_IMAGE_BUILD_ARGUMENTS` come first. The image
/// is named after the start class and written into `layer_path`.
pub fn build_arguments(layer_path: &Path, start_class: &str, classpath: &str) -> Vec<String> {
  let mut args: Vec<String> = config::resolve(BP_NATIVE_IMAGE_BUILD_ARGUMENTS)
    .map(|raw| raw.split_whitespace().map(str::to_string).collect())
    .unwrap_or_default();

  args.push(format!("-H:Name={}", layer_path.join(start_class).display()));
  args.push("-cp".to_string());
  args.push(classpath.to_string());
  args.push(start_class.to_string());
  args
}

/// Compiler arguments for a contributed classpath layer.
///
/// Empty when the manifest names no `Start-Class`.
pub fn layer_arguments(layer: &Layer, manifest: &AppManifest) -> Vec<String> {
  let Some(start_class) = manifest.start_class.as_deref() else {
    warn!("no Start-Class in the manifest, native image arguments left unresolved");
    return Vec::new();
  };
  let classpath = layer.build_env.get(CLASSPATH).map(String::as_str).unwrap_or_default();
  build_arguments(&layer.path, start_class, classpath)
}

#[derive(Debug, Clone, Serialize)]
struct NativeImageMetadata {
  classpath: Vec<String>,
}

impl Fingerprint for NativeImageMetadata {}

/// Contribute the build-only `native-image-classpath` layer.
pub async fn contribute(
  app_root: &Path,
  layers_dir: &Path,
  manifest: &AppManifest,
) -> Result<(Layer, ContributionStatus), NativeImageError> {
  let joined = join_classpath(&classpath(app_root, manifest)?);
  debug!(classpath = %joined, "native image classpath");

  let metadata = NativeImageMetadata {
    classpath: joined.split(':').map(str::to_string).collect(),
  };
  let contributor = LayerContributor::new(NATIVE_IMAGE_CLASSPATH_LAYER, metadata, LayerTypes::BUILD);

  contributor
    .contribute(layers_dir, |mut layer| async move {
      info!(layer = %layer.name, "exporting native image classpath");
      layer.build_override(CLASSPATH, &joined);
      Ok::<_, NativeImageError>(layer)
    })
    .await
}
