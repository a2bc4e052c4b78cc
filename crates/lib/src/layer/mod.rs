//! Output layers.
//!
//! A layer is a directory under the layers root plus the environment and
//! lifecycle flags that come with it. [`LayerContributor`] builds a layer at
//! most once per set of inputs: the fingerprint of its metadata is stored in a
//! marker written after the contribution succeeded, and a later build with the
//! same fingerprint reuses the directory without running anything.

mod types;

pub use types::*;

use std::future::Future;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::consts::{LAYER_COMPLETE_MARKER, LAYER_MARKER_VERSION};
use crate::util::hash::Fingerprint;

const LAUNCH_ENV_DIR: &str = "env.launch";
const BUILD_ENV_DIR: &str = "env.build";

/// Contributes one named layer, keyed by the fingerprint of `metadata`.
#[derive(Debug, Clone)]
pub struct LayerContributor<M> {
  pub name: String,
  pub metadata: M,
  pub types: LayerTypes,
}

impl<M: Fingerprint> LayerContributor<M> {
  pub fn new(name: impl Into<String>, metadata: M, types: LayerTypes) -> Self {
    Self {
      name: name.into(),
      metadata,
      types,
    }
  }

  /// Produce the layer under `layers_dir`, running `f` only when needed.
  ///
  /// `f` receives an empty layer directory and returns the layer with any
  /// environment it wants recorded. When `f` fails the directory is left
  /// without a marker and is wiped on the next attempt.
  pub async fn contribute<F, Fut, E>(&self, layers_dir: &Path, f: F) -> Result<(Layer, ContributionStatus), E>
  where
    F: FnOnce(Layer) -> Fut,
    Fut: Future<Output = Result<Layer, E>>,
    E: From<LayerError>,
  {
    let fingerprint = self.metadata.fingerprint().map_err(LayerError::from)?;
    let mut layer = Layer::new(layers_dir, &self.name);

    info!(layer = %self.name, fingerprint = %fingerprint, "contributing layer");

    if layer.path.exists() {
      match read_marker(&layer.path) {
        Ok(Some(marker)) if marker.version == LAYER_MARKER_VERSION && marker.fingerprint == fingerprint.0 => {
          info!(layer = %self.name, "reusing cached layer");
          layer.types = marker.types;
          layer.launch_env = marker.launch_env;
          layer.build_env = marker.build_env;
          return Ok((layer, ContributionStatus::Reused));
        }
        Ok(Some(marker)) => {
          debug!(layer = %self.name, previous = %marker.fingerprint, "layer inputs changed, rebuilding");
        }
        Ok(None) => {
          debug!(path = ?layer.path, "incomplete layer found, removing");
        }
        Err(e) => {
          debug!(path = ?layer.path, error = %e, "invalid layer marker, removing");
        }
      }
      fs::remove_dir_all(&layer.path).await.map_err(LayerError::io(&layer.path))?;
    }

    fs::create_dir_all(&layer.path).await.map_err(LayerError::io(&layer.path))?;
    layer.types = self.types;

    let layer = f(layer).await?;

    write_env(&layer).await?;
    write_marker(&layer, &fingerprint.0).await?;
    debug!(layer = %layer.name, "layer complete");

    Ok((layer, ContributionStatus::Contributed))
  }
}

/// Read the completion marker of a layer.
///
/// Returns `None` if the marker doesn't exist.
pub fn read_marker(layer_path: &Path) -> Result<Option<LayerMarker>, LayerError> {
  let marker_path = layer_path.join(LAYER_COMPLETE_MARKER);
  if !marker_path.exists() {
    return Ok(None);
  }

  let content = std::fs::read_to_string(&marker_path).map_err(LayerError::io(&marker_path))?;
  let marker = serde_json::from_str(&content).map_err(|e| LayerError::ParseMarker {
    path: marker_path,
    message: e.to_string(),
  })?;
  Ok(Some(marker))
}

/// Check if a layer directory holds a finished contribution.
pub fn is_layer_complete(layer_path: &Path) -> bool {
  read_marker(layer_path).map(|m| m.is_some()).unwrap_or(false)
}

async fn write_marker(layer: &Layer, fingerprint: &str) -> Result<(), LayerError> {
  let marker = LayerMarker {
    version: LAYER_MARKER_VERSION,
    fingerprint: fingerprint.to_string(),
    types: layer.types,
    launch_env: layer.launch_env.clone(),
    build_env: layer.build_env.clone(),
  };
  let content = serde_json::to_string(&marker)?;
  let path = layer.path.join(LAYER_COMPLETE_MARKER);
  fs::write(&path, format!("{}\n", content))
    .await
    .map_err(LayerError::io(&path))
}

async fn write_env(layer: &Layer) -> Result<(), LayerError> {
  write_env_dir(&layer.path.join(LAUNCH_ENV_DIR), &layer.launch_env, "default").await?;
  write_env_dir(&layer.path.join(BUILD_ENV_DIR), &layer.build_env, "override").await
}

async fn write_env_dir(
  dir: &Path,
  env: &std::collections::BTreeMap<String, String>,
  suffix: &str,
) -> Result<(), LayerError> {
  if env.is_empty() {
    return Ok(());
  }
  fs::create_dir_all(dir).await.map_err(LayerError::io(dir))?;
  for (name, value) in env {
    let path = dir.join(format!("{}.{}", name, suffix));
    fs::write(&path, value).await.map_err(LayerError::io(&path))?;
  }
  Ok(())
}
