//! Layer types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors managing a layer directory.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
  #[error("I/O error on layer {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unable to fingerprint layer metadata: {0}")]
  Fingerprint(#[from] serde_json::Error),

  #[error("unable to parse layer marker {path}: {message}")]
  ParseMarker { path: PathBuf, message: String },
}

impl LayerError {
  pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> LayerError + '_ {
    move |source| LayerError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Which phases of the image lifecycle see a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTypes {
  pub build: bool,
  pub launch: bool,
  pub cache: bool,
}

impl LayerTypes {
  pub const BUILD_AND_LAUNCH: LayerTypes = LayerTypes {
    build: true,
    launch: true,
    cache: false,
  };
  pub const LAUNCH: LayerTypes = LayerTypes {
    build: false,
    launch: true,
    cache: false,
  };
  pub const BUILD: LayerTypes = LayerTypes {
    build: true,
    launch: false,
    cache: false,
  };
}

/// A unit of build output, reused across builds while its inputs are unchanged.
///
/// Environment entries are persisted next to the content in the CNB layout:
/// launch defaults under `env.launch/<NAME>.default`, build overrides under
/// `env.build/<NAME>.override`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
  pub name: String,
  pub path: PathBuf,
  pub types: LayerTypes,
  /// Launch environment defaults, applied unless the user sets the variable.
  pub launch_env: BTreeMap<String, String>,
  /// Build environment overrides, replacing any existing value.
  pub build_env: BTreeMap<String, String>,
}

impl Layer {
  /// A fresh layer named `name` under `layers_dir`.
  pub fn new(layers_dir: &Path, name: &str) -> Self {
    Self {
      name: name.to_string(),
      path: layers_dir.join(name),
      types: LayerTypes::default(),
      launch_env: BTreeMap::new(),
      build_env: BTreeMap::new(),
    }
  }

  pub fn launch_default(&mut self, key: &str, value: impl ToString) {
    self.launch_env.insert(key.to_string(), value.to_string());
  }

  pub fn build_override(&mut self, key: &str, value: impl ToString) {
    self.build_env.insert(key.to_string(), value.to_string());
  }
}

/// Marker written into a layer once its contribution completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMarker {
  /// Marker format version.
  pub version: u32,
  /// Fingerprint of the metadata the layer was built from.
  pub fingerprint: String,
  pub types: LayerTypes,
  pub launch_env: BTreeMap<String, String>,
  #[serde(default)]
  pub build_env: BTreeMap<String, String>,
}

/// Whether a contribution ran or was served from the existing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
  Contributed,
  Reused,
}
