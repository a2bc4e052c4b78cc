//! Image slices.
//!
//! Slices split the application directory into groups of paths that change at
//! different rates, so an image exporter can put each group in its own layer.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::manifest::{AppManifest, ManifestError};
use crate::util::hash::relative_slash_path;

const RESOURCE_DIRS: [&str; 4] = ["META-INF/resources", "resources", "static", "public"];

#[derive(Debug, thiserror::Error)]
pub enum SlicesError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("unable to open layers index {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unable to decode layers index {path}: {source}")]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("unable to walk {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

/// A named group of paths, relative to the application root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slice {
  pub name: String,
  pub paths: Vec<String>,
}

/// Slices for the application at `app_root`.
///
/// A `Spring-Boot-Layers-Index` takes precedence over the conventional split.
pub fn resolve(app_root: &Path, manifest: &AppManifest) -> Result<Vec<Slice>, SlicesError> {
  let slices = match &manifest.layers_index {
    Some(index) => index_slices(&app_root.join(index))?,
    None => convention_slices(app_root, manifest.require_classes()?, manifest.require_lib()?)?,
  };

  for slice in &slices {
    info!(slice = %slice.name, paths = slice.paths.len(), "image slice");
  }
  Ok(slices)
}

/// Decode a layers index: a list of single-entry `{name: [paths]}` maps.
pub fn index_slices(index: &Path) -> Result<Vec<Slice>, SlicesError> {
  let content = fs::read_to_string(index).map_err(|source| SlicesError::Open {
    path: index.to_path_buf(),
    source,
  })?;
  let layers: Vec<BTreeMap<String, Vec<String>>> =
    serde_yaml::from_str(&content).map_err(|source| SlicesError::Decode {
      path: index.to_path_buf(),
      source,
    })?;

  Ok(
    layers
      .into_iter()
      .flatten()
      .filter(|(_, paths)| !paths.is_empty())
      .map(|(name, paths)| Slice { name, paths })
      .collect(),
  )
}

/// Split by convention: release libraries, snapshot libraries, static
/// resources, then the remaining classes.
pub fn convention_slices(app_root: &Path, classes: &str, lib: &str) -> Result<Vec<Slice>, SlicesError> {
  let classes_dir = app_root.join(classes.trim_end_matches('/'));
  let libs = files_under(app_root, &app_root.join(lib.trim_end_matches('/')))?;
  let (snapshots, releases): (Vec<String>, Vec<String>) = libs.into_iter().partition(|p| p.contains("SNAPSHOT"));

  let mut resources = Vec::new();
  for dir in RESOURCE_DIRS {
    resources.extend(files_under(app_root, &classes_dir.join(dir))?);
  }

  let application: Vec<String> = files_under(app_root, &classes_dir)?
    .into_iter()
    .filter(|p| !resources.contains(p))
    .collect();

  let slices = [
    ("dependencies", releases),
    ("snapshot-dependencies", snapshots),
    ("resources", resources),
    ("application", application),
  ];
  Ok(
    slices
      .into_iter()
      .filter(|(_, paths)| !paths.is_empty())
      .map(|(name, paths)| Slice {
        name: name.to_string(),
        paths,
      })
      .collect(),
  )
}

/// Files under `dir`, relative to `root`, in name order. Missing is empty.
fn files_under(root: &Path, dir: &Path) -> Result<Vec<String>, SlicesError> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(|source| SlicesError::Walk {
      path: dir.to_path_buf(),
      source,
    })?;
    if !entry.file_type().is_dir() {
      files.push(relative_slash_path(root, entry.path()));
    }
  }
  debug!(dir = %dir.display(), count = files.len(), "listed slice files");
  Ok(files)
}
