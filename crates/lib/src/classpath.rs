//! Classpath reconstruction from the classpath index.
//!
//! `Spring-Boot-Classpath-Index` names a YAML list of library references in
//! load order. The list has had two shapes over the years:
//!
//! - bare file names (`a.jar`), resolved against `Spring-Boot-Lib`
//! - paths relative to the application root (`BOOT-INF/lib/a.jar`)
//!
//! The shape is detected per entry by the presence of a `/`. Order is kept
//! exactly: a CDS archive is only valid when the launch classpath matches the
//! training classpath entry for entry.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::manifest::{AppManifest, ManifestError};

/// Errors resolving the application classpath.
#[derive(Debug, thiserror::Error)]
pub enum ClasspathError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("unable to open {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unable to decode {path}: {source}")]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
}

/// The manifest attributes that locate an application's classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathLayout {
  pub classes: String,
  pub lib: String,
  pub index: String,
}

impl ClasspathLayout {
  /// Pull the layout out of a manifest; all three attributes are required.
  pub fn from_manifest(manifest: &AppManifest) -> Result<Self, ManifestError> {
    Ok(Self {
      classes: manifest.require_classes()?.to_string(),
      lib: manifest.require_lib()?.to_string(),
      index: manifest.require_classpath_index()?.to_string(),
    })
  }
}

/// Read and decode a classpath index file.
///
/// An empty file is an empty classpath.
pub fn read_index(path: &Path) -> Result<Vec<String>, ClasspathError> {
  let content = fs::read_to_string(path).map_err(|source| ClasspathError::Open {
    path: path.to_path_buf(),
    source,
  })?;

  if content.trim().is_empty() {
    return Ok(Vec::new());
  }

  serde_yaml::from_str(&content).map_err(|source| ClasspathError::Decode {
    path: path.to_path_buf(),
    source,
  })
}

/// Resolve decoded index references against the library directory.
///
/// A reference without a `/` becomes `<lib_dir>/<reference>`; anything else is
/// already relative to the application root and is returned unchanged.
pub fn resolve_references(references: &[String], lib_dir: &str) -> Vec<String> {
  let lib_dir = lib_dir.trim_end_matches('/');
  references
    .iter()
    .map(|reference| {
      if reference.contains('/') {
        reference.clone()
      } else {
        format!("{}/{}", lib_dir, reference)
      }
    })
    .collect()
}

/// Resolve the ordered classpath entries of the application at `app_root`.
///
/// Entries are relative to `app_root` and `/`-separated.
pub fn resolve(app_root: &Path, manifest: &AppManifest) -> Result<Vec<String>, ClasspathError> {
  let layout = ClasspathLayout::from_manifest(manifest)?;
  let references = read_index(&app_root.join(&layout.index))?;
  let entries = resolve_references(&references, &layout.lib);
  debug!(index = %layout.index, count = entries.len(), "resolved classpath index");
  Ok(entries)
}

/// Move resolved entries from the library directory into `target_dir`.
///
/// Entries outside the library directory are kept as they are.
pub fn relocate(entries: &[String], lib_dir: &str, target_dir: &str) -> Vec<String> {
  let lib_prefix = format!("{}/", lib_dir.trim_end_matches('/'));
  let target_dir = target_dir.trim_end_matches('/');
  entries
    .iter()
    .map(|entry| match entry.strip_prefix(&lib_prefix) {
      Some(rest) => format!("{}/{}", target_dir, rest),
      None => entry.clone(),
    })
    .collect()
}
