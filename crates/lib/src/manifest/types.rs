//! Application manifest types.
//!
//! A packaged Spring Boot application carries a `META-INF/MANIFEST.MF` whose
//! attributes locate the application classes, the library directory, and the
//! classpath ordering. [`AppManifest`] parses that file once into named
//! optional fields; consumers ask for the field they need and get a typed
//! [`ManifestError::MissingEntry`] when it is absent.
//!
//! # Format
//!
//! The manifest is a list of `Name: Value` lines. A line starting with a single
//! space continues the previous value. Both `\r\n` and `\n` terminators are
//! accepted on input.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::MANIFEST_PATH;

pub const START_CLASS: &str = "Start-Class";
pub const MAIN_CLASS: &str = "Main-Class";
pub const SPRING_BOOT_CLASSES: &str = "Spring-Boot-Classes";
pub const SPRING_BOOT_LIB: &str = "Spring-Boot-Lib";
pub const SPRING_BOOT_CLASSPATH_INDEX: &str = "Spring-Boot-Classpath-Index";
pub const SPRING_BOOT_LAYERS_INDEX: &str = "Spring-Boot-Layers-Index";
pub const SPRING_BOOT_VERSION: &str = "Spring-Boot-Version";
pub const SPRING_BOOT_NATIVE_PROCESSED: &str = "Spring-Boot-Native-Processed";
pub const IMPLEMENTATION_TITLE: &str = "Implementation-Title";
pub const IMPLEMENTATION_VERSION: &str = "Implementation-Version";

/// Errors reading or querying an application manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
  #[error("unable to read manifest {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed manifest line {line}: {content:?}")]
  Malformed { line: usize, content: String },

  #[error("manifest does not contain {0}")]
  MissingEntry(&'static str),
}

/// Parsed application manifest.
///
/// Immutable once parsed. All attributes are kept in `entries` for
/// fingerprinting; the well-known ones are also resolved into named fields.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
  pub start_class: Option<String>,
  pub main_class: Option<String>,
  pub classes: Option<String>,
  pub lib: Option<String>,
  pub classpath_index: Option<String>,
  pub layers_index: Option<String>,
  pub boot_version: Option<String>,
  pub implementation_title: Option<String>,
  pub implementation_version: Option<String>,
  pub native_processed: bool,
  /// Every attribute in file order-independent form.
  pub entries: BTreeMap<String, String>,
}

impl AppManifest {
  /// Read `META-INF/MANIFEST.MF` under `app_root`.
  ///
  /// A missing manifest file yields an empty manifest, since an application
  /// directory may hold a boot jar instead of exploded content.
  pub fn read(app_root: &Path) -> Result<Self, ManifestError> {
    let path = app_root.join(MANIFEST_PATH);
    match std::fs::read_to_string(&path) {
      Ok(content) => Self::parse(&content),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(ManifestError::Read {
        path: path.display().to_string(),
        source,
      }),
    }
  }

  /// Parse manifest text.
  pub fn parse(content: &str) -> Result<Self, ManifestError> {
    let mut entries = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for (idx, raw) in content.split('\n').enumerate() {
      let line = raw.strip_suffix('\r').unwrap_or(raw);

      if let Some(continuation) = line.strip_prefix(' ') {
        match current.as_mut() {
          Some((_, value)) => value.push_str(continuation),
          None => {
            return Err(ManifestError::Malformed {
              line: idx + 1,
              content: line.to_string(),
            });
          }
        }
        continue;
      }

      if let Some((name, value)) = current.take() {
        entries.insert(name, value);
      }

      if line.is_empty() {
        continue;
      }

      let Some((name, value)) = line.split_once(':') else {
        return Err(ManifestError::Malformed {
          line: idx + 1,
          content: line.to_string(),
        });
      };
      current = Some((name.trim().to_string(), value.trim_start().to_string()));
    }

    if let Some((name, value)) = current.take() {
      entries.insert(name, value);
    }

    Ok(Self::from_entries(entries))
  }

  /// Build a manifest from already-split attributes.
  pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
    let get = |key: &str| entries.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    Self {
      start_class: get(START_CLASS),
      main_class: get(MAIN_CLASS),
      classes: get(SPRING_BOOT_CLASSES),
      lib: get(SPRING_BOOT_LIB),
      classpath_index: get(SPRING_BOOT_CLASSPATH_INDEX),
      layers_index: get(SPRING_BOOT_LAYERS_INDEX),
      boot_version: get(SPRING_BOOT_VERSION),
      implementation_title: get(IMPLEMENTATION_TITLE),
      implementation_version: get(IMPLEMENTATION_VERSION),
      native_processed: get(SPRING_BOOT_NATIVE_PROCESSED)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false),
      entries,
    }
  }

  /// Look up any attribute by name.
  pub fn get(&self, name: &str) -> Option<&str> {
    self.entries.get(name).map(String::as_str)
  }

  pub fn require_start_class(&self) -> Result<&str, ManifestError> {
    self.start_class.as_deref().ok_or(ManifestError::MissingEntry(START_CLASS))
  }

  pub fn require_classes(&self) -> Result<&str, ManifestError> {
    self.classes.as_deref().ok_or(ManifestError::MissingEntry(SPRING_BOOT_CLASSES))
  }

  pub fn require_lib(&self) -> Result<&str, ManifestError> {
    self.lib.as_deref().ok_or(ManifestError::MissingEntry(SPRING_BOOT_LIB))
  }

  pub fn require_classpath_index(&self) -> Result<&str, ManifestError> {
    self
      .classpath_index
      .as_deref()
      .ok_or(ManifestError::MissingEntry(SPRING_BOOT_CLASSPATH_INDEX))
  }

  /// Whether this manifest describes a Spring Boot application.
  pub fn is_spring_boot(&self) -> bool {
    self.boot_version.is_some()
  }
}
