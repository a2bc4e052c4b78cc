//! Spring configuration metadata image labels.
//!
//! Spring Cloud Data Flow discovers the properties an application exposes
//! from two image labels. Both are only produced when the application carries
//! a Data Flow metadata properties file: the merged
//! `spring-configuration-metadata.json` of the application and its libraries,
//! and the subset of it the Data Flow file selects.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::{self, ArchiveError};
use crate::manifest::{AppManifest, ManifestError};

pub const CONFIGURATION_METADATA: &str = "META-INF/spring-configuration-metadata.json";
pub const DATAFLOW_METADATA: &str = "META-INF/dataflow-configuration-metadata.properties";
/// Name older Data Flow releases read.
pub const DATAFLOW_METADATA_WHITELIST: &str = "META-INF/dataflow-configuration-metadata-whitelist.properties";

pub const LABEL_BOOT_CONFIGURATION_METADATA: &str = "org.springframework.boot.spring-configuration-metadata.json";
pub const LABEL_DATAFLOW_CONFIGURATION_METADATA: &str =
  "org.springframework.cloud.dataflow.spring-configuration-metadata.json";

const DATAFLOW_CLASSES: &str = "configuration-properties.classes";
const DATAFLOW_NAMES: &str = "configuration-properties.names";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unable to decode {path}: {source}")]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("unable to encode configuration metadata: {0}")]
  Encode(#[source] serde_json::Error),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
  pub name: String,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub replacement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
  pub name: String,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deprecation: Option<Deprecation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueHint {
  pub value: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueProvider {
  pub name: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub parameters: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hint {
  pub name: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub values: Vec<ValueHint>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub providers: Vec<ValueProvider>,
}

/// Contents of a `spring-configuration-metadata.json` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMetadata {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub groups: Vec<Group>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub properties: Vec<Property>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub hints: Vec<Hint>,
}

impl ConfigurationMetadata {
  /// Read `META-INF/spring-configuration-metadata.json` under `dir`.
  ///
  /// A missing file is empty metadata.
  pub fn from_dir(dir: &Path) -> Result<Self, MetadataError> {
    let path = dir.join(CONFIGURATION_METADATA);
    match fs::read(&path) {
      Ok(bytes) => decode(&bytes, &path),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(MetadataError::Io { path, source }),
    }
  }

  /// Read the metadata packaged in `jar`; a jar without it is empty metadata.
  pub fn from_jar(jar: &Path) -> Result<Self, MetadataError> {
    match archive::read_entry(jar, CONFIGURATION_METADATA)? {
      Some(bytes) => decode(&bytes, &jar.join(CONFIGURATION_METADATA)),
      None => Ok(Self::default()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty() && self.properties.is_empty() && self.hints.is_empty()
  }

  pub fn extend(&mut self, other: ConfigurationMetadata) {
    self.groups.extend(other.groups);
    self.properties.extend(other.properties);
    self.hints.extend(other.hints);
  }

  /// The groups and properties whose name or source type is in `selectors`,
  /// plus the hints of the selected properties.
  pub fn select(&self, selectors: &[String]) -> Self {
    let selected = |name: &str, source_type: Option<&str>| {
      selectors
        .iter()
        .any(|s| s == name || source_type.is_some_and(|t| t == s))
    };

    let groups: Vec<Group> = self
      .groups
      .iter()
      .filter(|g| selected(&g.name, g.source_type.as_deref()))
      .cloned()
      .collect();
    let properties: Vec<Property> = self
      .properties
      .iter()
      .filter(|p| selected(&p.name, p.source_type.as_deref()))
      .cloned()
      .collect();
    let hints = self
      .hints
      .iter()
      .filter(|h| properties.iter().any(|p| p.name == h.name))
      .cloned()
      .collect();

    Self {
      groups,
      properties,
      hints,
    }
  }
}

fn decode(bytes: &[u8], path: &Path) -> Result<ConfigurationMetadata, MetadataError> {
  serde_json::from_slice(bytes).map_err(|source| MetadataError::Decode {
    path: path.to_path_buf(),
    source,
  })
}

/// Contents of the Data Flow metadata file under `app_root`, preferring the
/// current name over the whitelist one. `None` when neither exists.
fn read_dataflow_properties(app_root: &Path) -> Result<Option<String>, MetadataError> {
  for name in [DATAFLOW_METADATA, DATAFLOW_METADATA_WHITELIST] {
    let path = app_root.join(name);
    match fs::read_to_string(&path) {
      Ok(content) => return Ok(Some(content)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
      Err(source) => return Err(MetadataError::Io { path, source }),
    }
  }
  Ok(None)
}

/// Parse `key=value` and `key: value` lines of a properties file.
///
/// Comment lines start with `#` or `!`; a trailing `\` continues the value on
/// the next line.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
  let mut properties = BTreeMap::new();
  let mut logical = String::new();

  for line in content.lines() {
    let line = line.trim_start();
    if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
      continue;
    }

    match line.strip_suffix('\\') {
      Some(continued) => {
        logical.push_str(continued);
        continue;
      }
      None => logical.push_str(line),
    }

    if let Some(idx) = logical.find(['=', ':']) {
      let key = logical[..idx].trim().to_string();
      let value = logical[idx + 1..].trim().to_string();
      properties.insert(key, value);
    } else {
      properties.insert(logical.trim().to_string(), String::new());
    }
    logical.clear();
  }

  properties
}

fn split_list(value: Option<&String>) -> impl Iterator<Item = String> + '_ {
  value
    .into_iter()
    .flat_map(|v| v.split(','))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// Configuration metadata labels for the application in `app_root`.
///
/// Empty unless the application ships a Data Flow metadata file. The boot
/// label carries the metadata of the application and every library jar; the
/// Data Flow label carries what the Data Flow file selects from it.
pub fn labels(app_root: &Path, manifest: &AppManifest) -> Result<BTreeMap<String, String>, MetadataError> {
  let mut labels = BTreeMap::new();
  let Some(dataflow) = read_dataflow_properties(app_root)? else {
    debug!("no Data Flow configuration metadata, skipping metadata labels");
    return Ok(labels);
  };

  let mut metadata = ConfigurationMetadata::from_dir(app_root)?;
  let lib_dir = app_root.join(manifest.require_lib()?.trim_end_matches('/'));
  for jar in archive::list_jars(&lib_dir)? {
    metadata.extend(ConfigurationMetadata::from_jar(&jar)?);
  }
  if !metadata.is_empty() {
    let encoded = serde_json::to_string(&metadata).map_err(MetadataError::Encode)?;
    labels.insert(LABEL_BOOT_CONFIGURATION_METADATA.to_string(), encoded);
  }

  let properties = parse_properties(&dataflow);
  let selectors: Vec<String> = split_list(properties.get(DATAFLOW_CLASSES))
    .chain(split_list(properties.get(DATAFLOW_NAMES)))
    .collect();
  let selected = metadata.select(&selectors);
  if !selected.is_empty() {
    let encoded = serde_json::to_string(&selected).map_err(MetadataError::Encode)?;
    labels.insert(LABEL_DATAFLOW_CONFIGURATION_METADATA.to_string(), encoded);
  }

  info!(
    properties = metadata.properties.len(),
    selected = selected.properties.len(),
    "contributed configuration metadata labels"
  );
  Ok(labels)
}
