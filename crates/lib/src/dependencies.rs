//! Bill of materials for the application's libraries.

use std::path::Path;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::{self, ArchiveError};
use crate::util::hash::{DirHashError, hash_file};

static MAVEN_JAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(.*)-(\d.*)\.jar$").ok());

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Hash(#[from] DirHashError),
}

/// A library jar, identified by its Maven-style file name when possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub name: String,
  pub version: Option<String>,
  pub sha256: String,
}

/// Split `spring-core-6.1.2.jar` into `("spring-core", Some("6.1.2"))`.
///
/// A file name without a version keeps its stem.
pub fn parse_jar_name(file_name: &str) -> (String, Option<String>) {
  if let Some(captures) = MAVEN_JAR.as_ref().and_then(|re| re.captures(file_name)) {
    return (captures[1].to_string(), Some(captures[2].to_string()));
  }
  let stem = file_name.strip_suffix(".jar").unwrap_or(file_name);
  (stem.to_string(), None)
}

/// Hash every jar directly under `lib_dir`, sorted by name.
pub fn list(lib_dir: &Path) -> Result<Vec<Dependency>, DependencyError> {
  let jars = archive::list_jars(lib_dir)?;

  let mut dependencies = jars
    .par_iter()
    .map(|jar| -> Result<Dependency, DependencyError> {
      let file_name = jar.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
      let (name, version) = parse_jar_name(&file_name);
      Ok(Dependency {
        name,
        version,
        sha256: hash_file(jar)?.0,
      })
    })
    .collect::<Result<Vec<_>, DependencyError>>()?;

  dependencies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
  debug!(lib = %lib_dir.display(), count = dependencies.len(), "listed dependencies");
  Ok(dependencies)
}

/// Whether a library named `name` is already present.
pub fn has_dependency(dependencies: &[Dependency], name: &str) -> bool {
  dependencies.iter().any(|d| d.name == name)
}
