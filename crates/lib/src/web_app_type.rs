//! Web application type detection.
//!
//! Classifies the application as reactive, servlet or non-web from the
//! classes it ships, the same way Spring Boot itself decides at startup, and
//! records a matching thread-count launch default.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::archive::{self, ArchiveError};
use crate::config::BPL_JVM_THREAD_COUNT;
use crate::consts::WEB_APPLICATION_TYPE_LAYER;
use crate::layer::{ContributionStatus, Layer, LayerContributor, LayerError, LayerTypes};
use crate::util::hash::{DirHashError, FileEntry, Fingerprint, list_files, relative_slash_path};

const WEBMVC_INDICATOR: &str = "org.springframework.web.servlet.DispatcherServlet";
const WEBFLUX_INDICATOR: &str = "org.springframework.web.reactive.DispatcherHandler";
const JERSEY_INDICATOR: &str = "org.glassfish.jersey.servlet.ServletContainer";
const SERVLET_INDICATORS: [&str; 2] = ["javax.servlet.Servlet", "jakarta.servlet.Servlet"];
const WEB_CONTEXT_INDICATOR: &str = "org.springframework.web.context.ConfigurableWebApplicationContext";

#[derive(Debug, thiserror::Error)]
pub enum WebApplicationTypeError {
  #[error("unable to list classes: {0}")]
  Archive(#[from] ArchiveError),

  #[error("unable to find class names in {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("unable to create file listing: {0}")]
  Listing(#[from] DirHashError),

  #[error(transparent)]
  Layer(#[from] LayerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebApplicationType {
  None,
  Reactive,
  Servlet,
}

impl WebApplicationType {
  /// Default `BPL_JVM_THREAD_COUNT` for this kind of application.
  pub fn thread_count(self) -> u32 {
    match self {
      WebApplicationType::Servlet => 250,
      WebApplicationType::None | WebApplicationType::Reactive => 50,
    }
  }
}

impl fmt::Display for WebApplicationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      WebApplicationType::None => "non-web",
      WebApplicationType::Reactive => "reactive web",
      WebApplicationType::Servlet => "servlet web",
    };
    write!(f, "{}", name)
  }
}

/// Fully qualified names of every class in an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndex {
  classes: BTreeSet<String>,
}

impl ClassIndex {
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      classes: names.into_iter().map(Into::into).collect(),
    }
  }

  /// Collect class names from `classes_dir` and every jar directly in `lib_dir`.
  ///
  /// Jars are listed in parallel. A missing directory contributes nothing.
  pub fn scan(classes_dir: &Path, lib_dir: &Path) -> Result<Self, WebApplicationTypeError> {
    let mut classes = BTreeSet::new();

    if classes_dir.exists() {
      for entry in WalkDir::new(classes_dir) {
        let entry = entry.map_err(|source| WebApplicationTypeError::Walk {
          path: classes_dir.to_path_buf(),
          source,
        })?;
        if entry.file_type().is_file() {
          if let Some(class) = class_name(&relative_slash_path(classes_dir, entry.path())) {
            classes.insert(class);
          }
        }
      }
    }

    let jars = archive::list_jars(lib_dir)?;
    let listed: Vec<Vec<String>> = jars
      .par_iter()
      .map(|jar| archive::entry_names(jar).map(|names| names.iter().filter_map(|n| class_name(n)).collect()))
      .collect::<Result<_, ArchiveError>>()?;
    for names in listed {
      classes.extend(names);
    }

    debug!(count = classes.len(), jars = jars.len(), "indexed application classes");
    Ok(Self { classes })
  }

  pub fn contains(&self, class: &str) -> bool {
    self.classes.contains(class)
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }

  /// Classify the application.
  pub fn resolve(&self) -> WebApplicationType {
    if self.contains(WEBFLUX_INDICATOR) && !self.contains(WEBMVC_INDICATOR) && !self.contains(JERSEY_INDICATOR) {
      return WebApplicationType::Reactive;
    }

    let servlet = SERVLET_INDICATORS.iter().any(|c| self.contains(c));
    if servlet && self.contains(WEB_CONTEXT_INDICATOR) {
      WebApplicationType::Servlet
    } else {
      WebApplicationType::None
    }
  }
}

/// `a/b/C.class` to `a.b.C`; anything that is not a class file is `None`.
fn class_name(entry: &str) -> Option<String> {
  let stem = entry.strip_suffix(".class")?;
  if stem.is_empty() || stem.ends_with('/') {
    return None;
  }
  Some(stem.replace('/', "."))
}

#[derive(Debug, Clone, Serialize)]
struct WebApplicationTypeMetadata {
  files: Vec<FileEntry>,
}

impl Fingerprint for WebApplicationTypeMetadata {}

/// Contribute the `web-application-type` launch layer for the application at
/// `app_root`.
pub async fn contribute(
  app_root: &Path,
  layers_dir: &Path,
  index: &ClassIndex,
) -> Result<(Layer, ContributionStatus), WebApplicationTypeError> {
  let metadata = WebApplicationTypeMetadata {
    files: list_files(app_root, &[])?,
  };
  let contributor = LayerContributor::new(WEB_APPLICATION_TYPE_LAYER, metadata, LayerTypes::LAUNCH);

  contributor
    .contribute(layers_dir, |mut layer| async move {
      let kind = index.resolve();
      info!(kind = %kind, "detected application type");
      layer.launch_default(BPL_JVM_THREAD_COUNT, kind.thread_count());
      Ok(layer)
    })
    .await
}
