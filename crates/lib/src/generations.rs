//! Support generation checks.
//!
//! A `spring-generations.toml` file lists, per project, the version lines
//! (`3.2.x`) and the dates their open source and commercial updates end. A
//! build on an application whose line is past either date is not refused,
//! only warned about.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use semver::VersionReq;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::format::parse_boot_version;

pub const SPRING_BOOT_SLUG: &str = "spring-boot";

const DATE_FORMAT: &str = "%Y-%m-%d";

static NUMERIC_VERSION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+(?:\.\d+)?)?").ok());

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unable to decode generations: {0}")]
  Decode(#[from] toml::de::Error),

  #[error("unable to parse {value} to a version constraint: {source}")]
  Constraint {
    value: String,
    #[source]
    source: semver::Error,
  },

  #[error("unable to parse {value} to a date: {source}")]
  Date {
    value: String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("unable to parse {0} to a version")]
  Version(String),
}

#[derive(Debug, Deserialize)]
struct RawGeneration {
  name: String,
  #[serde(default)]
  oss: String,
  #[serde(default)]
  commercial: String,
}

#[derive(Debug, Deserialize)]
struct RawProject {
  name: String,
  slug: String,
  #[serde(default)]
  generations: Vec<RawGeneration>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProjects {
  #[serde(default)]
  projects: Vec<RawProject>,
}

/// One version line of a project. A `None` date never passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
  pub name: String,
  pub constraint: VersionReq,
  pub oss: Option<NaiveDate>,
  pub commercial: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
  pub name: String,
  pub slug: String,
  pub generations: Vec<Generation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationValidator {
  pub projects: Vec<Project>,
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>, GenerationError> {
  if value.is_empty() {
    return Ok(None);
  }
  NaiveDate::parse_from_str(value, DATE_FORMAT)
    .map(Some)
    .map_err(|source| GenerationError::Date {
      value: value.to_string(),
      source,
    })
}

impl GenerationValidator {
  /// Load generations from `path`. A missing file validates nothing.
  pub fn load(path: &Path) -> Result<Self, GenerationError> {
    match fs::read_to_string(path) {
      Ok(content) => Self::parse(&content),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no generations file");
        Ok(Self::default())
      }
      Err(source) => Err(GenerationError::Io {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  pub fn parse(content: &str) -> Result<Self, GenerationError> {
    let raw: RawProjects = toml::from_str(content)?;

    let mut projects = Vec::with_capacity(raw.projects.len());
    for project in raw.projects {
      let mut generations = Vec::with_capacity(project.generations.len());
      for generation in project.generations {
        let constraint = VersionReq::parse(&generation.name).map_err(|source| GenerationError::Constraint {
          value: generation.name.clone(),
          source,
        })?;
        generations.push(Generation {
          constraint,
          oss: parse_date(&generation.oss)?,
          commercial: parse_date(&generation.commercial)?,
          name: generation.name,
        });
      }
      projects.push(Project {
        name: project.name,
        slug: project.slug,
        generations,
      });
    }

    Ok(Self { projects })
  }

  /// Check `version` of the project `slug` against today's date.
  pub fn validate(&self, slug: &str, version: &str) -> Result<Option<String>, GenerationError> {
    self.validate_on(slug, version, Utc::now().date_naive())
  }

  /// Check `version` of the project `slug` as of `today`.
  ///
  /// Returns the warning for a generation whose updates ended, after logging
  /// it. Unknown projects and versions outside every generation pass.
  pub fn validate_on(&self, slug: &str, version: &str, today: NaiveDate) -> Result<Option<String>, GenerationError> {
    let Some(project) = self.projects.iter().find(|p| p.slug == slug) else {
      return Ok(None);
    };

    let parsed = NUMERIC_VERSION
      .as_ref()
      .and_then(|re| re.find(version))
      .and_then(|m| parse_boot_version(m.as_str()))
      .ok_or_else(|| GenerationError::Version(version.to_string()))?;

    let Some(generation) = project.generations.iter().find(|g| g.constraint.matches(&parsed)) else {
      return Ok(None);
    };

    let ended = |date: Option<NaiveDate>| date.filter(|d| today > *d);
    let message = if let Some(date) = ended(generation.commercial) {
      format!(
        "This application uses {} {}. Commercial updates for {} ended on {}.",
        project.name,
        version,
        generation.name,
        date.format(DATE_FORMAT)
      )
    } else if let Some(date) = ended(generation.oss) {
      format!(
        "This application uses {} {}. Open Source updates for {} ended on {}.",
        project.name,
        version,
        generation.name,
        date.format(DATE_FORMAT)
      )
    } else {
      return Ok(None);
    };

    warn!("{}", message);
    Ok(Some(message))
  }
}
