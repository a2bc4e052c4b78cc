//! Packaging format variants.
//!
//! Spring Boot changed the layout of its executable archives twice in ways that
//! matter here: 3.2 moved the loader to a new package, and 3.3 added the
//! `tools` jar mode that can extract an archive into a CDS-friendly layout.
//! The version is inspected once, here; the pipeline branches on the variant.

use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::consts::{DEPENDENCIES_DIR, EXTRACTED_LIB_DIR};

/// Archive layout generation, resolved from `Spring-Boot-Version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackagingFormat {
  /// Before 3.2, or a version that could not be read.
  Legacy,
  /// 3.2.x: new loader, no tools jar mode.
  Boot32,
  /// 3.3 and later.
  Boot33Plus,
}

impl PackagingFormat {
  /// Resolve the format from a `Spring-Boot-Version` attribute.
  pub fn from_version(version: Option<&str>) -> Self {
    let Some(version) = version.and_then(parse_boot_version) else {
      return PackagingFormat::Legacy;
    };

    match (version.major, version.minor) {
      (major, _) if major > 3 => PackagingFormat::Boot33Plus,
      (3, minor) if minor >= 3 => PackagingFormat::Boot33Plus,
      (3, 2) => PackagingFormat::Boot32,
      _ => PackagingFormat::Legacy,
    }
  }

  /// Whether `java -Djarmode=tools -jar <archive> extract` is available.
  pub fn supports_tools_extract(self) -> bool {
    matches!(self, PackagingFormat::Boot33Plus)
  }

  /// Whether the application must be zipped back into an archive before
  /// extraction. The tools jar mode only reads archives, and the build sees
  /// the application already exploded.
  pub fn requires_rezip(self, app: &Path) -> bool {
    self.supports_tools_extract() && app.is_dir()
  }

  /// Directory, relative to the CDS layout root, that holds the libraries.
  pub fn library_dir(self) -> &'static str {
    if self.supports_tools_extract() {
      EXTRACTED_LIB_DIR
    } else {
      DEPENDENCIES_DIR
    }
  }
}

impl std::fmt::Display for PackagingFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      PackagingFormat::Legacy => "pre-3.2",
      PackagingFormat::Boot32 => "3.2",
      PackagingFormat::Boot33Plus => "3.3+",
    };
    write!(f, "{}", name)
  }
}

/// Parse a Spring Boot version leniently.
///
/// Accepts `3.2`, `3.3.0-M1`, `2.7.18`, and the legacy `2.4.0.RELEASE` form.
pub fn parse_boot_version(raw: &str) -> Option<Version> {
  let raw = raw.trim();
  if let Ok(version) = Version::parse(raw) {
    return Some(version);
  }

  let (core, pre) = split_qualifier(raw).unwrap_or((raw, None));

  let mut parts: Vec<&str> = core.split('.').collect();
  if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
    return None;
  }
  while parts.len() < 3 {
    parts.push("0");
  }

  let normalized = match pre {
    Some(pre) => format!("{}-{}", parts.join("."), pre),
    None => parts.join("."),
  };
  Version::parse(&normalized).ok()
}

/// Split `3.3.0-M1` or `2.4.0.RELEASE` into numeric core and qualifier.
fn split_qualifier(raw: &str) -> Option<(&str, Option<&str>)> {
  if let Some((core, pre)) = raw.split_once('-') {
    return Some((core, Some(pre)));
  }

  let idx = raw
    .char_indices()
    .find(|&(i, c)| c == '.' && raw[i + 1..].starts_with(|n: char| n.is_ascii_alphabetic()))
    .map(|(i, _)| i)?;
  let qualifier = &raw[idx + 1..];
  let qualifier = if qualifier.eq_ignore_ascii_case("RELEASE") {
    None
  } else {
    Some(qualifier)
  };
  Some((&raw[..idx], qualifier))
}
