//! Launch-time helpers.
//!
//! Helpers run when the container starts and extend `JAVA_TOOL_OPTIONS` from
//! the launch defaults the build recorded. Each helper gets the current value
//! and returns the new one, or `None` when it has nothing to add.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{
  self, BPL_JVM_AOTCACHE_ENABLED, BPL_JVM_CDS_ENABLED, BPL_SPRING_AOT_ENABLED, BPL_SPRING_CLOUD_BINDINGS_ENABLED,
  ConfigError,
};
use crate::consts::{AOT_CACHE, SHARED_ARCHIVE};

pub const PERFORMANCE_HELPER: &str = "performance";
pub const CLOUD_BINDINGS_HELPER: &str = "spring-cloud-bindings";

/// A launch-time `JAVA_TOOL_OPTIONS` contributor.
pub trait Helper {
  fn name(&self) -> &'static str;

  /// Compute the new `JAVA_TOOL_OPTIONS`, given the current value.
  fn execute(&self, java_tool_options: Option<&str>) -> Result<Option<String>, ConfigError>;
}

/// Append `values` to `existing`, space-separated.
pub fn append_options(existing: Option<&str>, values: &[String]) -> String {
  existing
    .filter(|v| !v.is_empty())
    .into_iter()
    .map(str::to_string)
    .chain(values.iter().cloned())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Adds Spring AOT and shared-archive flags.
#[derive(Debug, Clone)]
pub struct PerformanceHelper {
  /// Directory the application launches from.
  pub dir: PathBuf,
}

impl Helper for PerformanceHelper {
  fn name(&self) -> &'static str {
    PERFORMANCE_HELPER
  }

  fn execute(&self, java_tool_options: Option<&str>) -> Result<Option<String>, ConfigError> {
    let aot = config::resolve_bool(BPL_SPRING_AOT_ENABLED)?;
    let cache = config::resolve_bool(BPL_JVM_CDS_ENABLED)? || config::resolve_bool(BPL_JVM_AOTCACHE_ENABLED)?;
    if !aot && !cache {
      return Ok(None);
    }

    let mut values = Vec::new();
    if aot {
      info!("Spring AOT enabled, contributing -Dspring.aot.enabled=true to JAVA_TOOL_OPTIONS");
      values.push("-Dspring.aot.enabled=true".to_string());
    }

    if cache {
      if self.dir.join(SHARED_ARCHIVE).is_file() {
        info!("Spring CDS enabled, contributing -XX:SharedArchiveFile to JAVA_TOOL_OPTIONS");
        values.push(format!("-XX:SharedArchiveFile={}", SHARED_ARCHIVE));
      } else if self.dir.join(AOT_CACHE).is_file() {
        info!("AOT cache enabled, contributing -XX:AOTCache to JAVA_TOOL_OPTIONS");
        values.push(format!("-XX:AOTCache={}", AOT_CACHE));
      } else {
        warn!(
          dir = %self.dir.display(),
          "neither application.jsa nor application.aot found, CDS optimization disabled"
        );
      }
    }

    Ok(Some(append_options(java_tool_options, &values)))
  }
}

/// Enables Spring Cloud Bindings unless switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudBindingsHelper;

impl Helper for CloudBindingsHelper {
  fn name(&self) -> &'static str {
    CLOUD_BINDINGS_HELPER
  }

  fn execute(&self, java_tool_options: Option<&str>) -> Result<Option<String>, ConfigError> {
    if !config::resolve_bool_or(BPL_SPRING_CLOUD_BINDINGS_ENABLED, true)? {
      return Ok(None);
    }

    info!("Spring Cloud Bindings enabled");
    Ok(Some(append_options(
      java_tool_options,
      &["-Dorg.springframework.cloud.bindings.boot.enable=true".to_string()],
    )))
  }
}

/// Run `helpers` in order, threading `JAVA_TOOL_OPTIONS` through them.
///
/// Returns `None` when no helper contributed.
pub fn run_helpers(helpers: &[&dyn Helper], java_tool_options: Option<String>) -> Result<Option<String>, ConfigError> {
  let mut current = java_tool_options;
  let mut contributed = false;

  for helper in helpers {
    if let Some(updated) = helper.execute(current.as_deref())? {
      tracing::debug!(helper = helper.name(), "helper contributed");
      current = Some(updated);
      contributed = true;
    }
  }

  Ok(if contributed { current } else { None })
}
