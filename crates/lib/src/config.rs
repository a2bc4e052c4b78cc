//! Environment-driven configuration.
//!
//! All configuration comes from environment variables and is resolved once per
//! build into typed values. Empty variables count as unset.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{NATIVE_IMAGE_DIR, RUNNER_JAR};
use crate::format::PackagingFormat;

/// Enables the CDS training run at build time.
pub const BP_JVM_CDS_ENABLED: &str = "BP_JVM_CDS_ENABLED";
/// Enables Spring AOT at build time (requires AOT-processed classes).
pub const BP_SPRING_AOT_ENABLED: &str = "BP_SPRING_AOT_ENABLED";
/// `JAVA_TOOL_OPTIONS` for the training run only.
pub const CDS_TRAINING_JAVA_TOOL_OPTIONS: &str = "CDS_TRAINING_JAVA_TOOL_OPTIONS";
pub const JAVA_TOOL_OPTIONS: &str = "JAVA_TOOL_OPTIONS";

pub const BP_SPRING_CLOUD_BINDINGS_DISABLED: &str = "BP_SPRING_CLOUD_BINDINGS_DISABLED";
pub const BP_SPRING_CLOUD_BINDINGS_VERSION: &str = "BP_SPRING_CLOUD_BINDINGS_VERSION";
pub const BP_NATIVE_IMAGE_BUILD_ARGUMENTS: &str = "BP_NATIVE_IMAGE_BUILD_ARGUMENTS";
pub const BP_MAVEN_ACTIVE_PROFILES: &str = "BP_MAVEN_ACTIVE_PROFILES";

pub const BPL_SPRING_AOT_ENABLED: &str = "BPL_SPRING_AOT_ENABLED";
pub const BPL_JVM_CDS_ENABLED: &str = "BPL_JVM_CDS_ENABLED";
pub const BPL_JVM_AOTCACHE_ENABLED: &str = "BPL_JVM_AOTCACHE_ENABLED";
pub const BPL_SPRING_CLOUD_BINDINGS_ENABLED: &str = "BPL_SPRING_CLOUD_BINDINGS_ENABLED";
pub const BPL_JVM_THREAD_COUNT: &str = "BPL_JVM_THREAD_COUNT";

const AOT_PROPERTY: &str = "-Dspring.aot.enabled=";

/// Errors resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("invalid boolean value {value:?} for {name}")]
  InvalidBool { name: String, value: String },

  #[error(
    "CDS_TRAINING_JAVA_TOOL_OPTIONS sets -Dspring.aot.enabled={value} but Spring AOT resolved to {aot_enabled}; \
     remove the property from the override or change BP_SPRING_AOT_ENABLED"
  )]
  ConflictingAotOverride { value: String, aot_enabled: bool },

  #[error(
    "unable to determine the Spring Cloud Bindings version for Spring Boot {boot_version:?}; \
     set BP_SPRING_CLOUD_BINDINGS_VERSION to force a version or \
     BP_SPRING_CLOUD_BINDINGS_DISABLED to skip Spring Cloud Bindings"
  )]
  UnknownBindingsVersion { boot_version: Option<String> },
}

/// Read a variable, treating empty as unset.
pub fn resolve(name: &str) -> Option<String> {
  env::var(name).ok().filter(|v| !v.is_empty())
}

/// Parse a boolean flag value.
pub fn parse_bool(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" | "t" => Some(true),
    "false" | "0" | "no" | "off" | "f" => Some(false),
    _ => None,
  }
}

/// Read a boolean variable; unset means `default`.
pub fn resolve_bool_or(name: &str, default: bool) -> Result<bool, ConfigError> {
  match resolve(name) {
    None => Ok(default),
    Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
      name: name.to_string(),
      value,
    }),
  }
}

/// Read a boolean variable; unset means `false`.
pub fn resolve_bool(name: &str) -> Result<bool, ConfigError> {
  resolve_bool_or(name, false)
}

/// Everything the training-run orchestrator needs to decide what to do.
///
/// Resolved once per build and handed over by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRunConfig {
  pub aot_enabled: bool,
  pub training_run: bool,
  /// `-cp` argument of the training run, relative to the working directory.
  pub classpath: String,
  pub rezip: bool,
  /// `JAVA_TOOL_OPTIONS` for the training run; `None` leaves it unset.
  pub java_tool_options: Option<String>,
}

impl TrainingRunConfig {
  /// Resolve from the environment.
  ///
  /// AOT is only enabled when `BP_SPRING_AOT_ENABLED` is set and the
  /// application has AOT-processed output under `META-INF/native-image`.
  pub fn resolve(app_root: &Path, format: PackagingFormat, additional_libs: &[String]) -> Result<Self, ConfigError> {
    let training_run = resolve_bool(BP_JVM_CDS_ENABLED)?;

    let aot_requested = resolve_bool(BP_SPRING_AOT_ENABLED)?;
    let aot_enabled = aot_requested && app_root.join(NATIVE_IMAGE_DIR).is_dir();
    if aot_requested && !aot_enabled {
      warn!(
        dir = %app_root.join(NATIVE_IMAGE_DIR).display(),
        "{} is set but the application was not AOT processed; Spring AOT stays disabled",
        BP_SPRING_AOT_ENABLED
      );
    }

    let java_tool_options = match resolve(CDS_TRAINING_JAVA_TOOL_OPTIONS) {
      Some(value) => {
        if training_run {
          check_aot_override(&value, aot_enabled)?;
        }
        Some(value)
      }
      None => resolve(JAVA_TOOL_OPTIONS),
    };

    let config = Self {
      aot_enabled,
      training_run,
      classpath: training_classpath(format, additional_libs),
      rezip: format.requires_rezip(app_root),
      java_tool_options,
    };
    debug!(?config, "resolved training run configuration");
    Ok(config)
  }

  /// Whether the orchestrator has anything to do.
  pub fn is_requested(&self) -> bool {
    self.aot_enabled || self.training_run
  }
}

/// `runner.jar` followed by each additional library, under the directory the
/// format's CDS layout keeps its libraries in.
pub fn training_classpath(format: PackagingFormat, additional_libs: &[String]) -> String {
  let mut classpath = RUNNER_JAR.to_string();
  for lib in additional_libs {
    classpath.push(':');
    classpath.push_str(format.library_dir());
    classpath.push('/');
    classpath.push_str(lib);
  }
  classpath
}

/// Reject a training override whose `spring.aot.enabled` disagrees with AOT.
fn check_aot_override(options: &str, aot_enabled: bool) -> Result<(), ConfigError> {
  for token in options.split_whitespace() {
    let Some(value) = token.strip_prefix(AOT_PROPERTY) else {
      continue;
    };
    if parse_bool(value) != Some(aot_enabled) {
      return Err(ConfigError::ConflictingAotOverride {
        value: value.to_string(),
        aot_enabled,
      });
    }
  }
  Ok(())
}
