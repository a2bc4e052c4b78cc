//! JVM discovery.

use std::env;
use std::path::PathBuf;

use regex::Regex;
use tracing::debug;

pub const JRE_HOME: &str = "JRE_HOME";
pub const JAVA_HOME: &str = "JAVA_HOME";

/// Resolve the `java` executable.
///
/// `$JRE_HOME/bin/java` wins over `$JAVA_HOME/bin/java`; with neither set the
/// bare `java` is looked up on `PATH` when executed. Empty values count as
/// unset.
pub fn java_command() -> PathBuf {
  for var in [JRE_HOME, JAVA_HOME] {
    if let Some(home) = env::var_os(var).filter(|v| !v.is_empty()) {
      let java = PathBuf::from(home).join("bin").join("java");
      debug!(var, java = %java.display(), "resolved java command");
      return java;
    }
  }
  PathBuf::from("java")
}

/// Parse the major Java version out of `java -version` output.
///
/// Handles both `1.8.0_392` (major 8) and `21.0.2` (major 21) styles.
pub fn java_version(output: &str) -> Option<u32> {
  let captures = Regex::new(r#"(?i)\bversion\s+"([^"]+)""#).ok()?.captures(output)?;
  let raw = captures.get(1)?.as_str();
  let raw = raw.strip_prefix("1.").unwrap_or(raw);
  raw
    .split(['.', '-', '_', '+'])
    .next()
    .and_then(|major| major.parse().ok())
}
