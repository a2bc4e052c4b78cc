//! Runner manifest synthesis.
//!
//! The runner jar used for a CDS training run carries nothing but a manifest
//! naming the start class and the full classpath. The JVM's jar tooling is
//! strict about this file: lines must end in `\r\n`, and no physical line may
//! exceed 72 bytes.

use std::fs;
use std::path::Path;

use crate::consts::MANIFEST_MAX_LINE;

/// Wrap a single manifest attribute line.
///
/// Physical lines are measured in bytes. A line is broken with `\r\n` as soon
/// as it holds `max` bytes, and a continuation line starts with one space. A
/// multi-byte character that would straddle the limit moves whole to the next
/// line, so no character is ever split and no line exceeds `max`.
///
/// If the input ends exactly on a break, the result ends with a lone space
/// continuation, which the jar tooling accepts as an empty continuation.
pub fn wrap_line(line: &str, max: usize) -> String {
  let mut result = String::with_capacity(line.len() + line.len() / max.max(1) * 3);
  let mut current = 0usize;

  for ch in line.chars() {
    let len = ch.len_utf8();
    if current > 0 && current + len > max {
      result.push_str("\r\n ");
      current = 1;
    }
    result.push(ch);
    current += len;
    if current >= max {
      result.push_str("\r\n ");
      current = 1;
    }
  }

  result
}

/// Render the runner manifest text.
///
/// `classpath` is written in order, space-separated; callers put the
/// application jar first.
pub fn render_runner_manifest(start_class: &str, classpath: &[String]) -> String {
  let main_class = wrap_line(&format!("Main-Class: {}", start_class), MANIFEST_MAX_LINE);
  let class_path = wrap_line(&format!("Class-Path: {}", classpath.join(" ")), MANIFEST_MAX_LINE);
  format!("Manifest-Version: 1.0\r\n{}\r\n{}\r\n\r\n", main_class, class_path)
}

/// Write the runner manifest to `path`, creating parent directories.
pub fn write_runner_manifest(path: &Path, start_class: &str, classpath: &[String]) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, render_runner_manifest(start_class, classpath))
}
