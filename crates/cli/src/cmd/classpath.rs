//! Implementation of the `bootpack classpath` command.

use std::path::Path;

use anyhow::{Context, Result};

use bootpack_lib::classpath;
use bootpack_lib::manifest::AppManifest;

use crate::output::{OutputFormat, print_json};

/// Print the classpath entries of the exploded application at `app`, one per
/// line, relative to the application root.
pub fn cmd_classpath(app: &Path, output: OutputFormat) -> Result<()> {
  let manifest = AppManifest::read(app).with_context(|| format!("Failed to read manifest in {}", app.display()))?;
  let entries = classpath::resolve(app, &manifest).context("Failed to resolve classpath")?;

  if output.is_json() {
    return print_json(&entries);
  }
  for entry in entries {
    println!("{}", entry);
  }
  Ok(())
}
