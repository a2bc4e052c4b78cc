//! Implementation of the `bootpack manifest` command.
//!
//! Writes the runner manifest the manual CDS layout would produce for an
//! application, without touching the application itself.

use std::path::Path;

use anyhow::{Context, Result};

use bootpack_lib::classpath::{self, ClasspathLayout};
use bootpack_lib::consts::DEPENDENCIES_DIR;
use bootpack_lib::extract::application_jar_name;
use bootpack_lib::manifest::{AppManifest, write_runner_manifest};

use crate::output::print_success;

pub fn cmd_manifest(app: &Path, out: &Path) -> Result<()> {
  let manifest = AppManifest::read(app).with_context(|| format!("Failed to read manifest in {}", app.display()))?;
  let start_class = manifest.require_start_class()?;
  let layout = ClasspathLayout::from_manifest(&manifest)?;
  let entries = classpath::resolve(app, &manifest).context("Failed to resolve classpath")?;

  let mut runner_classpath = vec![application_jar_name(&manifest)];
  runner_classpath.extend(classpath::relocate(&entries, &layout.lib, DEPENDENCIES_DIR));

  write_runner_manifest(out, start_class, &runner_classpath)
    .with_context(|| format!("Failed to write manifest: {}", out.display()))?;

  print_success(&format!(
    "Wrote runner manifest for {} ({} classpath entries) to {}",
    start_class,
    runner_classpath.len(),
    out.display()
  ));
  Ok(())
}
