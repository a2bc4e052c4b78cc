//! Implementation of the `bootpack helper` command.
//!
//! Runs the launch-time helpers against the current environment and prints
//! the resulting `JAVA_TOOL_OPTIONS`. Nothing is printed when no helper has
//! anything to add.

use std::path::Path;

use anyhow::{Context, Result};

use bootpack_lib::config::{self, JAVA_TOOL_OPTIONS};
use bootpack_lib::helper::{CloudBindingsHelper, Helper, PerformanceHelper, run_helpers};

pub fn cmd_helper(dir: &Path) -> Result<()> {
  let performance = PerformanceHelper { dir: dir.to_path_buf() };
  let helpers: [&dyn Helper; 2] = [&performance, &CloudBindingsHelper];

  let options = run_helpers(&helpers, config::resolve(JAVA_TOOL_OPTIONS)).context("Failed to run launch helpers")?;
  if let Some(options) = options {
    println!("{}", options);
  }
  Ok(())
}
