//! Implementation of the `bootpack build` command.
//!
//! This command plans a build for an application directory, contributes its
//! layers (running the CDS training run when enabled) and prints what was
//! produced.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use tracing::info;

use bootpack_lib::build::{BuildOptions, BuildResult, build};
use bootpack_lib::execute::CommandExecutor;
use bootpack_lib::layer::ContributionStatus;

use crate::output::{
  OutputFormat, format_duration, print_info, print_json, print_stat, print_success, print_warning, symbols,
};

/// Execute the build command.
pub fn cmd_build(
  app: &Path,
  layers: &Path,
  cloud_bindings: Option<PathBuf>,
  native_image: bool,
  generations: Option<PathBuf>,
  output: OutputFormat,
) -> Result<()> {
  std::fs::create_dir_all(layers).with_context(|| format!("Failed to create layers directory: {}", layers.display()))?;
  let app_root = dunce::canonicalize(app).with_context(|| format!("Application directory not found: {}", app.display()))?;
  let layers_dir = dunce::canonicalize(layers).unwrap_or_else(|_| layers.to_path_buf());

  let mut options = BuildOptions::new(app_root, layers_dir).with_native_image(native_image);
  if let Some(artifact) = cloud_bindings {
    options = options.with_cloud_bindings(artifact);
  }
  if let Some(path) = generations {
    options = options.with_generations(path);
  }

  let start = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(build(&CommandExecutor, &options))
    .with_context(|| format!("Build failed for {}", app.display()))?;
  let elapsed = start.elapsed();
  info!(elapsed = ?elapsed, "build finished");

  let Some(result) = result else {
    if output.is_json() {
      print_json(&serde_json::Value::Null)?;
    } else {
      print_info(&format!("{} is not a Spring Boot application, nothing to do", app.display()));
    }
    return Ok(());
  };

  if output.is_json() {
    return print_json(&result);
  }

  print_result(&result);
  println!();
  print_success(&format!("Build complete in {}", format_duration(elapsed)));
  Ok(())
}

fn print_result(result: &BuildResult) {
  for warning in &result.warnings {
    print_warning(warning);
  }

  if !result.labels.is_empty() {
    println!("Labels:");
    for (key, value) in &result.labels {
      print_stat(key, value);
    }
  }

  println!("Layers:");
  for report in &result.layers {
    let (symbol, status) = match report.status {
      ContributionStatus::Contributed => (symbols::CONTRIBUTED, "contributed"),
      ContributionStatus::Reused => (symbols::REUSED, "reused"),
    };
    println!(
      "  {} {} {}",
      symbol.if_supports_color(Stream::Stdout, |s| s.green()),
      report.layer.name,
      format!("({})", status).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for (key, value) in report.layer.launch_env.iter().chain(&report.layer.build_env) {
      println!("      {}={}", key, value);
    }
  }

  if let Some(kind) = result.web_application_type {
    print_stat("Application type", &kind.to_string());
  }
  if let Some(version) = &result.cloud_bindings_version {
    print_stat("Spring Cloud Bindings", version);
  }
  if !result.helpers.is_empty() {
    print_stat("Helpers", &result.helpers.join(", "));
  }
  print_stat("Dependencies", &result.dependencies.len().to_string());
  for slice in &result.slices {
    print_stat(&format!("Slice {}", slice.name), &format!("{} path(s)", slice.paths.len()));
  }

  if !result.native_image_arguments.is_empty() {
    print_stat("Native image", &result.native_image_arguments.join(" "));
  }

  if !result.processes.is_empty() {
    println!("Processes:");
    for process in &result.processes {
      let marker = if process.default { " (default)" } else { "" };
      println!(
        "  {}{} {} {} {}",
        process.kind,
        marker,
        symbols::ARROW,
        process.command,
        process.args.join(" ")
      );
    }
  }
}
