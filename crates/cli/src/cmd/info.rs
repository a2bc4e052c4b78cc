use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use bootpack_lib::execute::{CommandExecutor, Execution, Executor};
use bootpack_lib::format::PackagingFormat;
use bootpack_lib::jvm;
use bootpack_lib::manifest::AppManifest;

use crate::output::{OutputFormat, print_json, print_stat, print_warning};

#[derive(Debug, Serialize)]
struct Info {
  java: String,
  java_version: Option<u32>,
  spring_boot_version: Option<String>,
  format: Option<String>,
}

pub fn cmd_info(app: Option<&Path>, output: OutputFormat) -> Result<()> {
  let java = jvm::java_command();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let version = Execution::new(java.to_string_lossy()).with_args(["-version"]);
  let java_version = match rt.block_on(CommandExecutor.execute(version)) {
    // `java -version` writes to stderr
    Ok(out) => jvm::java_version(&out.stderr).or_else(|| jvm::java_version(&out.stdout)),
    Err(e) => {
      if !output.is_json() {
        print_warning(&format!("Unable to run {}: {}", java.display(), e));
      }
      None
    }
  };

  let mut info = Info {
    java: java.display().to_string(),
    java_version,
    spring_boot_version: None,
    format: None,
  };
  if let Some(app) = app {
    let manifest = AppManifest::read(app).with_context(|| format!("Failed to read manifest in {}", app.display()))?;
    info.format = Some(PackagingFormat::from_version(manifest.boot_version.as_deref()).to_string());
    info.spring_boot_version = manifest.boot_version;
  }

  if output.is_json() {
    return print_json(&info);
  }

  println!("Java:");
  print_stat("Command", &info.java);
  print_stat(
    "Version",
    &info.java_version.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
  );
  if let Some(format) = &info.format {
    println!("Application:");
    print_stat(
      "Spring Boot",
      info.spring_boot_version.as_deref().unwrap_or("not a Spring Boot application"),
    );
    print_stat("Format", format);
  }
  Ok(())
}
