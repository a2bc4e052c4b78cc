//! Test utilities for bootpack-lib.
//!
//! Cross-platform process helpers, a recording [`Executor`], and builders for
//! exploded Spring Boot application fixtures.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::execute::{ExecOutput, ExecuteError, Execution, Executor};

/// Returns the shell command and args to echo an environment variable.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), format!("echo \"${}\"", var)])
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo %{}%", var)])
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Cross-platform symlink creation helper.
pub fn create_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
  #[cfg(unix)]
  {
    std::os::unix::fs::symlink(target, link)
  }
  #[cfg(windows)]
  {
    if target.is_dir() {
      std::os::windows::fs::symlink_dir(target, link)
    } else {
      std::os::windows::fs::symlink_file(target, link)
    }
  }
}

/// Write a deflated jar containing the given `(name, content)` entries.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
  for (name, content) in entries {
    writer.start_file(*name, options).unwrap();
    writer.write_all(content).unwrap();
  }
  writer.finish().unwrap();
}

/// Write a file relative to `root`, creating parents.
pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// Manifest of an exploded Boot application with the given version.
pub fn boot_manifest_text(version: &str) -> String {
  format!(
    "Manifest-Version: 1.0\r\n\
     Main-Class: org.springframework.boot.loader.launch.JarLauncher\r\n\
     Start-Class: demo.Application\r\n\
     Spring-Boot-Version: {}\r\n\
     Spring-Boot-Classes: BOOT-INF/classes/\r\n\
     Spring-Boot-Lib: BOOT-INF/lib/\r\n\
     Spring-Boot-Classpath-Index: BOOT-INF/classpath.idx\r\n\
     Implementation-Title: demo\r\n\
     Implementation-Version: 0.0.1\r\n\
     \r\n",
    version
  )
}

/// Lay out an exploded Boot application under `root`.
///
/// Two libraries `a.jar` and `b.jar` are listed in the classpath index by
/// bare name, and one application class is present.
pub fn exploded_boot_app(root: &Path, version: &str) {
  write_file(root, "META-INF/MANIFEST.MF", boot_manifest_text(version));
  write_file(root, "BOOT-INF/classes/demo/Application.class", b"\xca\xfe\xba\xbe");
  write_file(root, "BOOT-INF/classes/application.properties", "server.port=8080\n");
  write_file(root, "BOOT-INF/classpath.idx", "- \"a.jar\"\n- \"b.jar\"\n");
  write_jar(&root.join("BOOT-INF/lib/a.jar"), &[("a/A.class", b"a")]);
  write_jar(&root.join("BOOT-INF/lib/b.jar"), &[("b/B.class", b"b")]);
}

type Hook = Box<dyn Fn(&Execution) -> Result<(), ExecuteError> + Send + Sync>;

/// An [`Executor`] that records executions instead of spawning processes.
///
/// An optional hook runs for every execution; it can create files the real
/// process would have produced, or return an error to simulate a failure.
#[derive(Default)]
pub struct RecordingExecutor {
  calls: Mutex<Vec<Execution>>,
  hook: Option<Hook>,
}

impl RecordingExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_hook(hook: impl Fn(&Execution) -> Result<(), ExecuteError> + Send + Sync + 'static) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      hook: Some(Box::new(hook)),
    }
  }

  /// Simulate a JVM that always succeeds.
  ///
  /// A tools extraction copies the archive into the destination as
  /// `runner.jar`; a training run writes `application.jsa` into its working
  /// directory.
  pub fn simulating_jvm() -> Self {
    Self::with_hook(|execution| {
      let args = &execution.args;
      if args.iter().any(|a| a == "-Djarmode=tools") {
        let jar = args.iter().skip_while(|a| *a != "-jar").nth(1).unwrap();
        let dest = args.iter().skip_while(|a| *a != "--destination").nth(1).unwrap();
        fs::create_dir_all(Path::new(dest).join("lib")).unwrap();
        fs::copy(jar, Path::new(dest).join("runner.jar")).unwrap();
      }
      if args.iter().any(|a| a.starts_with("-XX:ArchiveClassesAtExit=")) {
        fs::write(execution.dir.join("application.jsa"), b"jsa").unwrap();
      }
      Ok(())
    })
  }

  /// Simulate a process that fails when any argument contains `needle`.
  pub fn failing_on(needle: &'static str) -> Self {
    Self::with_hook(move |execution| {
      if execution.args.iter().any(|a| a.contains(needle)) {
        return Err(ExecuteError::CmdFailed {
          cmd: execution.display(),
          dir: execution.dir.clone(),
          code: Some(1),
          stderr: "simulated failure".to_string(),
        });
      }
      Ok(())
    })
  }

  pub fn calls(&self) -> Vec<Execution> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }
}

impl Executor for RecordingExecutor {
  async fn execute(&self, execution: Execution) -> Result<ExecOutput, ExecuteError> {
    self.calls.lock().unwrap().push(execution.clone());
    if let Some(hook) = &self.hook {
      hook(&execution)?;
    }
    Ok(ExecOutput::default())
  }
}
