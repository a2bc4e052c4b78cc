//! Shared test helpers for CLI integration tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Variables the build and launch helpers read; cleared for every command so
/// the host environment cannot leak into a test.
const BOOTPACK_VARS: &[&str] = &[
  "BP_JVM_CDS_ENABLED",
  "BP_SPRING_AOT_ENABLED",
  "BP_SPRING_CLOUD_BINDINGS_DISABLED",
  "BP_SPRING_CLOUD_BINDINGS_VERSION",
  "BP_NATIVE_IMAGE_BUILD_ARGUMENTS",
  "BP_MAVEN_ACTIVE_PROFILES",
  "BPL_SPRING_AOT_ENABLED",
  "BPL_JVM_CDS_ENABLED",
  "BPL_JVM_AOTCACHE_ENABLED",
  "BPL_SPRING_CLOUD_BINDINGS_ENABLED",
  "CDS_TRAINING_JAVA_TOOL_OPTIONS",
  "JAVA_TOOL_OPTIONS",
  "JRE_HOME",
  "JAVA_HOME",
  "RUST_LOG",
];

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the application, the
/// layers and, when needed, a fake JDK.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// An environment holding an exploded Boot application of `version`.
  pub fn with_boot_app(version: &str) -> Self {
    let env = Self::new();
    env.exploded_boot_app(version);
    env
  }

  /// Application directory.
  pub fn app_path(&self) -> PathBuf {
    let p = self.temp.path().join("app");
    fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Layers directory.
  pub fn layers_path(&self) -> PathBuf {
    let p = self.temp.path().join("layers");
    fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a file relative to the application directory.
  pub fn write_file(&self, relative_path: &str, content: impl AsRef<[u8]>) {
    let path = self.app_path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  /// Write a jar relative to the temp directory.
  pub fn write_jar(&self, path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, content) in entries {
      writer.start_file(*name, SimpleFileOptions::default()).unwrap();
      writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
  }

  /// Lay out an exploded Boot application with two libraries.
  pub fn exploded_boot_app(&self, version: &str) {
    self.write_file(
      "META-INF/MANIFEST.MF",
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
      ),
    );
    self.write_file("BOOT-INF/classes/demo/Application.class", b"\xca\xfe\xba\xbe");
    self.write_file("BOOT-INF/classes/static/index.html", "<html></html>\n");
    self.write_file("BOOT-INF/classpath.idx", "- \"a-1.0.jar\"\n- \"b-2.1.jar\"\n");
    let lib = self.app_path().join("BOOT-INF/lib");
    self.write_jar(&lib.join("a-1.0.jar"), &[("a/A.class", b"a")]);
    self.write_jar(&lib.join("b-2.1.jar"), &[("b/B.class", b"b")]);
  }

  /// Install a fake JDK whose `java` writes the shared archive a training run
  /// asks for, and return its home directory.
  #[cfg(unix)]
  pub fn fake_java_home(&self) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let home = self.temp.path().join("jdk");
    let java = home.join("bin/java");
    fs::create_dir_all(java.parent().unwrap()).unwrap();
    fs::write(
      &java,
      "#!/bin/sh\n\
       for arg in \"$@\"; do\n\
       \x20 case \"$arg\" in\n\
       \x20   -XX:ArchiveClassesAtExit=*) : > \"${arg#-XX:ArchiveClassesAtExit=}\" ;;\n\
       \x20 esac\n\
       done\n\
       exit 0\n",
    )
    .unwrap();
    fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();
    home
  }

  /// Get a pre-configured Command for the bootpack binary.
  ///
  /// Clears every build and launch variable so only what a test sets applies.
  pub fn bootpack_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("bootpack");
    for var in BOOTPACK_VARS {
      cmd.env_remove(var);
    }
    cmd
  }

  /// `bootpack build --app <app> --layers <layers>`.
  pub fn build_cmd(&self) -> Command {
    let mut cmd = self.bootpack_cmd();
    cmd
      .arg("build")
      .arg("--app")
      .arg(self.app_path())
      .arg("--layers")
      .arg(self.layers_path());
    cmd
  }
}
