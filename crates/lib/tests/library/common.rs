//! Shared fixtures for library integration tests.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use bootpack_lib::execute::{ExecOutput, ExecuteError, Execution, Executor};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Build variables cleared around every build in these tests.
pub const BUILD_VARS: [&str; 7] = [
  "BP_JVM_CDS_ENABLED",
  "BP_SPRING_AOT_ENABLED",
  "BP_SPRING_CLOUD_BINDINGS_DISABLED",
  "BP_SPRING_CLOUD_BINDINGS_VERSION",
  "BP_MAVEN_ACTIVE_PROFILES",
  "CDS_TRAINING_JAVA_TOOL_OPTIONS",
  "JAVA_TOOL_OPTIONS",
];

/// Run `f` with the build variables cleared, then `set` applied.
pub fn with_build_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
  let vars: Vec<(&str, Option<&str>)> = BUILD_VARS
    .iter()
    .map(|name| (*name, set.iter().find(|(k, _)| k == name).map(|(_, v)| *v)))
    .collect();
  temp_env::with_vars(vars, f)
}

/// Application and layers directories for one test.
pub struct Fixture {
  pub app: TempDir,
  pub layers: TempDir,
}

impl Fixture {
  /// An exploded Boot application of `version` with a servlet container on
  /// its classpath.
  pub fn servlet_app(version: &str) -> Self {
    let fixture = Self {
      app: TempDir::new().unwrap(),
      layers: TempDir::new().unwrap(),
    };
    let root = fixture.app.path();
    write_file(
      root,
      "META-INF/MANIFEST.MF",
      format!(
        "Manifest-Version: 1.0\r\n\
         Main-Class: org.springframework.boot.loader.launch.JarLauncher\r\n\
         Start-Class: shop.ShopApplication\r\n\
         Spring-Boot-Version: {}\r\n\
         Spring-Boot-Classes: BOOT-INF/classes/\r\n\
         Spring-Boot-Lib: BOOT-INF/lib/\r\n\
         Spring-Boot-Classpath-Index: BOOT-INF/classpath.idx\r\n\
         Implementation-Title: shop\r\n\
         Implementation-Version: 1.4.0\r\n\
         \r\n",
        version
      ),
    );
    write_file(root, "BOOT-INF/classes/shop/ShopApplication.class", b"\xca\xfe\xba\xbe");
    write_file(root, "BOOT-INF/classes/application.yml", "server:\n  port: 8080\n");
    write_file(
      root,
      "BOOT-INF/classpath.idx",
      "- \"BOOT-INF/lib/spring-webmvc-6.1.8.jar\"\n- \"BOOT-INF/lib/tomcat-embed-core-10.1.24.jar\"\n",
    );
    write_jar(
      &root.join("BOOT-INF/lib/spring-webmvc-6.1.8.jar"),
      &[
        ("org/springframework/web/servlet/DispatcherServlet.class", b"mvc"),
        ("org/springframework/web/context/ConfigurableWebApplicationContext.class", b"ctx"),
      ],
    );
    write_jar(
      &root.join("BOOT-INF/lib/tomcat-embed-core-10.1.24.jar"),
      &[("jakarta/servlet/Servlet.class", b"servlet")],
    );
    fixture
  }
}

pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
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

/// A JVM stand-in that understands the two invocations a build makes.
///
/// `-Djarmode=tools ... extract --destination <dir>` writes `runner.jar` and
/// the archive's libraries into `<dir>/lib`; a training run writes the shared
/// archive into its working directory.
#[derive(Default)]
pub struct FakeJvm {
  pub calls: Mutex<Vec<Execution>>,
}

impl FakeJvm {
  pub fn calls(&self) -> Vec<Execution> {
    self.calls.lock().unwrap().clone()
  }

  fn extract(args: &[String]) -> io::Result<()> {
    let value_after = |flag: &str| args.iter().skip_while(|a| *a != flag).nth(1).cloned();
    let (Some(jar), Some(dest)) = (value_after("-jar"), value_after("--destination")) else {
      return Err(io::Error::other("incomplete tools invocation"));
    };
    let dest = Path::new(&dest);
    fs::create_dir_all(dest.join("lib"))?;
    fs::copy(&jar, dest.join("runner.jar"))?;

    let mut archive = ZipArchive::new(fs::File::open(&jar)?)?;
    for i in 0..archive.len() {
      let mut entry = archive.by_index(i)?;
      let name = entry.name().to_string();
      if let Some(lib) = name.strip_prefix("BOOT-INF/lib/").filter(|n| !n.is_empty()) {
        let mut out = fs::File::create(dest.join("lib").join(lib))?;
        io::copy(&mut entry, &mut out)?;
      }
    }
    Ok(())
  }
}

impl Executor for FakeJvm {
  async fn execute(&self, execution: Execution) -> Result<ExecOutput, ExecuteError> {
    self.calls.lock().unwrap().push(execution.clone());
    let io_failure = |source: io::Error| ExecuteError::Spawn {
      cmd: execution.display(),
      dir: execution.dir.clone(),
      source,
    };

    if execution.args.iter().any(|a| a == "-Djarmode=tools") {
      Self::extract(&execution.args).map_err(io_failure)?;
    }
    if let Some(archive) = execution
      .args
      .iter()
      .find_map(|a| a.strip_prefix("-XX:ArchiveClassesAtExit="))
    {
      fs::write(execution.dir.join(archive), b"shared archive").map_err(io_failure)?;
    }
    Ok(ExecOutput::default())
  }
}
