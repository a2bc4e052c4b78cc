//! Helper command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn shared_archive_is_added_to_existing_options() {
  let env = TestEnv::new();
  env.write_file("application.jsa", b"jsa");

  env
    .bootpack_cmd()
    .arg("helper")
    .arg("--dir")
    .arg(env.app_path())
    .env("BPL_JVM_CDS_ENABLED", "true")
    .env("JAVA_TOOL_OPTIONS", "-Xmx512m")
    .assert()
    .success()
    .stdout(
      "-Xmx512m -XX:SharedArchiveFile=application.jsa -Dorg.springframework.cloud.bindings.boot.enable=true\n",
    );
}

#[test]
fn aot_flag_without_cache() {
  let env = TestEnv::new();

  env
    .bootpack_cmd()
    .arg("helper")
    .arg("--dir")
    .arg(env.app_path())
    .env("BPL_SPRING_AOT_ENABLED", "true")
    .env("BPL_SPRING_CLOUD_BINDINGS_ENABLED", "false")
    .assert()
    .success()
    .stdout("-Dspring.aot.enabled=true\n");
}

#[test]
fn nothing_enabled_prints_nothing() {
  let env = TestEnv::new();

  env
    .bootpack_cmd()
    .arg("helper")
    .arg("--dir")
    .arg(env.app_path())
    .env("BPL_SPRING_CLOUD_BINDINGS_ENABLED", "false")
    .assert()
    .success()
    .stdout(predicate::str::is_empty());
}

#[test]
fn invalid_flag_fails() {
  let env = TestEnv::new();

  env
    .bootpack_cmd()
    .arg("helper")
    .arg("--dir")
    .arg(env.app_path())
    .env("BPL_JVM_CDS_ENABLED", "sometimes")
    .assert()
    .failure()
    .stderr(predicate::str::contains("BPL_JVM_CDS_ENABLED"));
}
