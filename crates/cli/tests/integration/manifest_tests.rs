//! Manifest command integration tests.

use std::fs;

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn writes_runner_manifest() {
  let env = TestEnv::with_boot_app("3.2.4");
  let out = env.temp.path().join("MANIFEST.MF");

  env
    .bootpack_cmd()
    .arg("manifest")
    .arg("--app")
    .arg(env.app_path())
    .arg("--out")
    .arg(&out)
    .assert()
    .success()
    .stdout(predicate::str::contains("3 classpath entries"));

  let content = fs::read_to_string(&out).unwrap();
  assert!(content.starts_with("Manifest-Version: 1.0\r\n"));
  assert!(content.contains("Main-Class: demo.Application\r\n"));

  // Unfold continuation lines before looking at the classpath.
  let unfolded = content.replace("\r\n ", "");
  assert!(unfolded.contains("Class-Path: application/demo-0.0.1.jar dependencies/a-1.0.jar dependencies/b-2.1.jar"));
  assert!(content.split("\r\n").all(|line| line.len() <= 72));
}

#[test]
fn leaves_application_untouched() {
  let env = TestEnv::with_boot_app("3.2.4");
  let out = env.temp.path().join("out/MANIFEST.MF");

  env
    .bootpack_cmd()
    .arg("manifest")
    .arg("--app")
    .arg(env.app_path())
    .arg("--out")
    .arg(&out)
    .assert()
    .success();

  assert!(out.is_file());
  assert!(env.app_path().join("BOOT-INF/lib/a-1.0.jar").is_file());
  assert!(!env.app_path().join("runner.jar").exists());
}

#[test]
fn missing_start_class_fails() {
  let env = TestEnv::new();
  env.write_file(
    "META-INF/MANIFEST.MF",
    "Manifest-Version: 1.0\r\nSpring-Boot-Version: 3.2.4\r\n\r\n",
  );

  env
    .bootpack_cmd()
    .arg("manifest")
    .arg("--app")
    .arg(env.app_path())
    .arg("--out")
    .arg(env.temp.path().join("MANIFEST.MF"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Start-Class"));
}
