//! Build command integration tests.

use std::fs;

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_exploded_application() {
  let env = TestEnv::with_boot_app("3.2.4");

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("web-application-type (contributed)"))
    .stdout(predicate::str::contains("Spring Cloud Bindings: 2"))
    .stdout(predicate::str::contains("Dependencies: 2"))
    .stdout(predicate::str::contains("Build complete"));

  let env_dir = env.layers_path().join("web-application-type/env.launch");
  assert_eq!(
    fs::read_to_string(env_dir.join("BPL_JVM_THREAD_COUNT.default")).unwrap(),
    "50"
  );
}

#[test]
fn build_reports_labels_and_slices() {
  let env = TestEnv::with_boot_app("3.2.4");

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("org.springframework.boot.version: 3.2.4"))
    .stdout(predicate::str::contains("org.opencontainers.image.title: demo"))
    .stdout(predicate::str::contains("Slice dependencies"))
    .stdout(predicate::str::contains("Slice resources"))
    .stdout(predicate::str::contains("Slice application"));
}

#[test]
fn build_warns_about_ended_generation() {
  let env = TestEnv::with_boot_app("3.2.4");
  let generations = env.temp.path().join("spring-generations.toml");
  fs::write(
    &generations,
    r#"
[[projects]]
name = "Spring Boot"
slug = "spring-boot"

[[projects.generations]]
name = "3.2.x"
oss = "2024-11-23"
commercial = "2025-02-23"
"#,
  )
  .unwrap();

  env
    .build_cmd()
    .arg("--generations")
    .arg(&generations)
    .assert()
    .success()
    .stderr(predicate::str::contains(
      "This application uses Spring Boot 3.2.4. Commercial updates for 3.2.x ended on 2025-02-23.",
    ))
    .stdout(predicate::str::contains("Build complete"));
}

#[test]
fn build_labels_configuration_metadata_for_dataflow() {
  let env = TestEnv::with_boot_app("3.2.4");
  env.write_file(
    "META-INF/spring-configuration-metadata.json",
    r#"{"properties":[{"name":"app.greeting","type":"java.lang.String","sourceType":"demo.AppProperties"}]}"#,
  );
  env.write_file(
    "META-INF/dataflow-configuration-metadata.properties",
    "configuration-properties.names=app.greeting\n",
  );

  let output = env.build_cmd().arg("--output").arg("json").output().unwrap();
  assert!(output.status.success());

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let labels = &result["labels"];
  let selected: serde_json::Value = serde_json::from_str(
    labels["org.springframework.cloud.dataflow.spring-configuration-metadata.json"]
      .as_str()
      .unwrap(),
  )
  .unwrap();
  assert_eq!(selected["properties"][0]["name"], "app.greeting");
  assert!(labels["org.springframework.boot.spring-configuration-metadata.json"].is_string());
}

#[test]
fn build_json_output() {
  let env = TestEnv::with_boot_app("3.2.4");

  let output = env.build_cmd().arg("--output").arg("json").output().unwrap();
  assert!(output.status.success());

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["cloud_bindings_version"], "2");
  assert_eq!(result["web_application_type"], "none");
  assert_eq!(result["dependencies"].as_array().unwrap().len(), 2);
  assert_eq!(result["dependencies"][0]["name"], "a");
  assert_eq!(result["dependencies"][0]["version"], "1.0");
  assert_eq!(result["layers"][0]["status"], "contributed");
}

#[test]
fn second_build_reuses_layers() {
  let env = TestEnv::with_boot_app("3.2.4");

  env.build_cmd().assert().success();
  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("web-application-type (reused)"));
}

#[test]
fn not_a_boot_application() {
  let env = TestEnv::new();
  env.write_file("index.html", "<html></html>\n");

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("is not a Spring Boot application"));
}

#[test]
fn not_a_boot_application_json_is_null() {
  let env = TestEnv::new();

  env
    .build_cmd()
    .arg("--output")
    .arg("json")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("null"));
}

#[test]
fn native_image_contributes_classpath() {
  let env = TestEnv::with_boot_app("3.2.4");

  env
    .build_cmd()
    .arg("--native-image")
    .assert()
    .success()
    .stdout(predicate::str::contains("native-image-classpath (contributed)"))
    .stdout(predicate::str::contains("Native image: -H:Name="))
    .stdout(predicate::str::contains("demo.Application"));

  let classpath = fs::read_to_string(
    env
      .layers_path()
      .join("native-image-classpath/env.build/CLASSPATH.override"),
  )
  .unwrap();
  assert!(classpath.starts_with(&format!("{}/BOOT-INF/classes", env.app_path().display())));
  assert!(classpath.contains("BOOT-INF/lib/a-1.0.jar"));
  assert!(!env.layers_path().join("spring-performance").exists());
}

#[test]
fn invalid_flag_fails_build() {
  let env = TestEnv::with_boot_app("3.2.4");

  env
    .build_cmd()
    .env("BP_JVM_CDS_ENABLED", "maybe")
    .assert()
    .failure()
    .stderr(predicate::str::contains("BP_JVM_CDS_ENABLED"));
}

#[cfg(unix)]
#[test]
fn training_run_produces_shared_archive() {
  let env = TestEnv::with_boot_app("3.2.4");
  let java_home = env.fake_java_home();

  env
    .build_cmd()
    .env("JAVA_HOME", &java_home)
    .env("BP_JVM_CDS_ENABLED", "true")
    .assert()
    .success()
    .stdout(predicate::str::contains("spring-performance (contributed)"))
    .stdout(predicate::str::contains("BPL_JVM_CDS_ENABLED=true"))
    .stdout(predicate::str::contains("web (default)"))
    .stdout(predicate::str::contains("-cp runner.jar demo.Application"));

  let layer = env.layers_path().join("spring-performance");
  assert!(layer.join("application.jsa").is_file());
  assert!(env.app_path().join("runner.jar").is_file());
  assert!(env.app_path().join("dependencies/a-1.0.jar").is_file());
  assert!(!env.app_path().join("BOOT-INF").exists());
}

#[cfg(unix)]
#[test]
fn failing_training_run_fails_build() {
  let env = TestEnv::with_boot_app("3.2.4");
  let java_home = env.temp.path().join("broken-jdk");
  fs::create_dir_all(java_home.join("bin")).unwrap();

  env
    .build_cmd()
    .env("JAVA_HOME", &java_home)
    .env("BP_JVM_CDS_ENABLED", "true")
    .assert()
    .failure()
    .stderr(predicate::str::contains("training run failed"));
}
