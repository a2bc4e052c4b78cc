//! End-to-end builds.

use std::fs;

use bootpack_lib::build::{BuildOptions, BuildPlan, build};
use bootpack_lib::layer::ContributionStatus;
use bootpack_lib::performance::PerformanceState;
use bootpack_lib::web_app_type::WebApplicationType;
use serial_test::serial;
use tempfile::TempDir;

use super::common::{FakeJvm, Fixture, with_build_env, write_jar};

fn options(fixture: &Fixture) -> BuildOptions {
  BuildOptions::new(fixture.app.path(), fixture.layers.path()).with_java("/jdk/bin/java")
}

#[tokio::test]
#[serial]
async fn boot33_training_run_rezips_and_extracts() {
  let fx = Fixture::servlet_app("3.3.2");
  let jvm = FakeJvm::default();

  let plan = with_build_env(&[("BP_JVM_CDS_ENABLED", "true")], || BuildPlan::resolve(&options(&fx)))
    .unwrap()
    .unwrap();
  let result = plan.execute(&jvm).await.unwrap();

  let calls = jvm.calls();
  assert_eq!(calls.len(), 2);
  assert_eq!(calls[0].args[0], "-Djarmode=tools");
  assert_eq!(calls[1].dir, fx.app.path());
  assert!(calls[1].args.contains(&"-XX:ArchiveClassesAtExit=application.jsa".to_string()));

  let app = fx.app.path();
  assert!(app.join("runner.jar").is_file());
  assert!(app.join("lib/spring-webmvc-6.1.8.jar").is_file());
  assert!(!app.join("BOOT-INF").exists());

  let layer = fx.layers.path().join("spring-performance");
  assert!(layer.join("application.jsa").is_file());
  assert!(layer.join("runner.jar").is_file());
  assert_eq!(result.performance, Some(PerformanceState::Complete));
  assert_eq!(result.web_application_type, Some(WebApplicationType::Servlet));
  assert_eq!(
    fs::read_to_string(
      fx.layers
        .path()
        .join("web-application-type/env.launch/BPL_JVM_THREAD_COUNT.default")
    )
    .unwrap(),
    "250"
  );
}

#[tokio::test]
#[serial]
async fn boot33_cloud_bindings_classpath_points_at_extracted_jar() {
  let fx = Fixture::servlet_app("3.3.2");
  let downloads = TempDir::new().unwrap();
  let artifact = downloads.path().join("spring-cloud-bindings-2.0.4.jar");
  write_jar(&artifact, &[("org/springframework/cloud/bindings/Binding.class", b"b")]);
  let jvm = FakeJvm::default();

  let plan = with_build_env(&[("BP_JVM_CDS_ENABLED", "true")], || {
    BuildPlan::resolve(&options(&fx).with_cloud_bindings(&artifact))
  })
  .unwrap()
  .unwrap();
  let result = plan.execute(&jvm).await.unwrap();

  let classpath = "runner.jar:lib/spring-cloud-bindings-2.0.4.jar";
  let training = jvm.calls().pop().unwrap();
  assert!(training.args.windows(2).any(|w| w[0] == "-cp" && w[1] == classpath));
  for entry in classpath.split(':') {
    assert!(fx.app.path().join(entry).is_file(), "{} missing after extraction", entry);
  }
  let web = result.processes.iter().find(|p| p.default).unwrap();
  assert_eq!(web.args[1], classpath);
}

#[tokio::test]
#[serial]
async fn boot32_training_run_with_cloud_bindings() {
  let fx = Fixture::servlet_app("3.2.6");
  let downloads = TempDir::new().unwrap();
  let artifact = downloads.path().join("spring-cloud-bindings-2.0.4.jar");
  write_jar(&artifact, &[("org/springframework/cloud/bindings/Binding.class", b"b")]);
  let jvm = FakeJvm::default();

  let plan = with_build_env(&[("BP_JVM_CDS_ENABLED", "true")], || {
    BuildPlan::resolve(&options(&fx).with_cloud_bindings(&artifact))
  })
  .unwrap()
  .unwrap();
  let result = plan.execute(&jvm).await.unwrap();

  let names: Vec<&str> = result.layers.iter().map(|r| r.layer.name.as_str()).collect();
  assert_eq!(
    names,
    vec!["spring-cloud-bindings", "web-application-type", "spring-performance"]
  );
  assert_eq!(result.helpers, vec!["spring-cloud-bindings", "performance"]);

  let app = fx.app.path();
  assert!(app.join("dependencies/spring-cloud-bindings-2.0.4.jar").is_file());
  assert!(app.join("application/shop-1.4.0.jar").is_file());
  assert!(fx.layers.path().join("spring-cloud-bindings/spring-cloud-bindings-2.0.4.jar").is_file());

  let training = &jvm.calls()[0];
  assert_eq!(jvm.calls().len(), 1);
  assert!(
    training
      .args
      .windows(2)
      .any(|w| w[0] == "-cp" && w[1] == "runner.jar:dependencies/spring-cloud-bindings-2.0.4.jar")
  );

  let web = result.processes.iter().find(|p| p.default).unwrap();
  assert_eq!(web.kind, "web");
  assert_eq!(
    web.args,
    vec![
      "-cp",
      "runner.jar:dependencies/spring-cloud-bindings-2.0.4.jar",
      "shop.ShopApplication"
    ]
  );
}

#[tokio::test]
#[serial]
async fn unchanged_application_reuses_layers() {
  let fx = Fixture::servlet_app("3.2.6");
  fs::create_dir_all(fx.app.path().join("META-INF/native-image")).unwrap();
  let jvm = FakeJvm::default();
  let aot = [("BP_SPRING_AOT_ENABLED", "true")];

  let plan = with_build_env(&aot, || BuildPlan::resolve(&options(&fx))).unwrap().unwrap();
  let first = plan.execute(&jvm).await.unwrap();
  assert_eq!(first.layers.len(), 2);
  assert!(first.layers.iter().all(|r| r.status == ContributionStatus::Contributed));
  let performance = &first.layers[1].layer;
  assert_eq!(performance.launch_env["BPL_SPRING_AOT_ENABLED"], "true");

  let plan = with_build_env(&aot, || BuildPlan::resolve(&options(&fx))).unwrap().unwrap();
  let second = plan.execute(&jvm).await.unwrap();
  assert!(second.layers.iter().all(|r| r.status == ContributionStatus::Reused));
  assert_eq!(second.layers[1].layer.launch_env, performance.launch_env);
  assert!(jvm.calls().is_empty());
}

#[test]
#[serial]
fn already_bundled_bindings_are_left_alone() {
  let fx = Fixture::servlet_app("3.2.6");
  write_jar(
    &fx.app.path().join("BOOT-INF/lib/spring-cloud-bindings-2.0.3.jar"),
    &[("org/springframework/cloud/bindings/Binding.class", b"b")],
  );
  let jvm = FakeJvm::default();

  let result = with_build_env(&[], || {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(build(&jvm, &options(&fx)))
  })
  .unwrap()
  .unwrap();

  assert_eq!(result.cloud_bindings_version, None);
  assert!(result.helpers.is_empty());
  assert!(
    result
      .dependencies
      .iter()
      .any(|d| d.name == "spring-cloud-bindings" && d.version.as_deref() == Some("2.0.3"))
  );
}
