//! Classpath command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn prints_entries_in_index_order() {
  let env = TestEnv::with_boot_app("3.3.0");

  env
    .bootpack_cmd()
    .arg("classpath")
    .arg("--app")
    .arg(env.app_path())
    .assert()
    .success()
    .stdout("BOOT-INF/lib/a-1.0.jar\nBOOT-INF/lib/b-2.1.jar\n");
}

#[test]
fn path_style_index_entries_are_kept() {
  let env = TestEnv::with_boot_app("3.3.0");
  env.write_file("BOOT-INF/classpath.idx", "- \"BOOT-INF/lib/b-2.1.jar\"\n- \"a-1.0.jar\"\n");

  env
    .bootpack_cmd()
    .arg("classpath")
    .arg("--app")
    .arg(env.app_path())
    .assert()
    .success()
    .stdout("BOOT-INF/lib/b-2.1.jar\nBOOT-INF/lib/a-1.0.jar\n");
}

#[test]
fn json_output_is_a_list() {
  let env = TestEnv::with_boot_app("3.3.0");

  let output = env
    .bootpack_cmd()
    .arg("--output")
    .arg("json")
    .arg("classpath")
    .arg("--app")
    .arg(env.app_path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let entries: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(entries, vec!["BOOT-INF/lib/a-1.0.jar", "BOOT-INF/lib/b-2.1.jar"]);
}

#[test]
fn malformed_index_fails() {
  let env = TestEnv::with_boot_app("3.3.0");
  env.write_file("BOOT-INF/classpath.idx", "key: [unclosed\n");

  env
    .bootpack_cmd()
    .arg("classpath")
    .arg("--app")
    .arg(env.app_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("unable to decode"));
}
