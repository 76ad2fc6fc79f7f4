//! The `bosh-render` binary end to end, using the in-process engine.

use bosh_render_cli::test_utils::JobFixture;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::common::{asset, bosh_render};

#[test]
fn test_render_command() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out/config/simple");

    bosh_render(temp.path())
        .arg("render")
        .arg(asset("simple_test.tera"))
        .arg(&output)
        .arg("--spec")
        .arg(asset("simple_job.MF"))
        .arg("--context")
        .arg(asset("deployment.yml"))
        .args(["--engine", "tera"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(4 bytes)"));

    assert_eq!(std::fs::read_to_string(output).unwrap(), "bar\n");
}

#[test]
fn test_render_command_uses_defaults_without_context() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("simple");

    bosh_render(temp.path())
        .arg("render")
        .arg(asset("simple_test.tera"))
        .arg(&output)
        .arg("--spec")
        .arg(asset("simple_job.MF"))
        .args(["--engine", "tera"])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(output).unwrap(), "baz\n");
}

#[test]
fn test_render_command_reports_template_error() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("bad");

    bosh_render(temp.path())
        .arg("render")
        .arg(asset("bad_test.tera"))
        .arg(&output)
        .arg("--spec")
        .arg(asset("simple_job.MF"))
        .args(["--engine", "tera"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("thisdoesntexist"));

    assert!(!output.exists());
}

fn asset_body(name: &str) -> String {
    std::fs::read_to_string(asset(name)).unwrap()
}

#[test]
fn test_job_command() {
    let temp = TempDir::new().unwrap();
    let job = JobFixture::new("simple")
        .property("foo", Some("baz"))
        .template("simple_test.tera", "config/simple", &asset_body("simple_test.tera"))
        .template("instance_info_test.tera", "bin/info", &asset_body("instance_info_test.tera"))
        .write()
        .unwrap();
    let out = temp.path().join("rendered");

    bosh_render(temp.path())
        .arg("job")
        .arg(job.path())
        .arg("-o")
        .arg(&out)
        .arg("--instance")
        .arg(asset("instance.yml"))
        .args(["--engine", "tera", "--max-parallel", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config/simple"))
        .stdout(predicate::str::contains("bin/info"));

    assert_eq!(std::fs::read_to_string(out.join("config/simple")).unwrap(), "baz\n");
    assert_eq!(
        std::fs::read_to_string(out.join("bin/info")).unwrap(),
        "foo.deadbeef.com myaz false mydeployment 005443 123 256.256.256.256 foo\n"
    );
}

#[test]
fn test_job_command_fails_when_a_template_fails() {
    let temp = TempDir::new().unwrap();
    let job = JobFixture::new("broken")
        .property("foo", Some("baz"))
        .template("simple_test.tera", "config/simple", &asset_body("simple_test.tera"))
        .template("bad_test.tera", "config/bad", &asset_body("bad_test.tera"))
        .write()
        .unwrap();
    // Older releases name the spec file job.MF
    std::fs::rename(job.path().join("spec"), job.path().join("job.MF")).unwrap();
    let out = temp.path().join("rendered");

    bosh_render(temp.path())
        .arg("job")
        .arg(job.path())
        .arg("-o")
        .arg(&out)
        .args(["--engine", "tera"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 template(s) of job 'broken' failed to render"));

    assert_eq!(std::fs::read_to_string(out.join("config/simple")).unwrap(), "baz\n");
    assert!(!out.join("config/bad").exists());
}

#[test]
fn test_context_command() {
    let temp = TempDir::new().unwrap();

    bosh_render(temp.path())
        .arg("context")
        .arg("--spec")
        .arg(asset("simple_job.MF"))
        .arg("--context")
        .arg(asset("deployment.yml"))
        .arg("--instance")
        .arg(asset("instance.yml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"index\": 123"))
        .stdout(predicate::str::contains("\"name\": \"simple\""))
        .stdout(predicate::str::contains("\"exported\": \"toaster\""));
}

#[test]
fn test_context_command_rejects_bad_index() {
    let temp = TempDir::new().unwrap();
    let instance = temp.path().join("instance.yml");
    std::fs::write(&instance, "index: [1]\n").unwrap();

    bosh_render(temp.path())
        .arg("context")
        .arg("--instance")
        .arg(&instance)
        .assert()
        .failure()
        .stderr(predicate::str::contains("index"));
}

#[test]
fn test_check_command_in_process_engine() {
    let temp = TempDir::new().unwrap();

    bosh_render(temp.path())
        .args(["check", "--engine", "tera"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tera engine is available"));
}

#[test]
fn test_check_command_missing_ruby() {
    let temp = TempDir::new().unwrap();

    bosh_render(temp.path())
        .args(["check", "--engine", "erb", "--ruby", "/nonexistent/bin/ruby"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires ruby"));
}

#[test]
fn test_check_command_shows_config() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("bosh-render.toml"), "engine = \"tera\"\nmax_parallel = 8\n").unwrap();

    bosh_render(temp.path())
        .args(["check", "--show-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_parallel = 8"))
        .stdout(predicate::str::contains("bosh-render.toml"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();

    assert_cmd::Command::cargo_bin("bosh-render")
        .unwrap()
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .args(["check", "--engine", "tera"])
        .assert()
        .failure();
}
