//! Binary-level exit-code contract tests.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn verax() -> Command {
    let mut cmd = Command::cargo_bin("verax").unwrap();
    cmd.env_remove("VERAX_TEST_MODE")
        .env_remove("VERAX_TEST_TIME")
        .env_remove("VERAX_DETERMINISTIC_MODE");
    cmd
}

fn write_fixture(temp: &TempDir, html: &str) -> (String, String) {
    let app = temp.path().join("app");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("index.html"), html).unwrap();
    let out = temp.path().join(".verax");
    (
        app.to_str().unwrap().to_string(),
        out.to_str().unwrap().to_string(),
    )
}

fn write_site_spec(temp: &TempDir) -> String {
    let spec = r#"{
        "pages": {
            "http://localhost:3000/": {
                "route": "/",
                "links": ["/about"],
                "selectors": ["a[href=\"/about\"]"]
            },
            "http://localhost:3000/about": { "route": "/about" }
        },
        "effects": {
            "a[href=\"/about\"]": [
                { "navigate": "http://localhost:3000/about" }
            ]
        }
    }"#;
    let path = temp.path().join("site.json");
    fs::write(&path, spec).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
#[serial]
fn missing_arguments_exit_64() {
    verax().arg("run").assert().failure().code(64);
}

#[test]
#[serial]
fn malformed_url_exits_65() {
    let temp = TempDir::new().unwrap();
    let (app, _) = write_fixture(&temp, "<a href=\"/about\">A</a>");
    verax()
        .args(["run", "--url", "not a url", "--source-root", &app])
        .assert()
        .failure()
        .code(65);
}

#[test]
#[serial]
fn missing_source_root_exits_65() {
    verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            "/definitely/not/here",
        ])
        .assert()
        .failure()
        .code(65);
}

#[test]
#[serial]
fn no_browser_driver_exits_66() {
    let temp = TempDir::new().unwrap();
    let (app, out) = write_fixture(&temp, "<a href=\"/about\">A</a>");
    verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            &app,
            "--out-dir",
            &out,
        ])
        .assert()
        .failure()
        .code(66)
        .stderr(predicate::str::contains("no browser driver"));
}

#[test]
#[serial]
fn scripted_run_with_working_link_exits_0() {
    let temp = TempDir::new().unwrap();
    let (app, out) = write_fixture(&temp, "<a href=\"/about\">A</a>");
    let site = write_site_spec(&temp);
    verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            &app,
            "--out-dir",
            &out,
            "--scripted-site",
            &site,
            "--deterministic",
        ])
        .env("VERAX_TEST_TIME", "2026-01-20T00:00:00Z")
        .assert()
        .success();
}

#[test]
#[serial]
fn json_mode_emits_single_object_on_stdout() {
    let temp = TempDir::new().unwrap();
    let (app, out) = write_fixture(&temp, "<a href=\"/about\">A</a>");
    let site = write_site_spec(&temp);
    let assert = verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            &app,
            "--out-dir",
            &out,
            "--scripted-site",
            &site,
            "--deterministic",
            "--json",
        ])
        .env("VERAX_TEST_TIME", "2026-01-20T00:00:00Z")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let trimmed = stdout.trim();
    let value: serde_json::Value = serde_json::from_str(trimmed).expect("stdout is one JSON object");
    assert_eq!(value["run"]["status"], "SUCCESS");
    assert_eq!(value["summary"]["contractVersion"], 1);
}

#[test]
#[serial]
fn empty_expectation_set_exits_64_without_browser() {
    let temp = TempDir::new().unwrap();
    let (app, out) = write_fixture(&temp, "<p>nothing here</p>");
    let site = write_site_spec(&temp);
    verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            &app,
            "--out-dir",
            &out,
            "--scripted-site",
            &site,
        ])
        .assert()
        .failure()
        .code(64);
}

#[test]
#[serial]
fn broken_click_fixture_exits_20() {
    let temp = TempDir::new().unwrap();
    let (app, out) = write_fixture(
        &temp,
        "<button id=\"broken\" onclick=\"go()\">Go</button>",
    );
    let spec = r##"{
        "pages": {
            "http://localhost:3000/": {
                "route": "/",
                "selectors": ["#broken"]
            }
        },
        "effects": { "#broken": ["nothing"] }
    }"##;
    let site_path = temp.path().join("site.json");
    fs::write(&site_path, spec).unwrap();

    verax()
        .args([
            "run",
            "--url",
            "http://localhost:3000",
            "--source-root",
            &app,
            "--out-dir",
            &out,
            "--scripted-site",
            site_path.to_str().unwrap(),
            "--deterministic",
        ])
        .env("VERAX_TEST_TIME", "2026-01-20T00:00:00Z")
        .assert()
        .failure()
        .code(20)
        .stdout(predicate::str::contains("CONFIRMED"));
}

#[test]
#[serial]
fn help_exits_0() {
    verax().arg("--help").assert().success();
}
