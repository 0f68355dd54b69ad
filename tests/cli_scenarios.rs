//! End-to-end CLI scenarios S1-S4 from spec.md §8, driven through the built
//! `morc` binary against a scratch project directory.

use assert_cmd::Command;
use std::fs;

fn morc(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("morc").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn init_project(dir: &std::path::Path) {
    morc(dir).args(["init", "demo"]).assert().success();
    morc(dir)
        .args(["reqs", "req1", "--new", "--method", "GET", "--url", "https://example.com/"])
        .assert()
        .success();
}

#[test]
fn s1_list_captures_none_defined() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    morc(dir.path())
        .args(["caps", "req1"])
        .assert()
        .success()
        .stdout("(none)\n");
}

#[test]
fn s2_create_offset_capture() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    morc(dir.path())
        .args(["caps", "req1", "--new", "troll", "-s", ":28,32"])
        .assert()
        .success()
        .stdout("Added new capture from response byte offset to $TROLL on req1\n");

    let project_json = fs::read_to_string(dir.path().join(".morc/project.json")).unwrap();
    assert!(project_json.contains("\"TROLL\""));
    assert!(project_json.contains("\"start\": 28"));
    assert!(project_json.contains("\"end\": 32"));
}

#[test]
fn s3_create_path_capture() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    morc(dir.path())
        .args(["caps", "req1", "--new", "x", "-s", "data.people[0].name.first"])
        .assert()
        .success()
        .stdout("Added new capture from response JSON path to $X on req1\n");

    morc(dir.path())
        .args(["caps", "req1"])
        .assert()
        .success()
        .stdout("$X from .data.people[0].name.first\n");
}

#[test]
fn proj_shows_and_edits_settings() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    morc(dir.path())
        .args(["proj"])
        .assert()
        .success()
        .stdout(
            "name: demo\nvar_prefix: $\ncookie_lifetime: 1day\nrecord_history: true\nrecord_session: true\n",
        );

    morc(dir.path())
        .args(["proj", "--cookie-lifetime", "30m", "--record-session", "false"])
        .assert()
        .success()
        .stdout("Updated project settings\n");

    morc(dir.path())
        .args(["proj"])
        .assert()
        .success()
        .stdout(
            "name: demo\nvar_prefix: $\ncookie_lifetime: 30m\nrecord_history: true\nrecord_session: false\n",
        );
}

#[test]
fn vars_listing_reports_the_current_environment_count() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());

    morc(dir.path())
        .args(["vars"])
        .assert()
        .success()
        .stdout("(none)\n0 variable(s) in (default)\n");

    morc(dir.path()).args(["vars", "token", "abc"]).assert().success();

    morc(dir.path())
        .args(["vars"])
        .assert()
        .success()
        .stdout("TOKEN=abc\n1 variable(s) in (default)\n");
}

#[test]
fn s4_delete_a_capture() {
    let dir = tempfile::tempdir().unwrap();
    init_project(dir.path());
    morc(dir.path())
        .args(["caps", "req1", "--new", "troll", "-s", ":28,32"])
        .assert()
        .success();

    morc(dir.path())
        .args(["caps", "REQ1", "-D", "troll"])
        .assert()
        .success()
        .stdout("Deleted capture to $TROLL from req1\n");

    morc(dir.path())
        .args(["caps", "req1"])
        .assert()
        .success()
        .stdout("(none)\n");
}
