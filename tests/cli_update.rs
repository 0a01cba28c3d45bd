mod common;

use common::{installed_project, TestProject};
use predicates::prelude::*;

const START_MARKER: &str = "### BEGIN: commit-assistant hook section (DO NOT REMOVE) ###";
const LEGACY_MARKER: &str = "# 以下內容由 commit-assistant 提供";

#[test]
fn update_after_install_is_a_no_op() {
    let project = installed_project();
    let before = std::fs::read_to_string(project.git_hook_path()).unwrap();

    project
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));

    project.cmd().arg("update").assert().success();

    assert_eq!(std::fs::read_to_string(project.git_hook_path()).unwrap(), before);
    assert!(TestProject::backups_of(&project.git_hook_path()).is_empty());
}

#[test]
fn update_migrates_legacy_husky_hook() {
    let project = TestProject::new();
    project.write_file(
        ".husky/prepare-commit-msg",
        &format!("#!/usr/bin/env sh\n. \"$(dirname -- \"$0\")/_/husky.sh\"\n\n{LEGACY_MARKER}\nold cmd\n"),
    );

    project
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Legacy husky hook migrated"));

    let hook = std::fs::read_to_string(project.husky_hook_path()).unwrap();
    assert!(!hook.contains(LEGACY_MARKER));
    assert!(!hook.contains("old cmd"));
    assert_eq!(hook.matches(START_MARKER).count(), 1);
    assert!(hook.contains("husky.sh"));
    assert!(hook.contains("commit-assistant commit --msg-file"));
    assert_eq!(TestProject::backups_of(&project.husky_hook_path()).len(), 1);
}

#[test]
fn update_appends_region_to_user_hook() {
    let project = TestProject::new();
    project.write_file(".git/hooks/prepare-commit-msg", "#!/bin/sh\necho mine\n");

    project.cmd().arg("update").assert().success();

    let hook = std::fs::read_to_string(project.git_hook_path()).unwrap();
    assert!(hook.starts_with("#!/bin/sh\necho mine\n\n"));
    assert_eq!(hook.matches(START_MARKER).count(), 1);
}

#[test]
fn update_relocates_root_config() {
    let project = TestProject::new();
    project.write_file(".commit-assistant-config", "COMMIT_STYLE=emoji\nUSE_MODEL=gemini-pro\n");

    project
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config moved"));

    assert!(!project.path().join(".commit-assistant-config").exists());
    let config = project.read_file(".commit-assistant/.commit-assistant-config");
    assert!(config.contains("ENABLE_COMMIT_ASSISTANT=true"));
    assert!(config.contains("COMMIT_STYLE=emoji"));
    assert!(config.contains("USE_MODEL=gemini-pro"));
}

#[test]
fn update_all_repo_visits_every_installation() {
    let first = installed_project();
    let second = TestProject::new();
    first
        .cmd()
        .args(["install", "--repo-path"])
        .arg(second.path())
        .assert()
        .success();

    std::fs::remove_file(second.git_hook_path()).unwrap();

    first
        .cmd()
        .args(["update", "--all-repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 updated, 0 failed"));

    assert!(second.git_hook_path().exists());
}

#[test]
fn update_all_repo_isolates_failures() {
    let first = installed_project();
    let broken = TestProject::new();
    first
        .cmd()
        .args(["install", "--repo-path"])
        .arg(broken.path())
        .assert()
        .success();

    std::fs::remove_dir_all(broken.path().join(".git")).unwrap();

    first
        .cmd()
        .args(["update", "--all-repo"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("1 updated, 1 failed"));

    assert!(first.git_hook_path().exists());
}

#[test]
fn update_all_repo_with_empty_registry() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["update", "--all-repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No installed repositories"));
}

#[test]
fn update_all_repo_json_output() {
    let project = installed_project();

    project
        .cmd()
        .args(["--json", "update", "--all-repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"failed\": []"));
}
