mod common;

use common::{installed_project, TestProject};
use predicates::prelude::*;

const TEAM_STYLE: &str = r#"description = "Team convention"
prompt = """
Summarize these files:
{changed_files}

using this diff:
{diff_content}
"""
"#;

#[test]
fn list_shows_builtin_styles() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["style", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conventional"))
        .stdout(predicate::str::contains("angular"))
        .stdout(predicate::str::contains("emoji"))
        .stdout(predicate::str::contains("[system]"));
}

#[test]
fn add_project_style_and_use_it() {
    let project = installed_project();
    project.write_file("team.toml", TEAM_STYLE);

    project
        .cmd()
        .args(["style", "add", "team.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Style added (project)"));
    assert!(project.path().join(".commit-assistant/style/team.toml").exists());

    project
        .cmd()
        .args(["style", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[project]"))
        .stdout(predicate::str::contains("Team convention"));

    project
        .cmd()
        .args(["style", "use", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Commit style set to team (project)"));

    let config = project.read_file(".commit-assistant/.commit-assistant-config");
    assert!(config.contains("COMMIT_STYLE=team"));
    assert!(config.contains("ENABLE_COMMIT_ASSISTANT=true"));
}

#[test]
fn add_global_style_lands_in_home() {
    let project = TestProject::new();
    project.write_file("mine.toml", TEAM_STYLE);

    project
        .cmd()
        .args(["style", "add", "mine.toml", "--global", "--name", "personal"])
        .assert()
        .success();

    assert!(project.home().join("styles/personal.toml").exists());
}

#[test]
fn add_rejects_style_without_placeholders() {
    let project = TestProject::new();
    project.write_file("bad.toml", "prompt = \"just {changed_files}\"\n");

    project
        .cmd()
        .args(["style", "add", "bad.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("{diff_content}"));
}

#[test]
fn add_existing_style_with_force_overwrites() {
    let project = TestProject::new();
    project.write_file("team.toml", TEAM_STYLE);
    project.cmd().args(["style", "add", "team.toml"]).assert().success();

    project
        .cmd()
        .args(["style", "add", "team.toml", "--force"])
        .assert()
        .success();
}

#[test]
fn use_requires_project_config() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["style", "use", "emoji"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("project config not found"));
}

#[test]
fn use_unknown_style_fails() {
    let project = installed_project();

    project
        .cmd()
        .args(["style", "use", "nonexistent"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("style not found"));
}

#[test]
fn remove_style() {
    let project = TestProject::new();
    project.write_file("team.toml", TEAM_STYLE);
    project.cmd().args(["style", "add", "team.toml"]).assert().success();

    project
        .cmd()
        .args(["style", "remove", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    project
        .cmd()
        .args(["style", "remove", "team"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("No project style named 'team'"));
}
