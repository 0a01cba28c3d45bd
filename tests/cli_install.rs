mod common;

use common::TestProject;
use predicates::prelude::*;

const START_MARKER: &str = "### BEGIN: commit-assistant hook section (DO NOT REMOVE) ###";
const END_MARKER: &str = "### END: commit-assistant hook section (DO NOT REMOVE) ###";

#[test]
fn install_creates_executable_git_hook() {
    let project = TestProject::new();

    project
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hook installed"));

    let hook = std::fs::read_to_string(project.git_hook_path()).unwrap();
    assert!(hook.starts_with("#!/bin/sh\n"));
    assert_eq!(hook.matches(START_MARKER).count(), 1);
    assert_eq!(hook.matches(END_MARKER).count(), 1);
    assert!(hook.contains("commit-assistant commit --msg-file"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(project.git_hook_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    assert!(TestProject::backups_of(&project.git_hook_path()).is_empty());
}

#[test]
fn install_writes_project_config_and_registry() {
    let project = TestProject::new();
    project.cmd().arg("install").assert().success();

    let config = project.read_file(".commit-assistant/.commit-assistant-config");
    assert!(config.contains("ENABLE_COMMIT_ASSISTANT=true"));
    assert!(config.contains("COMMIT_STYLE=conventional"));

    let registry = std::fs::read_to_string(project.home().join("installations.toml")).unwrap();
    let canonical = project.path().canonicalize().unwrap();
    assert!(registry.contains(&*canonical.to_string_lossy()));
}

#[test]
fn install_keeps_existing_config() {
    let project = TestProject::new();
    project.write_file(
        ".commit-assistant/.commit-assistant-config",
        "COMMIT_STYLE=emoji\n",
    );
    project.cmd().arg("install").assert().success();

    assert_eq!(
        project.read_file(".commit-assistant/.commit-assistant-config"),
        "COMMIT_STYLE=emoji\n"
    );
}

#[test]
fn install_merges_into_user_hook() {
    let project = TestProject::new();
    project.write_file(
        ".git/hooks/prepare-commit-msg",
        "#!/bin/bash\necho \"user hook\"\n",
    );

    project
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("merged"));

    let hook = std::fs::read_to_string(project.git_hook_path()).unwrap();
    assert!(hook.starts_with("#!/bin/bash\n"));
    assert!(hook.contains("echo \"user hook\""));
    assert_eq!(hook.matches(START_MARKER).count(), 1);
    assert_eq!(TestProject::backups_of(&project.git_hook_path()).len(), 1);
}

#[test]
fn install_twice_leaves_hook_untouched() {
    let project = TestProject::new();
    project.cmd().arg("install").assert().success();
    let first = std::fs::read_to_string(project.git_hook_path()).unwrap();

    project
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));

    assert_eq!(std::fs::read_to_string(project.git_hook_path()).unwrap(), first);
    assert!(TestProject::backups_of(&project.git_hook_path()).is_empty());
}

#[test]
fn install_targets_husky_directory() {
    let project = TestProject::new();
    std::fs::create_dir_all(project.path().join(".husky")).unwrap();

    project
        .cmd()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("husky"));

    let hook = std::fs::read_to_string(project.husky_hook_path()).unwrap();
    assert!(hook.starts_with(START_MARKER));
    assert!(!project.git_hook_path().exists());
}

#[test]
fn install_json_output() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["--json", "install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"change\": \"created\""))
        .stdout(predicate::str::contains("\"config_created\": true"));
}

#[test]
fn install_outside_repository_fails() {
    let project = TestProject::new();
    let outside = tempfile::TempDir::new().unwrap();

    project
        .cmd()
        .args(["install", "--repo-path"])
        .arg(outside.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a git repository"));
}

#[cfg(unix)]
#[test]
fn hook_without_terminal_falls_back_to_git_editor() {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new();
    project.write_file("README.md", "# demo\n");
    project.git_commit("initial");
    project.cmd().arg("install").assert().success();
    project.stage_file("src/lib.rs", "pub fn answer() -> u32 { 42 }\n");

    let editor = project.home().join("editor.sh");
    std::fs::write(&editor, "#!/bin/sh\necho 'fallback message' > \"$1\"\n").unwrap();
    std::fs::set_permissions(&editor, std::fs::Permissions::from_mode(0o755)).unwrap();

    let bin_dir = TestProject::bin().parent().unwrap().to_path_buf();
    let path = format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    // setsid detaches the commit from any controlling terminal.
    let Ok(output) = std::process::Command::new("setsid")
        .args(["-w", "git", "commit"])
        .current_dir(project.path())
        .env("PATH", path)
        .env("GIT_EDITOR", &editor)
        .env("COMMIT_ASSISTANT_HOME", project.home())
        .env_remove("GEMINI_API_KEY")
        .stdin(std::process::Stdio::null())
        .output()
    else {
        return;
    };

    assert!(
        output.status.success(),
        "commit failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let log = project.git(&["log", "--format=%s"]);
    assert!(log.contains("fallback message"), "log was: {log}");
}
