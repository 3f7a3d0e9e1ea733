use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    let binary = assert_cmd::cargo::cargo_bin!("branchsweep");
    let mut command = Command::new(binary);
    command.env("HOME", temp_home.path());
    command.env("XDG_CONFIG_HOME", temp_home.path().join(".config"));
    (command, temp_home)
}

pub fn init_repo_with_merged_branch(path: &Path, branch: &str) {
    fs::create_dir_all(path).expect("create repo dir");
    run_git(path, &["init", "--initial-branch=main"]);
    run_git(path, &["config", "user.email", "tests@example.com"]);
    run_git(path, &["config", "user.name", "Test User"]);

    fs::write(path.join("README.md"), "hello\n").expect("write readme");
    run_git(path, &["add", "README.md"]);
    run_git(path, &["commit", "-m", "initial commit"]);

    fs::write(path.join("work.txt"), "work\n").expect("write work file");
    run_git(path, &["add", "work.txt"]);
    run_git(path, &["commit", "-m", "branch work"]);
    run_git(path, &["branch", branch]);
}

fn run_git(path: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
