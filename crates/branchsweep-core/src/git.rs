use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::command_adapter;
use crate::command_runner::{CommandOutput, CommandRunner};

/// Merge-status filter applied when listing branches, relative to the
/// checked-out HEAD (`git branch --merged` / `--no-merged`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatusFilter {
    Merged,
    NoMerged,
}

impl MergeStatusFilter {
    fn as_flag(self) -> &'static str {
        match self {
            Self::Merged => "--merged",
            Self::NoMerged => "--no-merged",
        }
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: git {command} (exit {status}) {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("failed to execute git command: {0}")]
    Execute(String),
    #[error("failed to parse git output: {0}")]
    Parse(String),
    #[error("refusing to delete branches that are not fully merged: {stderr}")]
    NotFullyMerged { stderr: String },
}

pub fn repo_root(cwd: &Path, runner: &dyn CommandRunner) -> Result<PathBuf, GitError> {
    let output = run_git_checked(runner, &["rev-parse", "--show-toplevel"], Some(cwd))?;
    Ok(PathBuf::from(first_non_empty_stdout_line(
        &output,
        "git rev-parse returned empty repo root",
    )?))
}

/// Lists branch names exactly as `git branch` prints them: one per line,
/// decoration (`* `, leading spaces) intact. Callers normalize and filter.
pub fn list_branch_names(
    repo_root: &Path,
    include_remotes: bool,
    merge_filter: Option<MergeStatusFilter>,
    runner: &dyn CommandRunner,
) -> Result<Vec<String>, GitError> {
    let mut args = vec!["branch"];
    if include_remotes {
        args.push("-r");
    }
    if let Some(filter) = merge_filter {
        args.push(filter.as_flag());
    }

    let output = run_git_checked(runner, &args, Some(repo_root))?;
    Ok(output.stdout.lines().map(str::to_string).collect())
}

/// Best common ancestor of `to` and `from` (`git merge-base <to> <from>`).
pub fn merge_base(
    repo_root: &Path,
    to: &str,
    from: &str,
    runner: &dyn CommandRunner,
) -> Result<String, GitError> {
    let output = run_git_checked(runner, &["merge-base", to, from], Some(repo_root))?;
    first_non_empty_stdout_line(&output, "git merge-base returned no commit")
}

/// Virtual three-way merge rooted at `ancestor`
/// (`git merge-tree <ancestor> <to> <from>`). Returns the raw diff text.
pub fn merge_tree(
    repo_root: &Path,
    ancestor: &str,
    to: &str,
    from: &str,
    runner: &dyn CommandRunner,
) -> Result<String, GitError> {
    let output = run_git_checked(runner, &["merge-tree", ancestor, to, from], Some(repo_root))?;
    Ok(output.stdout)
}

/// Metadata of the tip commit unique to `branch`
/// (`git log --pretty=%cI%n%an%n%s <branch>^1..<branch>`).
pub fn tip_commit_log(
    repo_root: &Path,
    branch: &str,
    runner: &dyn CommandRunner,
) -> Result<String, GitError> {
    let range = format!("{branch}^1..{branch}");
    let output = run_git_checked(
        runner,
        &["log", "--pretty=%cI%n%an%n%s", range.as_str()],
        Some(repo_root),
    )?;
    Ok(output.stdout)
}

/// Deletes local branches in one batched `git branch -d <n1> <n2> ...`.
/// Safe delete only: git refuses unmerged branches and the refusal is
/// reported, never swallowed.
pub fn delete_local_branches(
    repo_root: &Path,
    names: &[String],
    runner: &dyn CommandRunner,
) -> Result<(), GitError> {
    let mut args = vec!["branch", "-d"];
    args.extend(names.iter().map(String::as_str));

    let output = run_git(runner, &args, Some(repo_root))?;
    if output.status_code == 0 {
        return Ok(());
    }

    if looks_like_branch_not_fully_merged(&output.stderr) {
        return Err(GitError::NotFullyMerged {
            stderr: output.stderr.trim().to_string(),
        });
    }

    Err(GitError::CommandFailed {
        command: args.join(" "),
        status: output.status_code,
        stderr: output.stderr.trim().to_string(),
    })
}

/// Deletes refs on `remote` in one batched
/// `git push <remote> :<n1> :<n2> ...`. Names must already be stripped of
/// the `<remote>/` prefix.
pub fn delete_remote_branches(
    repo_root: &Path,
    remote: &str,
    names: &[String],
    runner: &dyn CommandRunner,
) -> Result<(), GitError> {
    let refspecs: Vec<String> = names.iter().map(|name| format!(":{name}")).collect();
    let mut args = vec!["push", remote];
    args.extend(refspecs.iter().map(String::as_str));

    run_git_checked(runner, &args, Some(repo_root))?;
    Ok(())
}

fn looks_like_branch_not_fully_merged(stderr: &str) -> bool {
    stderr.to_lowercase().contains("not fully merged")
}

fn first_non_empty_stdout_line(output: &CommandOutput, message: &str) -> Result<String, GitError> {
    output
        .stdout
        .lines()
        .next()
        .and_then(|line| {
            let trimmed = line.trim();
            (!trimmed.is_empty()).then_some(trimmed.to_string())
        })
        .ok_or_else(|| GitError::Parse(message.to_string()))
}

fn run_git_checked(
    runner: &dyn CommandRunner,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<CommandOutput, GitError> {
    let output = run_git(runner, args, cwd)?;
    command_adapter::ensure_success(args, output).map_err(|failure| GitError::CommandFailed {
        command: failure.command,
        status: failure.status,
        stderr: failure.stderr,
    })
}

fn run_git(
    runner: &dyn CommandRunner,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<CommandOutput, GitError> {
    command_adapter::run_program(runner, "git", args, cwd).map_err(GitError::Execute)
}
