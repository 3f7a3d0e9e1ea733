use std::path::Path;

use time::{Duration, OffsetDateTime};

use crate::branch::{Branch, is_obsolete};
use crate::command_runner::CommandRunner;
use crate::git;
use crate::time::parse_commit_timestamp;

/// Loads the tip-commit metadata for one branch and classifies staleness.
///
/// Never fails the run: a failed log command or an unreadable timestamp
/// defaults to the Unix epoch, which classifies the branch as obsolete
/// (epoch predates any threshold). Cleanup candidates with broken metadata
/// are deliberately shown rather than hidden. Author and subject default to
/// empty strings when absent.
pub fn load_branch(
    repo_root: &Path,
    name: &str,
    now: OffsetDateTime,
    threshold: Duration,
    runner: &dyn CommandRunner,
) -> Branch {
    let raw = git::tip_commit_log(repo_root, name, runner).unwrap_or_default();
    let mut lines = raw.lines();

    let last_commit_at = lines
        .next()
        .and_then(parse_commit_timestamp)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let author = lines.next().unwrap_or_default().trim().to_string();
    let subject = lines.next().unwrap_or_default().trim().to_string();

    Branch {
        name: name.to_string(),
        last_commit_at,
        author,
        subject,
        obsolete: is_obsolete(last_commit_at, now, threshold),
        selected: false,
    }
}
