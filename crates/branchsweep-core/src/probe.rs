use std::path::Path;

use thiserror::Error;

use crate::command_runner::CommandRunner;
use crate::git::{self, GitError};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("merge probe for '{branch}' failed: {source}")]
    ProbeFailed {
        branch: String,
        #[source]
        source: GitError,
    },
}

/// Returns true iff forward-merging `from` into `to` would change nothing:
/// the virtual three-way merge of the two branches rooted at their common
/// ancestor produces an empty diff. Runs only read-only inspection commands
/// and is deterministic for a fixed repository state.
pub fn is_empty_merge(
    repo_root: &Path,
    from: &str,
    to: &str,
    runner: &dyn CommandRunner,
) -> Result<bool, ProbeError> {
    let ancestor = git::merge_base(repo_root, to, from, runner).map_err(|source| {
        ProbeError::ProbeFailed {
            branch: from.to_string(),
            source,
        }
    })?;

    let diff = git::merge_tree(repo_root, &ancestor, to, from, runner).map_err(|source| {
        ProbeError::ProbeFailed {
            branch: from.to_string(),
            source,
        }
    })?;

    Ok(diff.trim().is_empty())
}
