use std::path::Path;

use branchsweep_core::git;

use crate::App;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Selected branch names exactly as classified (remote names still carry
    /// their `<remote>/` prefix).
    pub branches: Vec<String>,
    pub remote_name: String,
    pub include_remote_branches: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeletePartition {
    /// Remote branch names with the `<remote>/` prefix stripped, ready for
    /// ref-deletion refspecs.
    pub remote: Vec<String>,
    pub local: Vec<String>,
}

/// Splits a selection into the two deletion batches. The split is gated
/// entirely by the flag: with remote deletion off, every selected name
/// goes into the local batch, remote-prefixed or not.
pub fn partition_selection(
    branches: &[String],
    remote_name: &str,
    include_remote_branches: bool,
) -> DeletePartition {
    let prefix = format!("{remote_name}/");
    let mut partition = DeletePartition::default();

    for name in branches {
        match name.strip_prefix(&prefix) {
            Some(stripped) if include_remote_branches => {
                partition.remote.push(stripped.to_string());
            }
            _ => partition.local.push(name.clone()),
        }
    }

    partition
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub branches: Vec<String>,
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one deletion run. Each batch is reported independently; a
/// `None` batch means nothing fell into it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteReport {
    pub remote: Option<BatchOutcome>,
    pub local: Option<BatchOutcome>,
}

impl DeleteReport {
    pub fn deleted_count(&self) -> usize {
        [&self.remote, &self.local]
            .into_iter()
            .flatten()
            .filter(|outcome| outcome.succeeded())
            .map(|outcome| outcome.branches.len())
            .sum()
    }

    pub fn has_errors(&self) -> bool {
        [&self.remote, &self.local]
            .into_iter()
            .flatten()
            .any(|outcome| !outcome.succeeded())
    }

    pub fn is_empty(&self) -> bool {
        self.remote.is_none() && self.local.is_none()
    }
}

impl<'a> App<'a> {
    /// Deletes the selection in at most two batched commands, remote refs
    /// first. Not cancellable once started; a failing batch never prevents
    /// the other from being attempted.
    pub fn delete_branches(&self, repo_root: &Path, request: &DeleteRequest) -> DeleteReport {
        let partition = partition_selection(
            &request.branches,
            &request.remote_name,
            request.include_remote_branches,
        );

        let mut report = DeleteReport::default();

        if !partition.remote.is_empty() {
            let error = git::delete_remote_branches(
                repo_root,
                &request.remote_name,
                &partition.remote,
                self.runner,
            )
            .err()
            .map(|error| error.to_string());
            report.remote = Some(BatchOutcome {
                branches: partition.remote,
                error,
            });
        }

        if !partition.local.is_empty() {
            let error = git::delete_local_branches(repo_root, &partition.local, self.runner)
                .err()
                .map(|error| error.to_string());
            report.local = Some(BatchOutcome {
                branches: partition.local,
                error,
            });
        }

        report
    }
}
