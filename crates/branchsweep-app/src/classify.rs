use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use regex::Regex;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use branchsweep_core::branch::{
    Branch, MergeRelation, NameFilter, is_symbolic_head, normalize_name,
};
use branchsweep_core::git::{self, GitError, MergeStatusFilter};
use branchsweep_core::metadata;
use branchsweep_core::probe::{self, ProbeError};

use crate::App;

/// Immutable parameters of one classification run. Editing any parameter in
/// the host means building a new request and starting a new run.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub reference_branch: String,
    pub remote_name: String,
    pub include_remotes: bool,
    pub older_than: Duration,
    pub merge_relation: MergeRelation,
    pattern: Option<Regex>,
}

impl ClassificationRequest {
    pub fn new(
        reference_branch: impl Into<String>,
        remote_name: impl Into<String>,
        include_remotes: bool,
        older_than: Duration,
        merge_relation: MergeRelation,
        pattern: Option<&str>,
    ) -> Result<Self, ClassifyError> {
        let pattern = pattern
            .map(|raw| Regex::new(raw))
            .transpose()
            .map_err(ClassifyError::Pattern)?;

        Ok(Self {
            reference_branch: reference_branch.into(),
            remote_name: remote_name.into(),
            include_remotes,
            older_than,
            merge_relation,
            pattern,
        })
    }

    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    fn name_filter(&self) -> NameFilter {
        NameFilter {
            reference_branch: self.reference_branch.clone(),
            remote_prefix: self
                .include_remotes
                .then(|| format!("{}/", self.remote_name)),
            pattern: self.pattern.clone(),
        }
    }
}

/// Shared cancellation handle. Clones observe the same flag; `cancel` is
/// idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Owns the token of the current run. Starting a new run cancels the
/// previous one, so at most one run per holder can ever deliver results.
#[derive(Debug, Default)]
pub struct Classifier {
    current: Option<CancelToken>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> CancelToken {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let token = CancelToken::new();
        self.current = Some(token.clone());
        token
    }

    pub fn cancel_current(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub branches: Vec<Branch>,
    /// Per-branch probe failures. The affected branches are excluded from
    /// `branches` but the run itself still succeeds.
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classification was cancelled")]
    Cancelled,
    #[error("invalid branch pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Enumerate(#[from] GitError),
}

impl<'a> App<'a> {
    pub fn classify(
        &self,
        repo_root: &Path,
        request: &ClassificationRequest,
        cancel: &CancelToken,
    ) -> Result<Classification, ClassifyError> {
        self.classify_at(repo_root, request, cancel, OffsetDateTime::now_utc())
    }

    /// Classification against an explicit `now`, so staleness is decided
    /// once per run rather than drifting per branch.
    pub fn classify_at(
        &self,
        repo_root: &Path,
        request: &ClassificationRequest,
        cancel: &CancelToken,
        now: OffsetDateTime,
    ) -> Result<Classification, ClassifyError> {
        if cancel.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }

        let mut warnings = Vec::new();
        let raw_names = self.enumerate(repo_root, request, cancel, &mut warnings)?;
        let candidates = request.name_filter().apply(&raw_names);

        if cancel.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }

        let branches = candidates
            .par_iter()
            .map(|name| {
                if cancel.is_cancelled() {
                    return Err(ClassifyError::Cancelled);
                }
                Ok(metadata::load_branch(
                    repo_root,
                    name,
                    now,
                    request.older_than,
                    self.runner,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if cancel.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }

        Ok(Classification { branches, warnings })
    }

    /// Lists candidate names under the merge-relation policy. Output lines
    /// from `NothingToMerge` probing are already normalized; the plain
    /// listings keep their decoration for the shared filter to strip.
    fn enumerate(
        &self,
        repo_root: &Path,
        request: &ClassificationRequest,
        cancel: &CancelToken,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<String>, ClassifyError> {
        let list = |filter: Option<MergeStatusFilter>| {
            git::list_branch_names(repo_root, request.include_remotes, filter, self.runner)
        };

        match request.merge_relation {
            MergeRelation::All => Ok(list(None)?),
            MergeRelation::MergedOnly => Ok(list(Some(MergeStatusFilter::Merged))?),
            MergeRelation::NothingToMerge => {
                let mut names = list(Some(MergeStatusFilter::Merged))?;
                let unmerged = list(Some(MergeStatusFilter::NoMerged))?;

                if cancel.is_cancelled() {
                    return Err(ClassifyError::Cancelled);
                }

                // The symbolic HEAD pointer has no merge-base with anything.
                let unmerged_names: Vec<String> = unmerged
                    .iter()
                    .map(|raw| normalize_name(raw))
                    .filter(|name| !name.is_empty() && !is_symbolic_head(name))
                    .collect();

                let probed = unmerged_names
                    .par_iter()
                    .map(|name| {
                        if cancel.is_cancelled() {
                            return Err(ClassifyError::Cancelled);
                        }
                        let verdict = probe::is_empty_merge(
                            repo_root,
                            name,
                            &request.reference_branch,
                            self.runner,
                        );
                        Ok((name.clone(), verdict))
                    })
                    .collect::<Result<Vec<(String, Result<bool, ProbeError>)>, _>>()?;

                for (name, verdict) in probed {
                    match verdict {
                        Ok(true) => names.push(name),
                        Ok(false) => {}
                        Err(error) => warnings.push(error.to_string()),
                    }
                }

                Ok(names)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn beginning_a_run_cancels_the_previous_one() {
        let mut classifier = Classifier::new();

        let first = classifier.begin();
        let second = classifier.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_current_only_touches_the_active_token() {
        let mut classifier = Classifier::new();
        let token = classifier.begin();

        classifier.cancel_current();
        assert!(token.is_cancelled());

        let fresh = classifier.begin();
        assert!(!fresh.is_cancelled());
    }

    #[test]
    fn request_rejects_invalid_pattern() {
        let result = ClassificationRequest::new(
            "main",
            "origin",
            false,
            Duration::days(30),
            MergeRelation::MergedOnly,
            Some("(["),
        );

        assert!(matches!(result, Err(ClassifyError::Pattern(_))));
    }

    #[test]
    fn remote_prefix_gate_follows_include_remotes() {
        let local_only = ClassificationRequest::new(
            "main",
            "origin",
            false,
            Duration::days(30),
            MergeRelation::MergedOnly,
            None,
        )
        .expect("request");
        assert!(local_only.name_filter().remote_prefix.is_none());

        let with_remotes = ClassificationRequest::new(
            "main",
            "origin",
            true,
            Duration::days(30),
            MergeRelation::MergedOnly,
            None,
        )
        .expect("request");
        assert_eq!(
            with_remotes.name_filter().remote_prefix.as_deref(),
            Some("origin/")
        );
    }
}
