use regex::Regex;
use time::{Duration, OffsetDateTime};

/// One classified branch. `obsolete` is computed once when the branch is
/// loaded and never recomputed within a run; `selected` belongs to the
/// caller and is only ever toggled by the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub last_commit_at: OffsetDateTime,
    pub author: String,
    pub subject: String,
    pub obsolete: bool,
    pub selected: bool,
}

/// Merge-relation policy for one classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeRelation {
    /// Both merged and unmerged branches.
    All,
    /// Only branches already fully merged into the reference.
    #[default]
    MergedOnly,
    /// Merged branches plus unmerged branches whose forward-merge into the
    /// reference would be an empty diff (cherry-picked content, for example).
    NothingToMerge,
}

impl MergeRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MergedOnly => "merged-only",
            Self::NothingToMerge => "nothing-to-merge",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "merged-only" => Some(Self::MergedOnly),
            "nothing-to-merge" => Some(Self::NothingToMerge),
            _ => None,
        }
    }
}

/// Name filter applied uniformly to every enumeration, regardless of the
/// merge-relation policy. All stages are conjunctive and the output
/// preserves input order.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pub reference_branch: String,
    /// `Some("<remote>/")` when only remote branches may pass.
    pub remote_prefix: Option<String>,
    pub pattern: Option<Regex>,
}

impl NameFilter {
    pub fn apply(&self, raw_names: &[String]) -> Vec<String> {
        raw_names
            .iter()
            .map(|raw| normalize_name(raw))
            .filter(|name| !name.is_empty())
            .filter(|name| !is_symbolic_head(name))
            .filter(|name| *name != self.reference_branch)
            .filter(|name| {
                self.remote_prefix
                    .as_deref()
                    .is_none_or(|prefix| name.starts_with(prefix))
            })
            .filter(|name| {
                self.pattern
                    .as_ref()
                    .is_none_or(|pattern| pattern.is_match(name))
            })
            .collect()
    }
}

/// Strips `git branch` decoration: the current-branch marker and any
/// surrounding whitespace or line-ending residue.
pub fn normalize_name(raw: &str) -> String {
    raw.trim_matches(['*', ' ', '\t', '\n', '\r']).to_string()
}

/// The symbolic HEAD pointer, as printed locally (`HEAD`) or in remote
/// listings (`origin/HEAD -> origin/main`).
pub fn is_symbolic_head(name: &str) -> bool {
    name == "HEAD" || name.ends_with("/HEAD") || name.contains("->")
}

/// Strict inequality: a commit exactly at `now - threshold` is NOT obsolete.
pub fn is_obsolete(commit: OffsetDateTime, now: OffsetDateTime, threshold: Duration) -> bool {
    commit < now - threshold
}
