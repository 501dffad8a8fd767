//! Conventional commit analysis.
//!
//! Uses the `git-conventional` crate to parse commit messages following the
//! Conventional Commits format.

use crate::context::{Commit, HookContext};
use crate::error::Result;
use crate::plugins::Plugin;
use crate::version::BumpType;
use async_trait::async_trait;
use tracing::{debug, info};

/// A parsed conventional commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    /// The commit type (feat, fix, chore, etc.)
    pub commit_type: String,
    /// Optional scope
    pub scope: Option<String>,
    /// Whether this is a breaking change
    pub breaking: bool,
    /// The commit description (first line after type)
    pub description: String,
    /// Description of the breaking change, from the `BREAKING CHANGE` footer
    pub breaking_description: Option<String>,
    /// The full commit hash
    pub hash: String,
}

impl ConventionalCommit {
    /// Parse a commit message; `None` when it is not a conventional commit.
    #[must_use]
    pub fn parse(commit: &Commit) -> Option<Self> {
        let parsed = git_conventional::Commit::parse(commit.message.trim()).ok()?;
        Some(Self {
            commit_type: parsed.type_().as_str().to_lowercase(),
            scope: parsed.scope().map(|s| s.to_string()),
            breaking: parsed.breaking(),
            description: parsed.description().to_string(),
            breaking_description: parsed
                .breaking_description()
                .filter(|d| *d != parsed.description())
                .map(String::from),
            hash: commit.hash.clone(),
        })
    }

    /// Bump warranted by this commit.
    #[must_use]
    pub fn bump_type(&self) -> Option<BumpType> {
        if self.breaking {
            return Some(BumpType::Major);
        }

        match self.commit_type.as_str() {
            "feat" => Some(BumpType::Minor),
            "fix" | "perf" => Some(BumpType::Patch),
            _ => None,
        }
    }
}

/// Highest bump warranted by `commits`.
///
/// Commits that do not follow the convention are ignored.
#[must_use]
pub fn aggregate_bump(commits: &[Commit]) -> Option<BumpType> {
    commits
        .iter()
        .filter_map(|commit| {
            let parsed = ConventionalCommit::parse(commit);
            if parsed.is_none() {
                debug!(commit = commit.short_hash(), subject = commit.subject(), "Skipping non-conventional commit");
            }
            parsed
        })
        .filter_map(|commit| commit.bump_type())
        .max()
}

/// Determines the bump type from conventional commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitAnalyzer;

impl CommitAnalyzer {
    /// Creates the analyzer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for CommitAnalyzer {
    fn name(&self) -> &str {
        "commit-analyzer"
    }

    async fn analyze_commits(&self, ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
        let bump = aggregate_bump(ctx.commits);
        match bump {
            Some(bump) => info!(commits = ctx.commits.len(), %bump, "Analysis of commits complete"),
            None => info!(commits = ctx.commits.len(), "Analysis of commits complete: no release"),
        }
        Ok(bump)
    }
}
