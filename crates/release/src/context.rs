//! Run state and release records.
//!
//! A [`ReleaseContext`] is owned by the caller and passed by `&mut` through
//! every orchestration step. Plugins never see it directly: each hook receives
//! a borrowed [`HookContext`] describing the release it runs for.

use crate::branch::{Branch, ReleaseTag};
use crate::ci::CiEnvironment;
use crate::config::ReleaseOptions;
use crate::error::Error;
use crate::version::BumpType;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Most recent release applicable to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRelease {
    /// Released version.
    pub version: Version,
    /// Channel of the tag the release was found on.
    pub channel: Option<String>,
    /// Tag name.
    pub git_tag: String,
    /// Commit the tag points to.
    pub git_head: String,
    /// Release name (the tag on the default channel).
    pub name: String,
}

/// The release being produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRelease {
    /// Bump kind that produced the version.
    #[serde(rename = "type")]
    pub bump: BumpType,
    /// Channel to publish on.
    pub channel: Option<String>,
    /// Commit being released.
    pub git_head: String,
    /// Version to release.
    pub version: Version,
    /// Tag name on the channel.
    pub git_tag: String,
    /// Release name (the tag on the default channel).
    pub name: String,
    /// Release notes.
    pub notes: String,
}

impl NextRelease {
    /// The branch tag recorded once the release is tagged.
    #[must_use]
    pub fn release_tag(&self) -> ReleaseTag {
        ReleaseTag {
            version: self.version.clone(),
            channel: self.channel.clone(),
            git_tag: self.git_tag.clone(),
            git_head: self.git_head.clone(),
        }
    }
}

/// A published release as reported by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Released version.
    pub version: Version,
    /// Channel the release went to.
    pub channel: Option<String>,
    /// Tag name.
    pub git_tag: String,
    /// Released commit.
    pub git_head: String,
    /// Release name.
    pub name: String,
    /// Plugin that published the release.
    pub plugin_name: String,
    /// Location of the published release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Plugin specific data.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// A release present on a higher branch that must also be tagged on the
/// current branch's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseToAdd {
    /// Release preceding the one being added.
    pub last_release: Option<LastRelease>,
    /// The existing tag.
    pub current_release: ReleaseTag,
    /// The tag to create.
    pub next_release: NextRelease,
}

/// A commit between two points of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Full commit id.
    pub hash: String,
    /// Full commit message.
    pub message: String,
    /// Author name.
    pub author_name: String,
    /// Author e-mail.
    pub author_email: String,
    /// Commit date.
    pub committed_at: DateTime<Utc>,
}

impl Commit {
    /// First line of the message.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Abbreviated commit id.
    #[must_use]
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

/// Result of a run that produced releases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOutcome {
    /// Last release before the run.
    pub last_release: Option<LastRelease>,
    /// Commits since the last release.
    pub commits: Vec<Commit>,
    /// Release of the current branch, absent when only back-ports happened.
    pub next_release: Option<NextRelease>,
    /// Releases published during the run, in order.
    pub releases: Vec<Release>,
}

/// State threaded through one release run.
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    /// Working directory of the repository.
    pub cwd: PathBuf,
    /// Environment variables visible to the run.
    pub env: HashMap<String, String>,
    /// Detected CI environment.
    pub ci: CiEnvironment,
    /// Effective options.
    pub options: ReleaseOptions,
    /// Resolved release lines.
    pub branches: Vec<Branch>,
    /// Index of the branch being released in `branches`.
    pub branch_index: Option<usize>,
    /// Last release of the branch.
    pub last_release: Option<LastRelease>,
    /// Commits since the last release.
    pub commits: Vec<Commit>,
    /// Release being produced.
    pub next_release: Option<NextRelease>,
    /// Releases published so far.
    pub releases: Vec<Release>,
}

impl ReleaseContext {
    /// Create a context, detecting CI from `env`.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, env: HashMap<String, String>, options: ReleaseOptions) -> Self {
        let ci = CiEnvironment::detect(&env);
        Self {
            cwd: cwd.into(),
            env,
            ci,
            options,
            branches: Vec::new(),
            branch_index: None,
            last_release: None,
            commits: Vec::new(),
            next_release: None,
            releases: Vec::new(),
        }
    }

    /// Create a context from the process environment.
    #[must_use]
    pub fn from_process_env(cwd: impl Into<PathBuf>, options: ReleaseOptions) -> Self {
        Self::new(cwd, std::env::vars().collect(), options)
    }

    /// The branch being released.
    #[must_use]
    pub fn branch(&self) -> Option<&Branch> {
        self.branch_index.and_then(|idx| self.branches.get(idx))
    }

    /// Whether side effects are disabled.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Hook view of the current state.
    #[must_use]
    pub fn hook_context(&self) -> HookContext<'_> {
        HookContext {
            cwd: &self.cwd,
            env: &self.env,
            options: &self.options,
            branch: self.branch(),
            branches: &self.branches,
            last_release: self.last_release.as_ref(),
            commits: &self.commits,
            next_release: self.next_release.as_ref(),
            current_release: None,
            releases: &self.releases,
            errors: &[],
        }
    }

    /// Snapshot of the run result.
    #[must_use]
    pub fn outcome(&self) -> ReleaseOutcome {
        ReleaseOutcome {
            last_release: self.last_release.clone(),
            commits: self.commits.clone(),
            next_release: self.next_release.clone(),
            releases: self.releases.clone(),
        }
    }
}

/// Borrowed view of a run handed to plugin hooks.
///
/// Back-ports and the `fail` hook override individual fields with struct
/// update syntax on top of [`ReleaseContext::hook_context`].
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Working directory of the repository.
    pub cwd: &'a Path,
    /// Environment variables.
    pub env: &'a HashMap<String, String>,
    /// Effective options.
    pub options: &'a ReleaseOptions,
    /// Branch being released, absent before branch selection.
    pub branch: Option<&'a Branch>,
    /// All resolved branches.
    pub branches: &'a [Branch],
    /// Release preceding `next_release`.
    pub last_release: Option<&'a LastRelease>,
    /// Commits between `last_release` and `next_release`.
    pub commits: &'a [Commit],
    /// Release being produced.
    pub next_release: Option<&'a NextRelease>,
    /// Existing tag being added to a channel (`addChannel`).
    pub current_release: Option<&'a ReleaseTag>,
    /// Releases published so far.
    pub releases: &'a [Release],
    /// Errors of a failed run (`fail`).
    pub errors: &'a [&'a Error],
}

impl HookContext<'_> {
    /// Whether side effects are disabled.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }
}
