//! CI environment detection.
//!
//! Detection reads an environment map instead of the process environment so
//! callers decide where variables come from.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Context information about the CI environment a run executes in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CiEnvironment {
    /// Whether the run executes in a CI environment.
    pub is_ci: bool,
    /// Provider name (`github`, `gitlab`, `buildkite`, `generic`, `local`).
    pub provider: String,
    /// Branch being built; the target branch for pull requests.
    pub branch: Option<String>,
    /// Whether the build was triggered by a pull request.
    pub is_pr: bool,
    /// Source branch of the pull request.
    pub pr_branch: Option<String>,
    /// Commit being built.
    pub commit: Option<String>,
}

impl Default for CiEnvironment {
    fn default() -> Self {
        Self {
            is_ci: false,
            provider: String::from("local"),
            branch: None,
            is_pr: false,
            pr_branch: None,
            commit: None,
        }
    }
}

impl fmt::Display for CiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let commit = self.commit.as_deref().unwrap_or_default();
        write!(
            f,
            "{}{} on {} ({})",
            self.provider,
            if self.is_pr { "/pr" } else { "" },
            self.branch.as_deref().unwrap_or("<unknown>"),
            commit.get(..7).unwrap_or(commit)
        )
    }
}

impl CiEnvironment {
    /// Detect the CI provider from environment variables.
    #[must_use]
    pub fn detect(env: &HashMap<String, String>) -> Self {
        github(env)
            .or_else(|| gitlab(env))
            .or_else(|| buildkite(env))
            .or_else(|| generic(env))
            .unwrap_or_default()
    }
}

fn var<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn owned(env: &HashMap<String, String>, key: &str) -> Option<String> {
    var(env, key).map(String::from)
}

fn is_true(env: &HashMap<String, String>, key: &str) -> bool {
    var(env, key).is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn github(env: &HashMap<String, String>) -> Option<CiEnvironment> {
    if !is_true(env, "GITHUB_ACTIONS") {
        return None;
    }

    let event = var(env, "GITHUB_EVENT_NAME").unwrap_or_default();
    let is_pr = event == "pull_request" || event == "pull_request_target";
    let branch = if is_pr {
        owned(env, "GITHUB_BASE_REF")
    } else {
        var(env, "GITHUB_REF").map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
    };

    Some(CiEnvironment {
        is_ci: true,
        provider: "github".to_string(),
        branch,
        is_pr,
        pr_branch: if is_pr { owned(env, "GITHUB_HEAD_REF") } else { None },
        commit: owned(env, "GITHUB_SHA"),
    })
}

fn gitlab(env: &HashMap<String, String>) -> Option<CiEnvironment> {
    if !is_true(env, "GITLAB_CI") {
        return None;
    }

    let is_pr = var(env, "CI_MERGE_REQUEST_ID").is_some();
    let branch = if is_pr {
        owned(env, "CI_MERGE_REQUEST_TARGET_BRANCH_NAME")
    } else {
        owned(env, "CI_COMMIT_REF_NAME")
    };

    Some(CiEnvironment {
        is_ci: true,
        provider: "gitlab".to_string(),
        branch,
        is_pr,
        pr_branch: if is_pr {
            owned(env, "CI_MERGE_REQUEST_SOURCE_BRANCH_NAME")
        } else {
            None
        },
        commit: owned(env, "CI_COMMIT_SHA"),
    })
}

fn buildkite(env: &HashMap<String, String>) -> Option<CiEnvironment> {
    if !is_true(env, "BUILDKITE") {
        return None;
    }

    // Buildkite reports "false" instead of leaving the variable unset
    let is_pr = var(env, "BUILDKITE_PULL_REQUEST").is_some_and(|v| v != "false");
    let branch = if is_pr {
        owned(env, "BUILDKITE_PULL_REQUEST_BASE_BRANCH")
    } else {
        owned(env, "BUILDKITE_BRANCH")
    };

    Some(CiEnvironment {
        is_ci: true,
        provider: "buildkite".to_string(),
        branch,
        is_pr,
        pr_branch: if is_pr { owned(env, "BUILDKITE_BRANCH") } else { None },
        commit: owned(env, "BUILDKITE_COMMIT"),
    })
}

fn generic(env: &HashMap<String, String>) -> Option<CiEnvironment> {
    if !is_true(env, "CI") {
        return None;
    }

    Some(CiEnvironment {
        is_ci: true,
        provider: "generic".to_string(),
        branch: owned(env, "BRANCH_NAME").or_else(|| owned(env, "GIT_BRANCH")),
        is_pr: false,
        pr_branch: None,
        commit: owned(env, "GIT_COMMIT"),
    })
}
