//! In-memory collaborators for driving the orchestrator end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use semrel_release::git::GitTag;
use semrel_release::context::HookContext;
use semrel_release::{
    BranchConfig, BumpType, Commit, Error, Hook, NextRelease, Orchestrator, Plugin, PluginRegistry, PluginsConfig,
    ReleaseInfo, ReleaseOptions, Result, SourceControl,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const REPOSITORY_URL: &str = "https://github.com/acme/widget.git";

/// Observable state of the fake repository.
#[derive(Debug, Default)]
pub struct RepoState {
    pub remote_branches: Vec<String>,
    pub branch_tags: HashMap<String, Vec<GitTag>>,
    /// Linear history, oldest first.
    pub history: Vec<Commit>,
    pub current_branch: String,
    pub auth_ok: bool,
    pub up_to_date: bool,
    pub created_tags: Vec<(String, String)>,
    pub pushes: usize,
    pub fetched: Vec<String>,
}

/// Source control over a linear in-memory history.
#[derive(Debug, Clone, Default)]
pub struct FakeRepo(pub Arc<Mutex<RepoState>>);

impl FakeRepo {
    /// Repository checked out on `branch`, pushable and up to date.
    pub fn new(branch: &str) -> Self {
        let repo = Self::default();
        {
            let mut state = repo.state();
            state.current_branch = branch.to_string();
            state.auth_ok = true;
            state.up_to_date = true;
        }
        repo
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, RepoState> {
        self.0.lock().unwrap()
    }

    pub fn with_remote_branches(self, branches: &[&str]) -> Self {
        self.state().remote_branches = branches.iter().map(|b| (*b).to_string()).collect();
        self
    }

    /// Append a commit to the history; it becomes `HEAD`.
    pub fn commit(self, hash: &str, message: &str) -> Self {
        {
            let mut state = self.state();
            let day = u32::try_from(state.history.len() % 28).unwrap() + 1;
            state.history.push(Commit {
                hash: hash.to_string(),
                message: message.to_string(),
                author_name: "Dev".to_string(),
                author_email: "dev@example.com".to_string(),
                committed_at: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            });
        }
        self
    }

    /// Make tag `name` on `commit` reachable from each of `branches`.
    pub fn tag(self, branches: &[&str], name: &str, commit: &str) -> Self {
        {
            let mut state = self.state();
            for branch in branches {
                state.branch_tags.entry((*branch).to_string()).or_default().push(GitTag {
                    name: name.to_string(),
                    commit: commit.to_string(),
                });
            }
        }
        self
    }

    pub fn created_tags(&self) -> Vec<(String, String)> {
        self.state().created_tags.clone()
    }

    pub fn pushes(&self) -> usize {
        self.state().pushes
    }

    fn position(state: &RepoState, hash: &str) -> Option<usize> {
        state.history.iter().position(|c| c.hash == hash)
    }
}

#[async_trait]
impl SourceControl for FakeRepo {
    async fn fetch(&self, _url: &str, branch: &str, _ci_branch: &str) -> Result<()> {
        self.state().fetched.push(branch.to_string());
        Ok(())
    }

    async fn verify_auth(&self, _url: &str, branch: &str) -> Result<()> {
        if self.state().auth_ok {
            Ok(())
        } else {
            Err(Error::git(
                format!("git push --dry-run --no-verify {REPOSITORY_URL} HEAD:{branch}"),
                "Authentication failed",
            ))
        }
    }

    async fn is_branch_up_to_date(&self, _url: &str, _branch: &str) -> Result<bool> {
        Ok(self.state().up_to_date)
    }

    async fn head(&self) -> Result<String> {
        self.state()
            .history
            .last()
            .map(|c| c.hash.clone())
            .ok_or_else(|| Error::git("git rev-parse HEAD", "no commits"))
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.state().current_branch.clone())
    }

    async fn remote_url(&self) -> Result<Option<String>> {
        Ok(Some(REPOSITORY_URL.to_string()))
    }

    async fn remote_branches(&self, _url: &str) -> Result<Vec<String>> {
        Ok(self.state().remote_branches.clone())
    }

    async fn tags_on(&self, branch: &str) -> Result<Vec<GitTag>> {
        Ok(self.state().branch_tags.get(branch).cloned().unwrap_or_default())
    }

    async fn commits(&self, from: Option<&str>, to: &str) -> Result<Vec<Commit>> {
        let state = self.state();
        let Some(end) = Self::position(&state, to) else {
            return Ok(Vec::new());
        };
        let start = from.and_then(|f| Self::position(&state, f)).map_or(0, |p| p + 1);
        Ok(state.history[start.min(end + 1)..=end].iter().rev().cloned().collect())
    }

    async fn tag(&self, name: &str, commit: &str) -> Result<()> {
        let mut state = self.state();
        state.created_tags.push((name.to_string(), commit.to_string()));
        // Tagged commits are part of the checked out branch
        let branch = state.current_branch.clone();
        state.branch_tags.entry(branch).or_default().push(GitTag {
            name: name.to_string(),
            commit: commit.to_string(),
        });
        Ok(())
    }

    async fn push(&self, _url: &str, _branch: &str) -> Result<()> {
        self.state().pushes += 1;
        Ok(())
    }
}

/// What the recording plugin saw.
#[derive(Debug, Default)]
pub struct Recorded {
    calls: Mutex<Vec<Hook>>,
    added: Mutex<Vec<(String, String)>>,
    published: Mutex<Vec<String>>,
    failures: Mutex<Vec<Vec<&'static str>>>,
    success_notes: Mutex<Vec<String>>,
}

/// Plugin recording the hooks it sees; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Recorded>);

impl Recorder {
    pub fn calls(&self) -> Vec<Hook> {
        self.0.calls.lock().unwrap().clone()
    }

    pub fn called(&self, hook: Hook) -> bool {
        self.calls().contains(&hook)
    }

    /// `(tag created, existing tag)` per `addChannel` call.
    pub fn added(&self) -> Vec<(String, String)> {
        self.0.added.lock().unwrap().clone()
    }

    /// Version per `publish` call.
    pub fn published(&self) -> Vec<String> {
        self.0.published.lock().unwrap().clone()
    }

    /// Error codes per `fail` call.
    pub fn failures(&self) -> Vec<Vec<&'static str>> {
        self.0.failures.lock().unwrap().clone()
    }

    /// Notes of the release per `success` call.
    pub fn success_notes(&self) -> Vec<String> {
        self.0.success_notes.lock().unwrap().clone()
    }

    fn record(&self, hook: Hook) {
        self.0.calls.lock().unwrap().push(hook);
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn verify_conditions(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::VerifyConditions);
        Ok(())
    }

    async fn analyze_commits(&self, _ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
        self.record(Hook::AnalyzeCommits);
        Ok(None)
    }

    async fn verify_release(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::VerifyRelease);
        Ok(())
    }

    async fn generate_notes(&self, _ctx: &HookContext<'_>) -> Result<Option<String>> {
        self.record(Hook::GenerateNotes);
        Ok(None)
    }

    async fn prepare(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Prepare);
        Ok(())
    }

    async fn publish(&self, ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        self.record(Hook::Publish);
        let next = pending(ctx, Hook::Publish)?;
        self.0.published.lock().unwrap().push(next.version.to_string());
        Ok(Some(
            ReleaseInfo::named(format!("Widget {}", next.version))
                .with_url(format!("https://example.com/widget/{}", next.version)),
        ))
    }

    async fn add_channel(&self, ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        self.record(Hook::AddChannel);
        let next = pending(ctx, Hook::AddChannel)?;
        let current = ctx.current_release.map(|c| c.git_tag.clone()).unwrap_or_default();
        self.0.added.lock().unwrap().push((next.git_tag.clone(), current));
        Ok(Some(ReleaseInfo::default()))
    }

    async fn success(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Success);
        if let Some(next) = ctx.next_release {
            self.0.success_notes.lock().unwrap().push(next.notes.clone());
        }
        Ok(())
    }

    async fn fail(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Fail);
        self.0
            .failures
            .lock()
            .unwrap()
            .push(ctx.errors.iter().map(|e| e.code()).collect());
        Ok(())
    }
}

fn pending<'a>(ctx: &HookContext<'a>, hook: Hook) -> Result<&'a NextRelease> {
    ctx.next_release
        .ok_or_else(|| Error::plugin("recorder", hook, "no release to process"))
}

/// Options releasing from `branches` of the test repository.
pub fn options(branches: &[&str]) -> ReleaseOptions {
    ReleaseOptions {
        repository_url: Some(REPOSITORY_URL.to_string()),
        branches: branches.iter().map(|b| BranchConfig::named(*b)).collect(),
        ..ReleaseOptions::default()
    }
}

/// GitHub Actions push build of `branch`.
pub fn github_push(branch: &str) -> HashMap<String, String> {
    HashMap::from([
        ("GITHUB_ACTIONS".to_string(), "true".to_string()),
        ("GITHUB_EVENT_NAME".to_string(), "push".to_string()),
        ("GITHUB_REF".to_string(), format!("refs/heads/{branch}")),
    ])
}

/// Orchestrator with the built-in plugins followed by `recorder`.
pub fn orchestrator(repo: &FakeRepo, recorder: &Recorder) -> Orchestrator {
    Orchestrator::new(
        Box::new(repo.clone()),
        PluginRegistry::builtin(&PluginsConfig::default()).with_plugin(Box::new(recorder.clone())),
    )
}
