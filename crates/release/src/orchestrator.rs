//! Release orchestrator.
//!
//! Drives one release run: environment gating, branch resolution, back-ports
//! of releases published on higher branches, then the release of the current
//! branch itself.
//!
//! The run is strictly sequential. Every collaborator call is awaited before
//! the next one is issued, and back-ports are applied one at a time because
//! each one appends to the branch's tag list.

use crate::branch::{RawBranch, ReleaseTag, expand, resolve};
use crate::context::{HookContext, NextRelease, ReleaseContext, ReleaseOutcome, ReleaseToAdd};
use crate::error::{Error, ErrorCollector, Result, sort_for_report};
use crate::gap::{last_release, releases_to_add};
use crate::git::{SourceControl, auth_url, redact_url};
use crate::plugins::PluginRegistry;
use crate::tag::TagFormat;
use crate::version::{next_version, validate_next_version};
use tracing::{debug, error, info, warn};

/// Release orchestrator.
///
/// Owns the collaborators of a run; the run state lives in the
/// [`ReleaseContext`] handed to [`Orchestrator::run`].
pub struct Orchestrator {
    scm: Box<dyn SourceControl>,
    plugins: PluginRegistry,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

/// Repository coordinates shared by the steps of one run.
struct Target {
    /// Authenticated URL used for git transport.
    url: String,
    /// The same URL without credentials, for messages.
    display_url: String,
    /// Branch the run was triggered on.
    branch: String,
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(scm: Box<dyn SourceControl>, plugins: PluginRegistry) -> Self {
        Self { scm, plugins }
    }

    /// Returns the plugin registry.
    #[must_use]
    pub const fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Run a release.
    ///
    /// Returns `Ok(None)` when no release happened: not a release branch, a
    /// pull request, a stale local branch or no relevant commits without
    /// back-ports. On failure the `fail` hook runs (outside dry-run) before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Returns configuration, branch, version, git and plugin errors. Several
    /// invalid back-ports are reported together as [`Error::Multiple`].
    pub async fn run(&self, ctx: &mut ReleaseContext) -> Result<Option<ReleaseOutcome>> {
        match self.release(ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.report_failure(ctx, &err).await;
                Err(err)
            }
        }
    }

    async fn release(&self, ctx: &mut ReleaseContext) -> Result<Option<ReleaseOutcome>> {
        if !self.check_environment(ctx) {
            return Ok(None);
        }

        let tag_format = self.verify_options(ctx).await?;
        let Some(target) = self.select_branch(ctx, &tag_format).await? else {
            return Ok(None);
        };
        let Some(index) = ctx.branch_index else {
            return Ok(None);
        };

        if !self.verify_permission(ctx, &target).await? {
            return Ok(None);
        }

        self.plugins.verify_conditions(&ctx.hook_context()).await?;

        let mut errors = ErrorCollector::new();
        for release in releases_to_add(index, &ctx.branches, &tag_format) {
            self.add_channel(ctx, index, &target, release, &mut errors).await?;
        }
        errors.finish()?;

        let head = self.scm.head().await?;
        ctx.last_release = last_release(&ctx.branches[index], &tag_format, None);
        match &ctx.last_release {
            Some(last) => info!(version = %last.version, tag = %last.git_tag, "Found last release"),
            None => info!("No previous release found, retrieving all commits"),
        }
        ctx.commits = self
            .scm
            .commits(ctx.last_release.as_ref().map(|l| l.git_head.as_str()), &head)
            .await?;
        info!(count = ctx.commits.len(), "Found commits since last release");

        let Some(bump) = self.plugins.analyze_commits(&ctx.hook_context()).await? else {
            info!("There are no relevant changes, so no new version is released");
            return Ok((!ctx.releases.is_empty()).then(|| ctx.outcome()));
        };

        let branch = &ctx.branches[index];
        let version = next_version(branch, ctx.last_release.as_ref(), bump, &ctx.options.initial_version)?;
        if !branch.is_prerelease() {
            validate_next_version(branch, &ctx.branches, &version, bump)?;
        }
        let next = NextRelease {
            bump,
            channel: branch.channel.clone(),
            git_head: head,
            git_tag: tag_format.render(&version, branch.channel.as_deref()),
            name: tag_format.render(&version, None),
            version,
            notes: String::new(),
        };
        info!(
            version = %next.version,
            bump = %bump,
            channel = next.channel.as_deref().unwrap_or("default"),
            "The next release version is computed"
        );
        let tag = next.release_tag();
        ctx.next_release = Some(next);

        self.plugins.verify_release(&ctx.hook_context()).await?;
        let notes = self.plugins.generate_notes(&ctx.hook_context()).await?;
        if let Some(next) = ctx.next_release.as_mut() {
            next.notes = notes;
        }

        if ctx.is_dry_run() {
            info!(tag = %tag.git_tag, "Skip tag creation in dry-run mode");
            return Ok(Some(ctx.outcome()));
        }

        self.plugins.prepare(&ctx.hook_context()).await?;

        // Publishers may rely on the tag being on the remote already
        self.scm.tag(&tag.git_tag, &tag.git_head).await?;
        self.scm.push(&target.url, &target.branch).await?;
        info!(tag = %tag.git_tag, "Created tag");
        ctx.branches[index].tags.push(tag);

        let published = self.plugins.publish(&ctx.hook_context()).await?;
        ctx.releases.extend(published);
        self.plugins.success(&ctx.hook_context()).await?;

        info!(releases = ctx.releases.len(), "Release run complete");
        Ok(Some(ctx.outcome()))
    }

    /// Apply the CI gates; `false` ends the run without a release.
    fn check_environment(&self, ctx: &mut ReleaseContext) -> bool {
        info!(ci = %ctx.ci, plugins = ?self.plugins.names(), "Starting release run");
        if !ctx.options.ci {
            return true;
        }
        if !ctx.ci.is_ci && !ctx.options.dry_run {
            warn!("This run was not triggered in a known CI environment, running in dry-run mode");
            ctx.options.dry_run = true;
        }
        if ctx.ci.is_pr {
            info!(
                provider = %ctx.ci.provider,
                "This run was triggered by a pull request and therefore a new version won't be published"
            );
            return false;
        }
        true
    }

    /// Complete the repository URL and verify the options.
    async fn verify_options(&self, ctx: &mut ReleaseContext) -> Result<TagFormat> {
        if ctx.options.repository_url.is_none() {
            ctx.options.repository_url = self.scm.remote_url().await?;
        }
        ctx.options.verify()
    }

    /// Fetch and resolve branches, and select the one being released.
    ///
    /// `None` when the current branch is not a configured release line.
    async fn select_branch(&self, ctx: &mut ReleaseContext, tag_format: &TagFormat) -> Result<Option<Target>> {
        let display_url = ctx.options.repository_url.clone().ok_or(Error::NoRepositoryUrl)?;
        let url = auth_url(&display_url, &ctx.env);
        let display_url = redact_url(&display_url);

        let branch = match &ctx.ci.branch {
            Some(branch) => branch.clone(),
            None => self.scm.current_branch().await?,
        };

        let remote = self.scm.remote_branches(&url).await?;
        let configs = expand(&ctx.options.branches, &remote)?;
        for config in &configs {
            self.scm.fetch(&url, &config.name, &branch).await?;
        }

        let mut raw = Vec::with_capacity(configs.len());
        for config in configs {
            let tags: Vec<ReleaseTag> = self
                .scm
                .tags_on(&config.name)
                .await?
                .into_iter()
                .filter_map(|tag| {
                    let Some((version, channel)) = tag_format.parse(&tag.name) else {
                        debug!(tag = %tag.name, "Ignoring tag not matching the tag format");
                        return None;
                    };
                    Some(ReleaseTag {
                        version,
                        channel,
                        git_tag: tag.name,
                        git_head: tag.commit,
                    })
                })
                .collect();
            debug!(branch = %config.name, tags = tags.len(), "Read branch tags");
            raw.push(RawBranch { config, tags });
        }

        ctx.branches = resolve(raw, &ctx.options.initial_version)?;
        ctx.branch_index = ctx.branches.iter().position(|b| b.name == branch);
        if ctx.branch_index.is_none() {
            let configured: Vec<&str> = ctx.branches.iter().map(|b| b.name.as_str()).collect();
            info!(
                %branch,
                configured = ?configured,
                "This run was triggered on a branch that is not configured for releases, therefore a new version won't be published"
            );
            return Ok(None);
        }

        info!(%branch, url = %display_url, "Running release on branch");
        Ok(Some(Target {
            url,
            display_url,
            branch,
        }))
    }

    /// Check push permission; `false` ends the run because the local branch is stale.
    async fn verify_permission(&self, ctx: &ReleaseContext, target: &Target) -> Result<bool> {
        let Err(source) = self.scm.verify_auth(&target.url, &target.branch).await else {
            debug!(branch = %target.branch, "Allowed to push to the repository");
            return Ok(true);
        };

        if !self.scm.is_branch_up_to_date(&target.url, &target.branch).await? {
            warn!(
                branch = %target.branch,
                "The local branch is behind the remote one, therefore a new version won't be published"
            );
            return Ok(false);
        }

        if ctx.is_dry_run() {
            warn!(
                url = %target.display_url,
                error = %source,
                "Cannot push to the repository, continuing because of dry-run mode"
            );
            return Ok(true);
        }

        Err(Error::NoGitPermission {
            url: target.display_url.clone(),
            branch: target.branch.clone(),
            source: Box::new(source),
        })
    }

    /// Tag a release of a higher branch on the channel of the branch at `index`.
    ///
    /// Merge range violations are collected in `errors` and the release is skipped.
    async fn add_channel(
        &self,
        ctx: &mut ReleaseContext,
        index: usize,
        target: &Target,
        release: ReleaseToAdd,
        errors: &mut ErrorCollector,
    ) -> Result<()> {
        let ReleaseToAdd {
            last_release,
            current_release,
            mut next_release,
        } = release;

        let branch = &ctx.branches[index];
        if let Some(merge_range) = &branch.merge_range {
            if !merge_range.satisfies(&next_release.version) {
                warn!(
                    branch = %branch.name,
                    version = %next_release.version,
                    "Release is out of the merge range of the branch"
                );
                errors.push(Error::InvalidMergeRange {
                    branch: branch.name.clone(),
                    version: next_release.version.to_string(),
                    git_tag: current_release.git_tag.clone(),
                    merge_range: merge_range.to_string(),
                });
                return Ok(());
            }
        }

        let commits = self
            .scm
            .commits(
                last_release.as_ref().map(|l| l.git_head.as_str()),
                &current_release.git_head,
            )
            .await?;

        next_release.notes = self
            .plugins
            .generate_notes(&HookContext {
                last_release: last_release.as_ref(),
                commits: &commits,
                next_release: Some(&next_release),
                current_release: Some(&current_release),
                ..ctx.hook_context()
            })
            .await?;

        if ctx.is_dry_run() {
            info!(tag = %next_release.git_tag, "Skip tag creation in dry-run mode");
        } else {
            self.scm.tag(&next_release.git_tag, &next_release.git_head).await?;
            self.scm.push(&target.url, &target.branch).await?;
            info!(
                tag = %next_release.git_tag,
                channel = next_release.channel.as_deref().unwrap_or("default"),
                "Added channel to release"
            );
            ctx.branches[index].tags.push(next_release.release_tag());
        }

        let base = HookContext {
            last_release: last_release.as_ref(),
            commits: &commits,
            next_release: Some(&next_release),
            current_release: Some(&current_release),
            ..ctx.hook_context()
        };
        let added = self.plugins.add_channel(&base).await?;
        self.plugins
            .success(&HookContext {
                releases: &added,
                ..base
            })
            .await?;
        ctx.releases.extend(added);
        Ok(())
    }

    /// Hand the errors of a failed run to the `fail` hook.
    async fn report_failure(&self, ctx: &ReleaseContext, err: &Error) {
        if ctx.is_dry_run() {
            return;
        }
        let mut errors = err.errors();
        sort_for_report(&mut errors);
        let hook_ctx = HookContext {
            errors: &errors,
            ..ctx.hook_context()
        };
        if let Err(fail_error) = self.plugins.fail(&hook_ctx).await {
            error!(error = %fail_error, "The fail hook failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseOptions;
    use crate::context::Commit;
    use crate::git::GitTag;
    use crate::plugins::{Hook, Plugin};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Source control without a repository: every call fails.
    struct NoRepository;

    #[async_trait]
    impl SourceControl for NoRepository {
        async fn fetch(&self, _url: &str, _branch: &str, _ci_branch: &str) -> Result<()> {
            Err(Error::git("git fetch", "not a git repository"))
        }
        async fn verify_auth(&self, _url: &str, _branch: &str) -> Result<()> {
            Err(Error::git("git push", "not a git repository"))
        }
        async fn is_branch_up_to_date(&self, _url: &str, _branch: &str) -> Result<bool> {
            Err(Error::git("git ls-remote", "not a git repository"))
        }
        async fn head(&self) -> Result<String> {
            Err(Error::git("git rev-parse", "not a git repository"))
        }
        async fn current_branch(&self) -> Result<String> {
            Err(Error::git("git rev-parse", "not a git repository"))
        }
        async fn remote_url(&self) -> Result<Option<String>> {
            Err(Error::git("git config", "not a git repository"))
        }
        async fn remote_branches(&self, _url: &str) -> Result<Vec<String>> {
            Err(Error::git("git ls-remote", "not a git repository"))
        }
        async fn tags_on(&self, _branch: &str) -> Result<Vec<GitTag>> {
            Err(Error::git("git for-each-ref", "not a git repository"))
        }
        async fn commits(&self, _from: Option<&str>, _to: &str) -> Result<Vec<Commit>> {
            Err(Error::git("git log", "not a git repository"))
        }
        async fn tag(&self, _name: &str, _commit: &str) -> Result<()> {
            Err(Error::git("git tag", "not a git repository"))
        }
        async fn push(&self, _url: &str, _branch: &str) -> Result<()> {
            Err(Error::git("git push", "not a git repository"))
        }
    }

    #[derive(Default)]
    struct FailRecorder {
        codes: Mutex<Vec<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Plugin for Arc<FailRecorder> {
        fn name(&self) -> &str {
            "fail-recorder"
        }

        async fn fail(&self, ctx: &HookContext<'_>) -> Result<()> {
            self.codes
                .lock()
                .unwrap()
                .push(ctx.errors.iter().map(|e| e.code()).collect());
            Err(Error::plugin("fail-recorder", Hook::Fail, "cannot report"))
        }
    }

    fn orchestrator(recorder: &Arc<FailRecorder>) -> Orchestrator {
        Orchestrator::new(
            Box::new(NoRepository),
            PluginRegistry::new().with_plugin(Box::new(recorder.clone())),
        )
    }

    fn ci_env(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut env = HashMap::from([
            ("GITHUB_ACTIONS".to_string(), "true".to_string()),
            ("GITHUB_REF".to_string(), "refs/heads/main".to_string()),
            ("GITHUB_EVENT_NAME".to_string(), "push".to_string()),
        ]);
        env.extend(extra.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        env
    }

    #[tokio::test]
    async fn test_pull_request_is_not_released() {
        let recorder = Arc::new(FailRecorder::default());
        let env = ci_env(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_HEAD_REF", "feature"),
            ("GITHUB_BASE_REF", "main"),
        ]);
        let mut ctx = ReleaseContext::new(".", env, ReleaseOptions::default());

        let outcome = orchestrator(&recorder).run(&mut ctx).await.unwrap();
        assert!(outcome.is_none());
        assert!(ctx.branches.is_empty());
    }

    #[tokio::test]
    async fn test_local_run_is_forced_to_dry_run() {
        let recorder = Arc::new(FailRecorder::default());
        let mut ctx = ReleaseContext::new(".", HashMap::new(), ReleaseOptions::default());

        let err = orchestrator(&recorder).run(&mut ctx).await.unwrap_err();
        assert_eq!(err.code(), "EGIT");
        assert!(ctx.is_dry_run());
        // No fail hook in dry-run
        assert!(recorder.codes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_hook_receives_flattened_errors() {
        let recorder = Arc::new(FailRecorder::default());
        let options = ReleaseOptions {
            repository_url: Some(String::new()),
            tag_format: "release".to_string(),
            ..ReleaseOptions::default()
        };
        let mut ctx = ReleaseContext::new(".", ci_env(&[]), options);

        // The failing fail hook does not replace the original error
        let err = orchestrator(&recorder).run(&mut ctx).await.unwrap_err();
        assert_eq!(err.code(), "EMULTIPLE");
        assert!(!ctx.is_dry_run());
        assert_eq!(
            *recorder.codes.lock().unwrap(),
            vec![vec!["ENOREPOURL", "EINVALIDTAGFORMAT"]]
        );
    }

    #[tokio::test]
    async fn test_git_failure_reaches_fail_hook() {
        let recorder = Arc::new(FailRecorder::default());
        let mut ctx = ReleaseContext::new(".", ci_env(&[]), ReleaseOptions::default());

        let err = orchestrator(&recorder).run(&mut ctx).await.unwrap_err();
        assert_eq!(err.code(), "EGIT");
        assert_eq!(*recorder.codes.lock().unwrap(), vec![vec!["EGIT"]]);
    }
}
