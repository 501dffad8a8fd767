//! Plugin hooks and their sequencing.
//!
//! This module defines the [`Plugin`] trait that release steps are
//! implemented against, and the [`PluginRegistry`] that runs every registered
//! plugin for a hook.
//!
//! # Architecture
//!
//! - [`Plugin`] - one async method per hook, each defaulting to a no-op
//! - [`PluginRegistry`] - runs a hook across plugins in registration order
//! - [`ReleaseInfo`] - what `publish` and `addChannel` report back
//!
//! Built-in plugins:
//! - [`CommitAnalyzer`] - conventional-commit bump detection
//! - [`ReleaseNotesGenerator`] - Markdown release notes
//! - [`Exec`] - shell commands per hook
//!
//! # Example
//!
//! ```rust,ignore
//! use semrel_release::plugins::{Plugin, ReleaseInfo};
//!
//! struct Announce;
//!
//! #[async_trait::async_trait]
//! impl Plugin for Announce {
//!     fn name(&self) -> &str { "announce" }
//!
//!     async fn publish(&self, ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
//!         // Upload somewhere...
//!         Ok(Some(ReleaseInfo::named("Announcement")))
//!     }
//! }
//! ```

mod commit_analyzer;
mod exec;
mod notes;

pub use commit_analyzer::{CommitAnalyzer, ConventionalCommit};
pub use exec::Exec;
pub use notes::ReleaseNotesGenerator;

use crate::config::PluginsConfig;
use crate::context::{HookContext, NextRelease, Release};
use crate::error::{Error, ErrorCollector, Result};
use crate::version::BumpType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Extension points of a release run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Check preconditions before anything happens.
    VerifyConditions,
    /// Determine the bump type from the commits.
    AnalyzeCommits,
    /// Check the computed release.
    VerifyRelease,
    /// Produce release notes.
    GenerateNotes,
    /// Prepare artifacts before tagging.
    Prepare,
    /// Publish the release.
    Publish,
    /// Make an existing release available on another channel.
    AddChannel,
    /// Report a successful release.
    Success,
    /// Report a failed run.
    Fail,
}

impl Hook {
    /// Hook name as used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerifyConditions => "verifyConditions",
            Self::AnalyzeCommits => "analyzeCommits",
            Self::VerifyRelease => "verifyRelease",
            Self::GenerateNotes => "generateNotes",
            Self::Prepare => "prepare",
            Self::Publish => "publish",
            Self::AddChannel => "addChannel",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    /// Whether the hook runs in dry-run mode.
    #[must_use]
    pub const fn runs_in_dry_run(self) -> bool {
        matches!(
            self,
            Self::VerifyConditions | Self::AnalyzeCommits | Self::VerifyRelease | Self::GenerateNotes
        )
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release details reported by `publish` and `addChannel`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseInfo {
    /// Release name, defaults to the release's tag on the default channel.
    pub name: Option<String>,
    /// Location of the published release.
    pub url: Option<String>,
    /// Plugin specific data.
    pub data: serde_json::Value,
}

impl ReleaseInfo {
    /// Info carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn into_release(self, plugin: &str, next: &NextRelease) -> Release {
        Release {
            version: next.version.clone(),
            channel: next.channel.clone(),
            git_tag: next.git_tag.clone(),
            git_head: next.git_head.clone(),
            name: self.name.unwrap_or_else(|| next.name.clone()),
            plugin_name: plugin.to_string(),
            url: self.url,
            data: self.data,
        }
    }
}

/// A release plugin.
///
/// Every hook defaults to doing nothing; implement the ones the plugin
/// participates in.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs, errors and release records.
    fn name(&self) -> &str;

    /// Check preconditions, such as credentials.
    async fn verify_conditions(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Bump type warranted by `ctx.commits`, `None` for no release.
    async fn analyze_commits(&self, _ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
        Ok(None)
    }

    /// Check `ctx.next_release` before it is published.
    async fn verify_release(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Notes for `ctx.next_release`.
    async fn generate_notes(&self, _ctx: &HookContext<'_>) -> Result<Option<String>> {
        Ok(None)
    }

    /// Prepare the release; runs before the tag is created.
    async fn prepare(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Publish `ctx.next_release`; runs after the tag is pushed.
    async fn publish(&self, _ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        Ok(None)
    }

    /// Make `ctx.current_release` available on the channel of `ctx.next_release`.
    async fn add_channel(&self, _ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        Ok(None)
    }

    /// Report `ctx.releases`.
    async fn success(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Report `ctx.errors`.
    async fn fail(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Ordered set of plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins enabled in `config`.
    #[must_use]
    pub fn builtin(config: &PluginsConfig) -> Self {
        let mut registry = Self::new();
        if config.commit_analyzer {
            registry.register(Box::new(CommitAnalyzer::new()));
        }
        if config.release_notes_generator {
            registry.register(Box::new(ReleaseNotesGenerator::new()));
        }
        if let Some(exec) = &config.exec {
            registry.register(Box::new(Exec::new(exec.clone())));
        }
        registry
    }

    /// Adds a plugin to the registry.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.register(plugin);
        self
    }

    /// Adds a plugin to the registry.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        debug!(plugin = plugin.name(), "Registered plugin");
        self.plugins.push(plugin);
    }

    /// Names of the registered plugins, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn skipped(hook: Hook, ctx: &HookContext<'_>) -> bool {
        let skip = ctx.is_dry_run() && !hook.runs_in_dry_run();
        if skip {
            debug!(%hook, "Skipping hook in dry-run mode");
        }
        skip
    }

    /// Run `verifyConditions` on every plugin.
    ///
    /// # Errors
    ///
    /// Returns the collected failures of all plugins.
    pub async fn verify_conditions(&self, ctx: &HookContext<'_>) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), hook = %Hook::VerifyConditions, "Start step");
            errors.record(plugin.verify_conditions(ctx).await);
        }
        errors.finish()
    }

    /// Run `analyzeCommits` on every plugin and keep the highest bump.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    pub async fn analyze_commits(&self, ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
        let mut bump = None;
        for plugin in &self.plugins {
            let result = plugin.analyze_commits(ctx).await?;
            if let Some(result) = result {
                debug!(plugin = plugin.name(), bump = %result, "Analyzed commits");
            }
            bump = bump.max(result);
        }
        Ok(bump)
    }

    /// Run `verifyRelease` on every plugin.
    ///
    /// # Errors
    ///
    /// Returns the collected failures of all plugins.
    pub async fn verify_release(&self, ctx: &HookContext<'_>) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), hook = %Hook::VerifyRelease, "Start step");
            errors.record(plugin.verify_release(ctx).await);
        }
        errors.finish()
    }

    /// Run `generateNotes` on every plugin and join the notes.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    pub async fn generate_notes(&self, ctx: &HookContext<'_>) -> Result<String> {
        let mut notes = Vec::new();
        for plugin in &self.plugins {
            if let Some(text) = plugin.generate_notes(ctx).await? {
                let text = text.trim();
                if !text.is_empty() {
                    notes.push(text.to_string());
                }
            }
        }
        Ok(notes.join("\n\n"))
    }

    /// Run `prepare` on every plugin, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    pub async fn prepare(&self, ctx: &HookContext<'_>) -> Result<()> {
        if Self::skipped(Hook::Prepare, ctx) {
            return Ok(());
        }
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), hook = %Hook::Prepare, "Start step");
            plugin.prepare(ctx).await?;
        }
        Ok(())
    }

    /// Run `publish` on every plugin and collect the releases they report.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    pub async fn publish(&self, ctx: &HookContext<'_>) -> Result<Vec<Release>> {
        if Self::skipped(Hook::Publish, ctx) {
            return Ok(Vec::new());
        }
        let next = Self::require_next(ctx, Hook::Publish)?;
        let mut releases = Vec::new();
        for plugin in &self.plugins {
            if let Some(info) = plugin.publish(ctx).await? {
                let release = info.into_release(plugin.name(), next);
                info!(plugin = plugin.name(), release = %release.name, url = ?release.url, "Published release");
                releases.push(release);
            }
        }
        Ok(releases)
    }

    /// Run `addChannel` on every plugin and collect the releases they report.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    pub async fn add_channel(&self, ctx: &HookContext<'_>) -> Result<Vec<Release>> {
        if Self::skipped(Hook::AddChannel, ctx) {
            return Ok(Vec::new());
        }
        let next = Self::require_next(ctx, Hook::AddChannel)?;
        let mut releases = Vec::new();
        for plugin in &self.plugins {
            if let Some(info) = plugin.add_channel(ctx).await? {
                let release = info.into_release(plugin.name(), next);
                info!(
                    plugin = plugin.name(),
                    release = %release.name,
                    channel = ?release.channel,
                    "Added release to channel"
                );
                releases.push(release);
            }
        }
        Ok(releases)
    }

    /// Run `success` on every plugin.
    ///
    /// # Errors
    ///
    /// Returns the collected failures of all plugins.
    pub async fn success(&self, ctx: &HookContext<'_>) -> Result<()> {
        if Self::skipped(Hook::Success, ctx) {
            return Ok(());
        }
        let mut errors = ErrorCollector::new();
        for plugin in &self.plugins {
            errors.record(plugin.success(ctx).await);
        }
        errors.finish()
    }

    /// Run `fail` on every plugin.
    ///
    /// # Errors
    ///
    /// Returns the collected failures of all plugins.
    pub async fn fail(&self, ctx: &HookContext<'_>) -> Result<()> {
        if Self::skipped(Hook::Fail, ctx) {
            return Ok(());
        }
        let mut errors = ErrorCollector::new();
        for plugin in &self.plugins {
            errors.record(plugin.fail(ctx).await);
        }
        errors.finish()
    }

    fn require_next<'a>(ctx: &HookContext<'a>, hook: Hook) -> Result<&'a NextRelease> {
        ctx.next_release
            .ok_or_else(|| Error::plugin("registry", hook, "no release to process"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseOptions;
    use semver::Version;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        bump: Option<BumpType>,
        notes: Option<&'static str>,
        fail_verify: bool,
        calls: Mutex<Vec<Hook>>,
    }

    impl Recording {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                bump: None,
                notes: None,
                fail_verify: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Hook> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, hook: Hook) {
            self.calls.lock().unwrap().push(hook);
        }
    }

    #[async_trait]
    impl Plugin for std::sync::Arc<Recording> {
        fn name(&self) -> &str {
            self.name
        }

        async fn verify_conditions(&self, _ctx: &HookContext<'_>) -> Result<()> {
            self.record(Hook::VerifyConditions);
            if self.fail_verify {
                return Err(Error::plugin_with_code(self.name, Hook::VerifyConditions, "missing token", "ENOTOKEN"));
            }
            Ok(())
        }

        async fn analyze_commits(&self, _ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
            self.record(Hook::AnalyzeCommits);
            Ok(self.bump)
        }

        async fn generate_notes(&self, _ctx: &HookContext<'_>) -> Result<Option<String>> {
            self.record(Hook::GenerateNotes);
            Ok(self.notes.map(String::from))
        }

        async fn prepare(&self, _ctx: &HookContext<'_>) -> Result<()> {
            self.record(Hook::Prepare);
            Ok(())
        }

        async fn publish(&self, _ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
            self.record(Hook::Publish);
            Ok(Some(ReleaseInfo::named(format!("{} release", self.name)).with_url("https://example.com/r/1")))
        }
    }

    fn next_release() -> NextRelease {
        NextRelease {
            bump: BumpType::Minor,
            channel: None,
            git_head: "abc".to_string(),
            version: Version::new(1, 1, 0),
            git_tag: "v1.1.0".to_string(),
            name: "v1.1.0".to_string(),
            notes: String::new(),
        }
    }

    fn hook_context<'a>(
        options: &'a ReleaseOptions,
        env: &'a HashMap<String, String>,
        next: Option<&'a NextRelease>,
    ) -> HookContext<'a> {
        HookContext {
            cwd: Path::new("."),
            env,
            options,
            branch: None,
            branches: &[],
            last_release: None,
            commits: &[],
            next_release: next,
            current_release: None,
            releases: &[],
            errors: &[],
        }
    }

    #[test]
    fn test_hook_names_and_dry_run() {
        assert_eq!(Hook::AddChannel.to_string(), "addChannel");
        assert!(Hook::GenerateNotes.runs_in_dry_run());
        assert!(!Hook::Publish.runs_in_dry_run());
        assert!(!Hook::Fail.runs_in_dry_run());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = PluginRegistry::builtin(&PluginsConfig::default());
        assert_eq!(registry.names(), vec!["commit-analyzer", "release-notes-generator"]);
    }

    #[tokio::test]
    async fn test_analyze_commits_takes_highest_bump() {
        let a = std::sync::Arc::new(Recording {
            bump: Some(BumpType::Patch),
            ..Recording::new("a")
        });
        let b = std::sync::Arc::new(Recording {
            bump: Some(BumpType::Minor),
            ..Recording::new("b")
        });
        let c = std::sync::Arc::new(Recording::new("c"));
        let registry = PluginRegistry::new()
            .with_plugin(Box::new(a.clone()))
            .with_plugin(Box::new(b))
            .with_plugin(Box::new(c));

        let options = ReleaseOptions::default();
        let env = HashMap::new();
        let ctx = hook_context(&options, &env, None);
        assert_eq!(registry.analyze_commits(&ctx).await.unwrap(), Some(BumpType::Minor));
        assert_eq!(a.calls(), vec![Hook::AnalyzeCommits]);
    }

    #[tokio::test]
    async fn test_verify_conditions_runs_all_and_aggregates() {
        let a = std::sync::Arc::new(Recording {
            fail_verify: true,
            ..Recording::new("a")
        });
        let b = std::sync::Arc::new(Recording {
            fail_verify: true,
            ..Recording::new("b")
        });
        let registry = PluginRegistry::new()
            .with_plugin(Box::new(a.clone()))
            .with_plugin(Box::new(b.clone()));

        let options = ReleaseOptions::default();
        let env = HashMap::new();
        let err = registry
            .verify_conditions(&hook_context(&options, &env, None))
            .await
            .unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(b.calls(), vec![Hook::VerifyConditions]);
    }

    #[tokio::test]
    async fn test_generate_notes_joins_non_empty() {
        let registry = PluginRegistry::new()
            .with_plugin(Box::new(std::sync::Arc::new(Recording {
                notes: Some("first"),
                ..Recording::new("a")
            })))
            .with_plugin(Box::new(std::sync::Arc::new(Recording {
                notes: Some("  "),
                ..Recording::new("b")
            })))
            .with_plugin(Box::new(std::sync::Arc::new(Recording {
                notes: Some("second\n"),
                ..Recording::new("c")
            })));

        let options = ReleaseOptions::default();
        let env = HashMap::new();
        let notes = registry
            .generate_notes(&hook_context(&options, &env, None))
            .await
            .unwrap();
        assert_eq!(notes, "first\n\nsecond");
    }

    #[tokio::test]
    async fn test_publish_builds_release_records() {
        let registry = PluginRegistry::new().with_plugin(Box::new(std::sync::Arc::new(Recording::new("npm"))));
        let options = ReleaseOptions::default();
        let env = HashMap::new();
        let next = next_release();

        let releases = registry
            .publish(&hook_context(&options, &env, Some(&next)))
            .await
            .unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].plugin_name, "npm");
        assert_eq!(releases[0].name, "npm release");
        assert_eq!(releases[0].git_tag, "v1.1.0");
        assert_eq!(releases[0].url.as_deref(), Some("https://example.com/r/1"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_side_effect_hooks() {
        let plugin = std::sync::Arc::new(Recording::new("a"));
        let registry = PluginRegistry::new().with_plugin(Box::new(plugin.clone()));
        let options = ReleaseOptions {
            dry_run: true,
            ..ReleaseOptions::default()
        };
        let env = HashMap::new();
        let next = next_release();
        let ctx = hook_context(&options, &env, Some(&next));

        registry.prepare(&ctx).await.unwrap();
        assert!(registry.publish(&ctx).await.unwrap().is_empty());
        assert!(registry.add_channel(&ctx).await.unwrap().is_empty());
        registry.success(&ctx).await.unwrap();
        registry.fail(&ctx).await.unwrap();
        assert!(plugin.calls().is_empty());
    }
}
