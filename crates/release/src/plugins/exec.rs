//! Shell command hooks.

use crate::config::ExecConfig;
use crate::context::HookContext;
use crate::error::{Error, Result};
use crate::plugins::{Hook, Plugin, ReleaseInfo};
use crate::version::BumpType;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_SHELL: &str = "sh";

/// Runs a configured shell command for each hook.
///
/// The release is described to the command through environment variables:
/// `NEXT_VERSION`, `NEXT_CHANNEL`, `NEXT_GIT_TAG` and `LAST_VERSION`.
#[derive(Debug, Clone)]
pub struct Exec {
    config: ExecConfig,
}

impl Exec {
    /// Creates the plugin.
    #[must_use]
    pub const fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, hook: Hook) -> Option<&str> {
        let cmd = match hook {
            Hook::VerifyConditions => &self.config.verify_conditions_cmd,
            Hook::AnalyzeCommits => &self.config.analyze_commits_cmd,
            Hook::VerifyRelease => &self.config.verify_release_cmd,
            Hook::GenerateNotes => &self.config.generate_notes_cmd,
            Hook::Prepare => &self.config.prepare_cmd,
            Hook::Publish => &self.config.publish_cmd,
            Hook::AddChannel => &self.config.add_channel_cmd,
            Hook::Success => &self.config.success_cmd,
            Hook::Fail => &self.config.fail_cmd,
        };
        cmd.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Run the command of `hook`, returning its trimmed stdout.
    ///
    /// `None` when no command is configured for the hook.
    async fn run(&self, hook: Hook, ctx: &HookContext<'_>) -> Result<Option<String>> {
        let Some(script) = self.command_for(hook) else {
            return Ok(None);
        };
        let shell = self.config.shell.as_deref().unwrap_or(DEFAULT_SHELL);

        let mut cmd = Command::new(shell);
        cmd.arg("-c")
            .arg(script)
            .current_dir(ctx.cwd)
            .env_clear()
            .envs(ctx.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(next) = ctx.next_release {
            cmd.env("NEXT_VERSION", next.version.to_string())
                .env("NEXT_CHANNEL", next.channel.as_deref().unwrap_or_default())
                .env("NEXT_GIT_TAG", &next.git_tag);
        }
        if let Some(last) = ctx.last_release {
            cmd.env("LAST_VERSION", last.version.to_string());
        }

        info!(%hook, command = script, "Running exec command");
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::plugin(self.name(), hook, format!("failed to spawn `{shell}`: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(%hook, stderr = %stderr.trim(), "exec command stderr");
        }
        if !output.status.success() {
            return Err(Error::plugin(
                self.name(),
                hook,
                format!("command `{script}` exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    /// Release info from a command's output; plain text is not an error.
    fn release_info(hook: Hook, stdout: &str) -> ReleaseInfo {
        if stdout.is_empty() {
            return ReleaseInfo::default();
        }
        match serde_json::from_str::<ReleaseInfo>(stdout) {
            Ok(info) => info,
            Err(e) => {
                warn!(%hook, error = %e, "exec output is not release info JSON, ignoring it");
                ReleaseInfo::default()
            }
        }
    }
}

#[async_trait]
impl Plugin for Exec {
    fn name(&self) -> &str {
        "exec"
    }

    async fn verify_conditions(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.run(Hook::VerifyConditions, ctx).await.map(|_| ())
    }

    async fn analyze_commits(&self, ctx: &HookContext<'_>) -> Result<Option<BumpType>> {
        match self.run(Hook::AnalyzeCommits, ctx).await? {
            Some(stdout) if !stdout.is_empty() => BumpType::parse(&stdout)
                .map(Some)
                .map_err(|_| Error::plugin(self.name(), Hook::AnalyzeCommits, format!("'{stdout}' is not a bump type"))),
            _ => Ok(None),
        }
    }

    async fn verify_release(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.run(Hook::VerifyRelease, ctx).await.map(|_| ())
    }

    async fn generate_notes(&self, ctx: &HookContext<'_>) -> Result<Option<String>> {
        self.run(Hook::GenerateNotes, ctx).await
    }

    async fn prepare(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.run(Hook::Prepare, ctx).await.map(|_| ())
    }

    async fn publish(&self, ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        Ok(self
            .run(Hook::Publish, ctx)
            .await?
            .map(|stdout| Self::release_info(Hook::Publish, &stdout)))
    }

    async fn add_channel(&self, ctx: &HookContext<'_>) -> Result<Option<ReleaseInfo>> {
        Ok(self
            .run(Hook::AddChannel, ctx)
            .await?
            .map(|stdout| Self::release_info(Hook::AddChannel, &stdout)))
    }

    async fn success(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.run(Hook::Success, ctx).await.map(|_| ())
    }

    async fn fail(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.run(Hook::Fail, ctx).await.map(|_| ())
    }
}
