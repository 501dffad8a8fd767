//! Release configuration types.
//!
//! Options are read from `.releaserc.toml` with camelCase keys:
//!
//! ```toml
//! repositoryUrl = "https://github.com/acme/widget.git"
//! tagFormat = "v{version}"
//! branches = ["1.x", "main", { name = "beta", prerelease = true }]
//!
//! [plugins.exec]
//! publishCmd = "./scripts/publish.sh"
//! ```

use crate::branch::{BranchConfig, default_branches};
use crate::error::{Error, ErrorCollector, Result};
use crate::tag::{DEFAULT_TAG_FORMAT, TagFormat};
use crate::version::FIRST_RELEASE;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".releaserc.toml";

/// Complete release configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReleaseOptions {
    /// Remote repository URL.
    pub repository_url: Option<String>,
    /// Tag name template with a `{version}` placeholder.
    pub tag_format: String,
    /// Release line configuration.
    pub branches: Vec<BranchConfig>,
    /// Compute the release without publishing it.
    pub dry_run: bool,
    /// Apply CI gating; `false` releases from a local run and from pull requests.
    pub ci: bool,
    /// Version of the first release.
    pub initial_version: Version,
    /// Built-in plugin settings.
    pub plugins: PluginsConfig,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            repository_url: None,
            tag_format: DEFAULT_TAG_FORMAT.to_string(),
            branches: default_branches(),
            dry_run: false,
            ci: true,
            initial_version: FIRST_RELEASE,
            plugins: PluginsConfig::default(),
        }
    }
}

impl ReleaseOptions {
    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded release configuration");
        Ok(options)
    }

    /// Load `.releaserc.toml` from `cwd`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn discover(cwd: &Path) -> Result<Self> {
        let path = Self::config_path(cwd);
        if path.is_file() {
            Self::load(&path)
        } else {
            debug!(cwd = %cwd.display(), "No {CONFIG_FILE} found, using defaults");
            Ok(Self::default())
        }
    }

    /// Location of the configuration file for `cwd`.
    #[must_use]
    pub fn config_path(cwd: &Path) -> PathBuf {
        cwd.join(CONFIG_FILE)
    }

    /// Check the options and compile the tag format.
    ///
    /// All problems are reported together.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRepositoryUrl`], [`Error::InvalidTagFormat`] or
    /// [`Error::InvalidBranchConfig`], wrapped in [`Error::Multiple`] when
    /// several apply.
    pub fn verify(&self) -> Result<TagFormat> {
        let mut errors = ErrorCollector::new();

        if self.repository_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
            errors.push(Error::NoRepositoryUrl);
        }

        let tag_format = errors.record(TagFormat::new(self.tag_format.clone()));

        if self.branches.is_empty() {
            errors.push(Error::invalid_branch_config(
                "no branches are configured",
                "Add at least one release branch, for instance 'main'",
            ));
        }
        for branch in self.branches.iter().filter(|b| b.name.trim().is_empty()) {
            errors.push(Error::invalid_branch_config(
                format!("branch entry {branch:?} has an empty name"),
                "Every branch entry needs a name or glob pattern",
            ));
        }

        errors.finish()?;
        tag_format.ok_or_else(|| Error::invalid_tag_format(&self.tag_format, "not compiled"))
    }
}

/// Built-in plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginsConfig {
    /// Enable the conventional-commit analyzer.
    pub commit_analyzer: bool,
    /// Enable the Markdown release notes generator.
    pub release_notes_generator: bool,
    /// Shell commands run per hook.
    pub exec: Option<ExecConfig>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            commit_analyzer: true,
            release_notes_generator: true,
            exec: None,
        }
    }
}

/// Commands of the `exec` plugin, one per hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecConfig {
    /// Run during `verifyConditions`.
    pub verify_conditions_cmd: Option<String>,
    /// Run during `analyzeCommits`; stdout is read as a bump type.
    pub analyze_commits_cmd: Option<String>,
    /// Run during `verifyRelease`.
    pub verify_release_cmd: Option<String>,
    /// Run during `generateNotes`; stdout is used as notes.
    pub generate_notes_cmd: Option<String>,
    /// Run during `prepare`.
    pub prepare_cmd: Option<String>,
    /// Run during `publish`; stdout may hold release info as JSON.
    pub publish_cmd: Option<String>,
    /// Run during `addChannel`; stdout may hold release info as JSON.
    pub add_channel_cmd: Option<String>,
    /// Run during `success`.
    pub success_cmd: Option<String>,
    /// Run during `fail`.
    pub fail_cmd: Option<String>,
    /// Shell used to run the commands.
    pub shell: Option<String>,
}
