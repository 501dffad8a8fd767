//! Error types for release orchestration.
//!
//! Every variant carries a stable diagnostic code. Validation failures that can
//! occur together in one phase are gathered with an [`ErrorCollector`] and
//! surfaced as a single [`Error::Multiple`].

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a release run.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The branch configuration cannot be resolved into release lines.
    #[error("Invalid branch configuration: {message}")]
    #[diagnostic(code(semrel::release::invalid_branch_config), help("{help}"))]
    InvalidBranchConfig {
        /// What is wrong with the configuration
        message: String,
        /// How to fix it
        help: String,
    },

    /// A release merged into a maintenance branch falls outside its merge range.
    #[error(
        "The release {version} on branch {branch} cannot be published as it is out of range"
    )]
    #[diagnostic(
        code(semrel::release::invalid_merge_range),
        help(
            "Only releases within the range {merge_range} can be merged into the maintenance branch {branch}. Revert the merge of {git_tag} and publish it from a branch accepting this version"
        )
    )]
    InvalidMergeRange {
        /// Maintenance branch name
        branch: String,
        /// Offending version
        version: String,
        /// Tag carrying the offending version
        git_tag: String,
        /// Range the branch accepts
        merge_range: String,
    },

    /// The computed version does not fit the branch range.
    #[error("The release {version} on branch {branch} cannot be published as it is out of range")]
    #[diagnostic(
        code(semrel::release::invalid_next_version),
        help(
            "Based on the releases published on other branches, only versions within the range {range} can be published from branch {branch}. Branches accepting this change: {valid_branches}"
        )
    )]
    InvalidNextVersion {
        /// Branch being released
        branch: String,
        /// Computed version
        version: String,
        /// Range owned by the branch
        range: String,
        /// Comma separated branches that would accept the same bump
        valid_branches: String,
    },

    /// The tag format template is unusable.
    #[error("Invalid tag format '{format}': {reason}")]
    #[diagnostic(
        code(semrel::release::invalid_tag_format),
        help("The tagFormat must contain the version placeholder exactly once and render a valid git reference")
    )]
    InvalidTagFormat {
        /// The configured template
        format: String,
        /// Why it was rejected
        reason: String,
    },

    /// No repository URL was configured or discovered.
    #[error("The repository URL is not configured")]
    #[diagnostic(
        code(semrel::release::no_repository_url),
        help("Set repositoryUrl in .releaserc.toml, pass --repository-url, or add a remote named origin")
    )]
    NoRepositoryUrl,

    /// Pushing to the repository is not permitted.
    #[error("Cannot push to the Git repository on branch {branch}")]
    #[diagnostic(
        code(semrel::release::no_git_permission),
        help("Make sure the CI job has push access to {url}, for instance by exporting GH_TOKEN or GIT_CREDENTIALS")
    )]
    NoGitPermission {
        /// Repository URL without credentials
        url: String,
        /// Branch that was verified
        branch: String,
        /// The failed permission check
        #[source]
        source: Box<Error>,
    },

    /// Configuration error.
    #[error("Release configuration error: {message}")]
    #[diagnostic(code(semrel::release::config), help("{help}"))]
    Config {
        /// The error message
        message: String,
        /// Help text for the user
        help: String,
    },

    /// A git command failed.
    #[error("Git error: `{command}` failed: {message}")]
    #[diagnostic(
        code(semrel::release::git),
        help("Ensure you are in a git repository and have the necessary permissions")
    )]
    Git {
        /// The git invocation
        command: String,
        /// stderr or other failure detail
        message: String,
    },

    /// A plugin hook failed.
    #[error("Plugin {plugin} failed during {hook}: {message}")]
    #[diagnostic(code(semrel::release::plugin))]
    Plugin {
        /// Plugin name
        plugin: String,
        /// Hook name
        hook: String,
        /// The error message
        message: String,
        /// Code reported by the plugin for its own validation failures
        code: Option<String>,
    },

    /// A version string could not be parsed.
    #[error("Invalid version: {version}")]
    #[diagnostic(
        code(semrel::release::invalid_version),
        help("Version must follow semantic versioning (e.g., 1.0.0, 2.1.0-beta.1)")
    )]
    InvalidVersion {
        /// The invalid version string
        version: String,
    },

    /// Several independent errors from one phase.
    #[error("{} errors occurred", .errors.len())]
    #[diagnostic(code(semrel::release::multiple))]
    Multiple {
        /// Member errors, in the order they were collected
        #[related]
        errors: Vec<Error>,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read {}: {source}", .path.display())]
    #[diagnostic(code(semrel::release::config_io))]
    ConfigIo {
        /// The file that could not be read
        path: PathBuf,
        /// The underlying source error
        #[source]
        source: std::io::Error,
    },

    /// Wrapped I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(semrel::release::io))]
    Io(#[from] std::io::Error),

    /// Wrapped JSON error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(semrel::release::json))]
    Json(#[from] serde_json::Error),

    /// Wrapped TOML parsing error.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(semrel::release::toml_parse))]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Create a new branch configuration error.
    #[must_use]
    pub fn invalid_branch_config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidBranchConfig {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a new tag format error.
    #[must_use]
    pub fn invalid_tag_format(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTagFormat {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a new git error.
    #[must_use]
    pub fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a new plugin error.
    #[must_use]
    pub fn plugin(
        plugin: impl Into<String>,
        hook: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            hook: hook.to_string(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a plugin error carrying the plugin's own validation code.
    #[must_use]
    pub fn plugin_with_code(
        plugin: impl Into<String>,
        hook: impl fmt::Display,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            hook: hook.to_string(),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Create a new invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Stable short code of this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidBranchConfig { .. } => "EINVALIDBRANCHCONFIG",
            Self::InvalidMergeRange { .. } => "EINVALIDMERGERANGE",
            Self::InvalidNextVersion { .. } => "EINVALIDNEXTVERSION",
            Self::InvalidTagFormat { .. } => "EINVALIDTAGFORMAT",
            Self::NoRepositoryUrl => "ENOREPOURL",
            Self::NoGitPermission { .. } => "EGITNOPERMISSION",
            Self::Config { .. } | Self::ConfigIo { .. } | Self::TomlParse(_) => "ECONFIG",
            Self::Git { .. } => "EGIT",
            Self::Plugin { .. } => "EPLUGIN",
            Self::InvalidVersion { .. } => "EINVALIDVERSION",
            Self::Multiple { .. } => "EMULTIPLE",
            Self::Io(_) => "EIO",
            Self::Json(_) => "EJSON",
        }
    }

    /// Whether the error comes from release validation rather than an
    /// unexpected failure.
    ///
    /// Plugin errors count as validation errors when the plugin attached a code.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        match self {
            Self::InvalidBranchConfig { .. }
            | Self::InvalidMergeRange { .. }
            | Self::InvalidNextVersion { .. }
            | Self::InvalidTagFormat { .. }
            | Self::NoRepositoryUrl
            | Self::NoGitPermission { .. }
            | Self::Config { .. } => true,
            Self::Plugin { code, .. } => code.is_some(),
            _ => false,
        }
    }

    /// Flattens an aggregate into its members; any other error yields itself.
    #[must_use]
    pub fn into_errors(self) -> Vec<Self> {
        match self {
            Self::Multiple { errors } => errors.into_iter().flat_map(Self::into_errors).collect(),
            other => vec![other],
        }
    }

    /// Borrowing variant of [`Error::into_errors`].
    #[must_use]
    pub fn errors(&self) -> Vec<&Self> {
        match self {
            Self::Multiple { errors } => errors.iter().flat_map(Self::errors).collect(),
            other => vec![other],
        }
    }
}

/// Orders errors for reporting: validation errors first, collection order kept
/// otherwise.
pub fn sort_for_report<E: std::borrow::Borrow<Error>>(errors: &mut [E]) {
    errors.sort_by_key(|e| !e.borrow().is_validation());
}

/// Accumulates independent errors of one phase.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<Error>,
}

impl ErrorCollector {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record an error.
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    /// Record the error of a failed result, discarding the success value.
    pub fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    /// Number of errors collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no error was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ends the phase: no error is `Ok`, a single error is returned as is and
    /// several are wrapped in [`Error::Multiple`].
    ///
    /// # Errors
    ///
    /// Returns the collected error(s), if any.
    pub fn finish(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(Error::Multiple {
                errors: self.errors,
            }),
        }
    }
}
