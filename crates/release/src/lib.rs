//! Release orchestration engine for semrel.
//!
//! Given a repository's branch topology and commit history, this crate decides
//! whether a release is warranted, computes its version, tags the repository
//! and drives the plugin hooks that generate notes, publish and report.
//!
//! # Features
//!
//! - **Release lines**: release, maintenance and prerelease branches, each owning
//!   a version range and a distribution channel
//! - **Back-ports**: releases published on higher branches are added to the
//!   channel of lower branches, oldest first
//! - **Version resolution**: semantic bumps validated against branch ranges
//! - **Plugins**: one async trait method per hook, sequenced by a registry
//!
//! # Architecture
//!
//! - [`branch`] - branch configuration and the branch resolver
//! - [`gap`] - last release lookup and back-port computation
//! - [`version`] - bump kinds, version ranges and the version resolver
//! - [`tag`] - tag format rendering and parsing
//! - [`plugins`] - plugin trait, registry and built-in plugins
//! - [`git`] - source control collaborator
//! - [`orchestrator`] - the release run
//!
//! # Example
//!
//! ```rust,ignore
//! use semrel_release::{GitCli, Orchestrator, PluginRegistry, ReleaseContext, ReleaseOptions};
//!
//! let options = ReleaseOptions::discover(&cwd)?;
//! let mut ctx = ReleaseContext::from_process_env(&cwd, options);
//! let orchestrator = Orchestrator::new(
//!     Box::new(GitCli::new(&cwd, ctx.env.clone())),
//!     PluginRegistry::builtin(&ctx.options.plugins),
//! );
//!
//! match orchestrator.run(&mut ctx).await? {
//!     Some(outcome) => println!("released {:?}", outcome.next_release),
//!     None => println!("no release"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod branch;
pub mod ci;
pub mod config;
pub mod context;
pub mod error;
pub mod gap;
pub mod git;
pub mod orchestrator;
pub mod plugins;
pub mod tag;
pub mod version;

// Re-export main types
pub use branch::{Branch, BranchConfig, BranchType, ReleaseTag};
pub use ci::CiEnvironment;
pub use config::{ExecConfig, PluginsConfig, ReleaseOptions};
pub use context::{Commit, LastRelease, NextRelease, Release, ReleaseContext, ReleaseOutcome};
pub use error::{Error, Result};
pub use git::{GitCli, SourceControl};
pub use orchestrator::Orchestrator;
pub use plugins::{Hook, Plugin, PluginRegistry, ReleaseInfo};
pub use tag::TagFormat;
pub use version::{BumpType, VersionRange};
