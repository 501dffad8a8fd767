//! Release line resolution.
//!
//! Turns the configured branch entries and the tags reachable from each branch
//! into classified [`Branch`] values with their version ranges:
//!
//! - **maintenance** branches (`1.x`, `1.2.x` or an explicit `range`) own a
//!   bounded slice of an old major/minor line
//! - **release** branches (one to three of them) own consecutive ranges, the
//!   first one publishing on the default channel
//! - **prerelease** branches publish `-<id>.N` versions and have no range

use crate::error::{Error, Result};
use crate::version::{BumpType, VersionRange};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Maximum number of release branches.
pub const MAX_RELEASE_BRANCHES: usize = 3;

/// Prerelease setting of a configured branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrereleaseSetting {
    /// `true` uses the branch name as identifier, `false` disables.
    Enabled(bool),
    /// Explicit prerelease identifier.
    Identifier(String),
}

/// One entry of the `branches` option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BranchEntry", into = "BranchEntry")]
pub struct BranchConfig {
    /// Branch name or glob pattern.
    pub name: String,
    /// Distribution channel override.
    pub channel: Option<String>,
    /// Declared range (maintenance branches).
    pub range: Option<String>,
    /// Prerelease marker.
    pub prerelease: Option<PrereleaseSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum BranchEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prerelease: Option<PrereleaseSetting>,
    },
}

impl From<BranchEntry> for BranchConfig {
    fn from(entry: BranchEntry) -> Self {
        match entry {
            BranchEntry::Name(name) => Self::named(name),
            BranchEntry::Detailed {
                name,
                channel,
                range,
                prerelease,
            } => Self {
                name,
                channel,
                range,
                prerelease,
            },
        }
    }
}

impl From<BranchConfig> for BranchEntry {
    fn from(config: BranchConfig) -> Self {
        if config.channel.is_none() && config.range.is_none() && config.prerelease.is_none() {
            Self::Name(config.name)
        } else {
            Self::Detailed {
                name: config.name,
                channel: config.channel,
                range: config.range,
                prerelease: config.prerelease,
            }
        }
    }
}

impl BranchConfig {
    /// Plain branch entry.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: None,
            range: None,
            prerelease: None,
        }
    }

    /// Prerelease branch entry using its name as identifier.
    #[must_use]
    pub fn prerelease(name: impl Into<String>) -> Self {
        Self {
            prerelease: Some(PrereleaseSetting::Enabled(true)),
            ..Self::named(name)
        }
    }

    /// Sets the channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the declared range.
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Prerelease identifier, if this entry is a prerelease branch.
    #[must_use]
    pub fn prerelease_identifier(&self) -> Option<&str> {
        match &self.prerelease {
            Some(PrereleaseSetting::Enabled(true)) => Some(self.name.as_str()),
            Some(PrereleaseSetting::Identifier(id)) => Some(id.as_str()),
            Some(PrereleaseSetting::Enabled(false)) | None => None,
        }
    }

    /// Whether this entry is a maintenance branch.
    #[must_use]
    pub fn is_maintenance(&self) -> bool {
        self.range.is_some() || VersionRange::from_maintenance_name(&self.name).is_some()
    }

    fn is_pattern(&self) -> bool {
        self.name.contains(['*', '?', '['])
    }
}

/// Default branch configuration.
#[must_use]
pub fn default_branches() -> Vec<BranchConfig> {
    vec![
        BranchConfig::named("[0-9]*.x"),
        BranchConfig::named("[0-9]*.[0-9]*.x"),
        BranchConfig::named("main"),
        BranchConfig::named("master"),
        BranchConfig::named("next"),
        BranchConfig::named("next-major"),
        BranchConfig::prerelease("beta"),
        BranchConfig::prerelease("alpha"),
    ]
}

/// Expand configured entries against the branches that exist on the remote.
///
/// Glob entries yield one entry per matching remote branch; plain entries are
/// kept only when the remote has them.
///
/// # Errors
///
/// Returns [`Error::InvalidBranchConfig`] for malformed patterns or when a
/// branch is matched by more than one entry.
pub fn expand(configs: &[BranchConfig], remote_branches: &[String]) -> Result<Vec<BranchConfig>> {
    let mut expanded: Vec<BranchConfig> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for config in configs {
        let names: Vec<&String> = if config.is_pattern() {
            let pattern = glob::Pattern::new(&config.name).map_err(|e| {
                Error::invalid_branch_config(
                    format!("invalid branch pattern '{}': {e}", config.name),
                    "Use glob syntax such as '[0-9]*.x' or 'release/*'",
                )
            })?;
            remote_branches.iter().filter(|b| pattern.matches(b)).collect()
        } else {
            remote_branches.iter().filter(|b| **b == config.name).collect()
        };

        for name in names {
            // Patterns like `[0-9]*.x` also match names that are not release lines
            if config.is_pattern()
                && config.range.is_none()
                && config.prerelease.is_none()
                && config.name.ends_with(".x")
                && VersionRange::from_maintenance_name(name).is_none()
            {
                continue;
            }
            if seen.contains(name) {
                // First pattern wins, explicit names must be unique
                if config.is_pattern() {
                    continue;
                }
                return Err(Error::invalid_branch_config(
                    format!("branch '{name}' is matched by more than one entry"),
                    "Each branch may appear only once in the branches option",
                ));
            }
            seen.insert(name.clone());
            expanded.push(BranchConfig {
                name: name.clone(),
                ..config.clone()
            });
        }
    }

    debug!(count = expanded.len(), "Expanded branch configuration");
    Ok(expanded)
}

/// A release tag reachable from a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseTag {
    /// Released version.
    pub version: Version,
    /// Channel the tag was published on (`None` for the default channel).
    pub channel: Option<String>,
    /// Tag name.
    pub git_tag: String,
    /// Commit the tag points to.
    pub git_head: String,
}

/// Classification of a release line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BranchType {
    /// Maintains an older line within a bounded range.
    Maintenance,
    /// Publishes regular releases.
    Release,
    /// Publishes prerelease versions.
    Prerelease {
        /// Prerelease identifier (`beta` in `2.0.0-beta.1`)
        identifier: String,
    },
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maintenance => write!(f, "maintenance"),
            Self::Release => write!(f, "release"),
            Self::Prerelease { .. } => write!(f, "prerelease"),
        }
    }
}

/// A resolved release line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Classification.
    #[serde(flatten)]
    pub kind: BranchType,
    /// Distribution channel, `None` for the default channel.
    pub channel: Option<String>,
    /// Versions this branch may publish, `None` for prerelease branches.
    pub range: Option<VersionRange>,
    /// Versions that may be merged into a maintenance branch.
    pub merge_range: Option<VersionRange>,
    /// Bumps that still fit the range.
    pub accept: Vec<BumpType>,
    /// Whether this is the first release branch.
    pub main: bool,
    /// Tags reachable from the branch, append-only during a run.
    pub tags: Vec<ReleaseTag>,
}

impl Branch {
    /// Whether this is a prerelease branch.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        matches!(self.kind, BranchType::Prerelease { .. })
    }

    /// Whether this is a maintenance branch.
    #[must_use]
    pub const fn is_maintenance(&self) -> bool {
        matches!(self.kind, BranchType::Maintenance)
    }

    /// Versions of the non-prerelease tags on the branch.
    fn release_versions(&self) -> impl Iterator<Item = &Version> {
        self.tags
            .iter()
            .map(|t| &t.version)
            .filter(|v| v.pre.is_empty())
    }

    /// Whether a tag for `version` exists on `channel`.
    #[must_use]
    pub fn has_tag(&self, version: &Version, channel: Option<&str>) -> bool {
        self.tags
            .iter()
            .any(|t| t.version == *version && t.channel.as_deref() == channel)
    }
}

/// A configured branch paired with the tags read from source control.
#[derive(Debug, Clone)]
pub struct RawBranch {
    /// Expanded configuration entry.
    pub config: BranchConfig,
    /// Tags reachable from the branch head.
    pub tags: Vec<ReleaseTag>,
}

/// Classify and order branches and compute their ranges.
///
/// # Errors
///
/// Returns [`Error::InvalidBranchConfig`] when release lines are ambiguous:
/// invalid or overlapping maintenance ranges, invalid or duplicated
/// prerelease identifiers, a prerelease branch named like a release branch,
/// a release branch count outside `1..=3`, or overlapping resolved ranges.
/// All problems found are reported together.
pub fn resolve(raw: Vec<RawBranch>, initial_version: &Version) -> Result<Vec<Branch>> {
    let mut errors = crate::error::ErrorCollector::new();

    let mut names = HashSet::new();
    for b in &raw {
        if !names.insert(b.config.name.as_str()) {
            errors.push(Error::invalid_branch_config(
                format!("branch '{}' is configured more than once", b.config.name),
                "Each branch may appear only once in the branches option",
            ));
        }
    }

    let mut maintenance = Vec::new();
    let mut release = Vec::new();
    let mut prerelease = Vec::new();
    for b in raw {
        if b.config.prerelease_identifier().is_some() {
            prerelease.push(b);
        } else if b.config.is_maintenance() {
            maintenance.push(b);
        } else {
            release.push(b);
        }
    }

    if release.is_empty() || release.len() > MAX_RELEASE_BRANCHES {
        errors.push(Error::invalid_branch_config(
            format!(
                "found {} release branches, between 1 and {MAX_RELEASE_BRANCHES} are required",
                release.len()
            ),
            "Configure at least one existing branch that is neither a maintenance nor a prerelease branch",
        ));
    }

    let release_names: HashSet<&str> = release.iter().map(|b| b.config.name.as_str()).collect();
    let mut identifiers = HashSet::new();
    for b in &prerelease {
        let id = b.config.prerelease_identifier().unwrap_or_default();
        if id.is_empty() || id.contains('.') || semver::Prerelease::new(id).is_err() {
            errors.push(Error::invalid_branch_config(
                format!("prerelease identifier '{id}' of branch '{}' is invalid", b.config.name),
                "Use a single alphanumeric identifier such as 'beta'",
            ));
        }
        if !identifiers.insert(id.to_string()) {
            errors.push(Error::invalid_branch_config(
                format!("prerelease identifier '{id}' is used by more than one branch"),
                "Each prerelease branch needs its own identifier",
            ));
        }
        if release_names.contains(b.config.name.as_str()) {
            errors.push(Error::invalid_branch_config(
                format!("prerelease branch '{}' collides with a release branch", b.config.name),
                "Rename the prerelease branch or remove it from the release branches",
            ));
        }
    }

    let mut declared = Vec::new();
    for b in maintenance {
        let source = b.config.range.as_deref().unwrap_or(&b.config.name);
        match source.parse::<VersionRange>() {
            Ok(range) => declared.push((b, range)),
            Err(_) => errors.push(Error::invalid_branch_config(
                format!("maintenance branch '{}' has an invalid range '{source}'", b.config.name),
                "Name maintenance branches N.x or N.N.x, or give them a range such as '>=1.0.0 <1.5.0'",
            )),
        }
    }
    declared.sort_by(|a, b| a.1.cmp(&b.1));
    for pair in declared.windows(2) {
        if pair[0].1.overlaps(&pair[1].1) {
            errors.push(Error::invalid_branch_config(
                format!(
                    "maintenance branches '{}' and '{}' have overlapping ranges",
                    pair[0].0.config.name, pair[1].0.config.name
                ),
                "Each maintenance branch must cover a distinct version range",
            ));
        }
    }

    errors.finish()?;

    let release = resolve_release(release, initial_version);
    let main_tags = release.first().map(|b| b.tags.clone()).unwrap_or_default();
    let maintenance = resolve_maintenance(declared, &main_tags);
    let prerelease = prerelease.into_iter().map(resolve_prerelease);

    let branches: Vec<Branch> = maintenance.into_iter().chain(release).chain(prerelease).collect();
    check_disjoint(&branches)?;

    for b in &branches {
        debug!(
            branch = %b.name,
            kind = %b.kind,
            range = ?b.range.as_ref().map(ToString::to_string),
            channel = ?b.channel,
            tags = b.tags.len(),
            "Resolved branch"
        );
    }
    Ok(branches)
}

/// Lowest of `versions` above every version in `lower`.
///
/// With nothing below, the lowest of `versions`.
fn first_version_above<'a>(
    versions: impl Iterator<Item = &'a Version>,
    lower: impl Iterator<Item = &'a Version>,
) -> Option<Version> {
    let highest_lower = lower.max();
    versions
        .filter(|v| highest_lower.is_none_or(|h| *v > h))
        .min()
        .cloned()
}

fn resolve_release(release: Vec<RawBranch>, initial_version: &Version) -> Vec<Branch> {
    let as_branches: Vec<Branch> = release
        .into_iter()
        .enumerate()
        .map(|(idx, b)| Branch {
            channel: if idx == 0 {
                b.config.channel
            } else {
                Some(b.config.channel.unwrap_or_else(|| b.config.name.clone()))
            },
            name: b.config.name,
            kind: BranchType::Release,
            range: None,
            merge_range: None,
            accept: Vec::new(),
            main: idx == 0,
            tags: b.tags,
        })
        .collect();

    let mut last_version = as_branches
        .first()
        .and_then(|b| b.release_versions().max().cloned())
        .unwrap_or_else(|| initial_version.clone());

    let mut ranges = Vec::with_capacity(as_branches.len());
    for (idx, branch) in as_branches.iter().enumerate() {
        if let Some(latest) = branch.release_versions().max() {
            if *latest > last_version {
                last_version = latest.clone();
            }
        }
        // A higher branch fully merged into this one leaves it unbounded
        let bound = as_branches.get(idx + 1).and_then(|next| {
            first_version_above(
                next.release_versions(),
                as_branches[..=idx].iter().flat_map(Branch::release_versions),
            )
        });
        ranges.push(VersionRange::new(last_version.clone(), bound));
    }

    as_branches
        .into_iter()
        .zip(ranges)
        .map(|(mut branch, range)| {
            branch.accept = range.accepted_bumps();
            branch.range = Some(range);
            branch
        })
        .collect()
}

fn resolve_maintenance(declared: Vec<(RawBranch, VersionRange)>, main_tags: &[ReleaseTag]) -> Vec<Branch> {
    let main_versions: Vec<&Version> = main_tags
        .iter()
        .map(|t| &t.version)
        .filter(|v| v.pre.is_empty())
        .collect();

    let mut maintained: Vec<Version> = Vec::new();
    declared
        .into_iter()
        .map(|(b, declared_range)| {
            maintained.extend(
                b.tags
                    .iter()
                    .map(|t| t.version.clone())
                    .filter(|v| v.pre.is_empty()),
            );

            let in_line_latest = b
                .tags
                .iter()
                .map(|t| &t.version)
                .filter(|v| declared_range.satisfies(v))
                .max();
            let min = in_line_latest
                .filter(|v| **v > declared_range.min)
                .cloned()
                .unwrap_or_else(|| declared_range.min.clone());

            let base = first_version_above(main_versions.iter().copied(), maintained.iter());
            let max = match (declared_range.max.clone(), base) {
                (Some(declared), Some(base)) => Some(declared.min(base)),
                (declared, base) => declared.or(base),
            };

            let range = VersionRange::new(min, max);
            Branch {
                channel: Some(b.config.channel.unwrap_or_else(|| b.config.name.clone())),
                name: b.config.name,
                kind: BranchType::Maintenance,
                accept: range.accepted_bumps(),
                range: Some(range),
                merge_range: Some(declared_range),
                main: false,
                tags: b.tags,
            }
        })
        .collect()
}

fn resolve_prerelease(b: RawBranch) -> Branch {
    let identifier = b
        .config
        .prerelease_identifier()
        .unwrap_or(b.config.name.as_str())
        .to_string();
    Branch {
        channel: Some(b.config.channel.unwrap_or_else(|| b.config.name.clone())),
        name: b.config.name,
        kind: BranchType::Prerelease { identifier },
        range: None,
        merge_range: None,
        accept: Vec::new(),
        main: false,
        tags: b.tags,
    }
}

/// Maintenance ranges must not overlap any other range.
fn check_disjoint(branches: &[Branch]) -> Result<()> {
    let ranged: Vec<(&Branch, &VersionRange)> = branches
        .iter()
        .filter_map(|b| b.range.as_ref().map(|r| (b, r)))
        .collect();

    let mut errors = crate::error::ErrorCollector::new();
    for (i, (branch_a, a)) in ranged.iter().enumerate() {
        for (branch_b, b) in &ranged[i + 1..] {
            if !(branch_a.is_maintenance() || branch_b.is_maintenance()) {
                continue;
            }
            if a.overlaps(b) {
                let (name_a, name_b) = (&branch_a.name, &branch_b.name);
                errors.push(Error::invalid_branch_config(
                    format!("branches '{name_a}' ({a}) and '{name_b}' ({b}) claim overlapping ranges"),
                    "Release a version on the release branch before creating a maintenance branch for the previous line",
                ));
            }
        }
    }
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::FIRST_RELEASE;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn tag(version: &str, channel: Option<&str>) -> ReleaseTag {
        let suffix = channel.map(|c| format!("@{c}")).unwrap_or_default();
        ReleaseTag {
            version: v(version),
            channel: channel.map(String::from),
            git_tag: format!("v{version}{suffix}"),
            git_head: format!("sha-{version}"),
        }
    }

    fn raw(config: BranchConfig, tags: Vec<ReleaseTag>) -> RawBranch {
        RawBranch { config, tags }
    }

    fn names(branches: &[Branch]) -> Vec<&str> {
        branches.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_branch_config_deserializes_both_forms() {
        #[derive(Deserialize)]
        struct Wrapper {
            branches: Vec<BranchConfig>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
branches = [
  "main",
  { name = "beta", prerelease = true },
  { name = "rc", prerelease = "candidate", channel = "rc-channel" },
  { name = "legacy", range = ">=1.0.0 <1.5.0" },
]
"#,
        )
        .unwrap();
        assert_eq!(parsed.branches[0], BranchConfig::named("main"));
        assert_eq!(parsed.branches[1].prerelease_identifier(), Some("beta"));
        assert_eq!(parsed.branches[2].prerelease_identifier(), Some("candidate"));
        assert_eq!(parsed.branches[2].channel.as_deref(), Some("rc-channel"));
        assert!(parsed.branches[3].is_maintenance());
    }

    #[test]
    fn test_expand_matches_patterns_and_existing_names() {
        let remote: Vec<String> = ["main", "1.x", "1.2.x", "feature/x", "next", "10abc.x"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let expanded = expand(&default_branches(), &remote).unwrap();
        let names: Vec<&str> = expanded.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["1.x", "1.2.x", "main", "next"]);
    }

    #[test]
    fn test_expand_rejects_double_match() {
        let remote = vec!["main".to_string()];
        let configs = vec![BranchConfig::named("ma*"), BranchConfig::named("main")];
        let err = expand(&configs, &remote).unwrap_err();
        assert_eq!(err.code(), "EINVALIDBRANCHCONFIG");
    }

    #[test]
    fn test_resolve_single_release_branch_without_tags() {
        let branches = resolve(vec![raw(BranchConfig::named("main"), vec![])], &FIRST_RELEASE).unwrap();
        assert_eq!(branches.len(), 1);
        let main = &branches[0];
        assert_eq!(main.kind, BranchType::Release);
        assert!(main.main);
        assert_eq!(main.channel, None);
        assert_eq!(main.range, Some(VersionRange::at_least(v("1.0.0"))));
        assert_eq!(main.accept.len(), 3);
    }

    #[test]
    fn test_resolve_release_ranges_are_consecutive() {
        let branches = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![tag("1.0.0", None)]),
                raw(
                    BranchConfig::named("next"),
                    vec![tag("1.0.0", None), tag("1.1.0", Some("next"))],
                ),
            ],
            &FIRST_RELEASE,
        )
        .unwrap();

        assert_eq!(
            branches[0].range,
            Some(VersionRange::new(v("1.0.0"), Some(v("1.1.0"))))
        );
        assert_eq!(branches[0].accept, vec![BumpType::Patch]);
        assert_eq!(branches[1].channel.as_deref(), Some("next"));
        assert_eq!(branches[1].range, Some(VersionRange::at_least(v("1.1.0"))));
    }

    #[test]
    fn test_resolve_orders_maintenance_release_prerelease() {
        let branches = resolve(
            vec![
                raw(BranchConfig::prerelease("beta"), vec![]),
                raw(BranchConfig::named("main"), vec![tag("1.0.0", None), tag("2.0.0", None)]),
                raw(BranchConfig::named("1.x"), vec![tag("1.0.0", None)]),
            ],
            &FIRST_RELEASE,
        )
        .unwrap();
        assert_eq!(names(&branches), vec!["1.x", "main", "beta"]);

        let maintenance = &branches[0];
        assert_eq!(maintenance.channel.as_deref(), Some("1.x"));
        assert_eq!(
            maintenance.range,
            Some(VersionRange::new(v("1.0.0"), Some(v("2.0.0"))))
        );
        assert_eq!(
            maintenance.merge_range,
            Some(VersionRange::new(v("1.0.0"), Some(v("2.0.0"))))
        );
        assert!(branches[2].range.is_none());
        assert_eq!(
            branches[2].kind,
            BranchType::Prerelease {
                identifier: "beta".to_string()
            }
        );
    }

    #[test]
    fn test_maintenance_range_starts_at_last_in_line_release() {
        let branches = resolve(
            vec![
                raw(
                    BranchConfig::named("1.x"),
                    vec![tag("1.0.0", None), tag("1.3.0", Some("1.x"))],
                ),
                raw(
                    BranchConfig::named("main"),
                    vec![tag("1.0.0", None), tag("2.0.0", None)],
                ),
            ],
            &FIRST_RELEASE,
        )
        .unwrap();
        assert_eq!(
            branches[0].range,
            Some(VersionRange::new(v("1.3.0"), Some(v("2.0.0"))))
        );
    }

    #[test]
    fn test_maintenance_overlapping_release_is_rejected() {
        let err = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![]),
                raw(BranchConfig::named("1.x"), vec![]),
            ],
            &FIRST_RELEASE,
        )
        .unwrap_err();
        assert_eq!(err.code(), "EINVALIDBRANCHCONFIG");
        assert!(err.to_string().contains("overlapping"));
    }

    #[test]
    fn test_overlapping_maintenance_ranges_are_rejected() {
        let err = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![tag("3.0.0", None)]),
                raw(BranchConfig::named("1.x"), vec![]),
                raw(BranchConfig::named("legacy").with_range(">=1.2.0 <1.4.0"), vec![]),
            ],
            &FIRST_RELEASE,
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlapping"));
    }

    #[test]
    fn test_prerelease_name_collision_is_rejected() {
        let err = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![]),
                raw(BranchConfig::prerelease("main"), vec![]),
            ],
            &FIRST_RELEASE,
        )
        .unwrap_err();
        let errors = err.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code() == "EINVALIDBRANCHCONFIG"));
    }

    #[test]
    fn test_duplicate_prerelease_identifier_is_rejected() {
        let err = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![]),
                raw(BranchConfig::prerelease("beta"), vec![]),
                raw(
                    BranchConfig {
                        prerelease: Some(PrereleaseSetting::Identifier("beta".to_string())),
                        ..BranchConfig::named("beta-2")
                    },
                    vec![],
                ),
            ],
            &FIRST_RELEASE,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one branch"));
    }

    #[test]
    fn test_too_many_release_branches_are_rejected() {
        let raw_branches = ["a", "b", "c", "d"]
            .iter()
            .map(|n| raw(BranchConfig::named(*n), vec![]))
            .collect();
        assert!(resolve(raw_branches, &FIRST_RELEASE).is_err());
        assert!(resolve(vec![raw(BranchConfig::prerelease("beta"), vec![])], &FIRST_RELEASE).is_err());
    }

    #[test]
    fn test_invalid_prerelease_identifier_is_rejected() {
        let err = resolve(
            vec![
                raw(BranchConfig::named("main"), vec![]),
                raw(
                    BranchConfig {
                        prerelease: Some(PrereleaseSetting::Identifier("beta!".to_string())),
                        ..BranchConfig::named("beta")
                    },
                    vec![],
                ),
            ],
            &FIRST_RELEASE,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_has_tag_checks_channel() {
        let branches = resolve(
            vec![raw(BranchConfig::named("main"), vec![tag("1.0.0", Some("next"))])],
            &FIRST_RELEASE,
        )
        .unwrap();
        assert!(branches[0].has_tag(&v("1.0.0"), Some("next")));
        assert!(!branches[0].has_tag(&v("1.0.0"), None));
    }
}
