//! Version calculation and bumping logic.
//!
//! This module provides:
//! - Bump kinds and semver increments
//! - Half-open version ranges owned by release lines
//! - The next-version computation for a branch

use crate::branch::{Branch, BranchType};
use crate::context::LastRelease;
use crate::error::{Error, Result};
use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version used for the first release of a branch with no history.
pub const FIRST_RELEASE: Version = Version::new(1, 0, 0);

/// Counter of the first prerelease on a channel.
pub const FIRST_PRERELEASE: u64 = 1;

/// Kind of semantic-version increment.
///
/// Ordered by significance so the highest of several bumps can be taken with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    /// Increment the prerelease counter.
    Prerelease,
    /// Backwards compatible bug fixes.
    Patch,
    /// Backwards compatible features.
    Minor,
    /// Breaking changes.
    Major,
}

impl BumpType {
    /// Release kinds in increasing order, as used for range acceptance.
    pub const RELEASE_TYPES: [Self; 3] = [Self::Patch, Self::Minor, Self::Major];

    /// Parse a bump type from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a recognized bump type.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "prerelease" => Ok(Self::Prerelease),
            other => Err(Error::config(
                format!("Unknown bump type '{other}'"),
                "Use one of: major, minor, patch, prerelease",
            )),
        }
    }

    /// Lowercase name of the bump.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prerelease => "prerelease",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Apply `bump` to `version` following semver increment rules.
///
/// A prerelease version is first promoted to its release when the bump does
/// not go past it (`2.0.0-beta.3` bumped `major` is `2.0.0`). `None` when a
/// component would overflow.
#[must_use]
pub fn bump(version: &Version, bump: BumpType) -> Option<Version> {
    let pre = !version.pre.is_empty();
    let next = match bump {
        BumpType::Major => {
            if pre && version.minor == 0 && version.patch == 0 {
                Version::new(version.major, 0, 0)
            } else {
                Version::new(version.major.checked_add(1)?, 0, 0)
            }
        }
        BumpType::Minor => {
            if pre && version.patch == 0 {
                Version::new(version.major, version.minor, 0)
            } else {
                Version::new(version.major, version.minor.checked_add(1)?, 0)
            }
        }
        BumpType::Patch => {
            if pre {
                Version::new(version.major, version.minor, version.patch)
            } else {
                Version::new(version.major, version.minor, version.patch.checked_add(1)?)
            }
        }
        BumpType::Prerelease => return increment_prerelease(version),
    };
    Some(next)
}

/// Increment the trailing numeric prerelease identifier (`beta.1` → `beta.2`).
///
/// A release version gets its patch bumped and a `0` prerelease.
fn increment_prerelease(version: &Version) -> Option<Version> {
    if version.pre.is_empty() {
        let mut next = Version::new(version.major, version.minor, version.patch.checked_add(1)?);
        next.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
        return Some(next);
    }

    let mut idents: Vec<String> = version.pre.as_str().split('.').map(String::from).collect();
    match idents.iter().rposition(|id| id.parse::<u64>().is_ok()) {
        Some(pos) => {
            let n: u64 = idents[pos].parse().unwrap_or(0);
            idents[pos] = n.checked_add(1)?.to_string();
        }
        None => idents.push("0".to_string()),
    }

    let mut next = Version::new(version.major, version.minor, version.patch);
    next.pre = Prerelease::new(&idents.join(".")).unwrap_or(Prerelease::EMPTY);
    Some(next)
}

/// Most significant component that differs between two versions.
#[must_use]
pub fn diff(from: &Version, to: &Version) -> Option<BumpType> {
    if from.major != to.major {
        Some(BumpType::Major)
    } else if from.minor != to.minor {
        Some(BumpType::Minor)
    } else if from.patch != to.patch {
        Some(BumpType::Patch)
    } else if from.pre != to.pre {
        Some(BumpType::Prerelease)
    } else {
        None
    }
}

/// Parse a version, tolerating a leading `v`.
///
/// # Errors
///
/// Returns an error if the string is not valid semver.
pub fn parse_version(s: &str) -> Result<Version> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|_| Error::invalid_version(s))
}

/// A half-open version interval `[min, max)`.
///
/// Prerelease versions never satisfy a range; prerelease branches have no range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    /// Inclusive lower bound.
    pub min: Version,
    /// Exclusive upper bound, `None` when unbounded.
    pub max: Option<Version>,
}

impl VersionRange {
    /// Create a range from its bounds.
    #[must_use]
    pub const fn new(min: Version, max: Option<Version>) -> Self {
        Self { min, max }
    }

    /// Range with no upper bound.
    #[must_use]
    pub const fn at_least(min: Version) -> Self {
        Self { min, max: None }
    }

    /// Whether `version` lies in the range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        version.pre.is_empty()
            && *version >= self.min
            && self.max.as_ref().is_none_or(|max| version < max)
    }

    /// Whether the range contains no release version at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max.as_ref().is_some_and(|max| *max <= self.min)
    }

    /// Whether two ranges share at least one version.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let below = |range: &Self, bound: &Version| range.max.as_ref().is_some_and(|m| m <= bound);
        !(below(self, &other.min) || below(other, &self.min))
    }

    /// Bump kinds that, applied to the lower bound, stay inside the range.
    #[must_use]
    pub fn accepted_bumps(&self) -> Vec<BumpType> {
        let Some(max) = &self.max else {
            return BumpType::RELEASE_TYPES.to_vec();
        };
        match diff(&self.min, max) {
            Some(kind) => BumpType::RELEASE_TYPES
                .iter()
                .copied()
                .take_while(|t| *t < kind)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Parse a maintenance branch name such as `1.x` or `1.2.x`.
    #[must_use]
    pub fn from_maintenance_name(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            [major, "x"] => {
                let major: u64 = major.parse().ok()?;
                Some(Self::new(
                    Version::new(major, 0, 0),
                    Some(Version::new(major.checked_add(1)?, 0, 0)),
                ))
            }
            [major, minor, "x"] => {
                let major: u64 = major.parse().ok()?;
                let minor: u64 = minor.parse().ok()?;
                Some(Self::new(
                    Version::new(major, minor, 0),
                    Some(Version::new(major, minor.checked_add(1)?, 0)),
                ))
            }
            _ => None,
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    /// Accepts `N.x`, `N.N.x`, `>=a`, `>=a <b` and `>=a, <b`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(range) = Self::from_maintenance_name(s) {
            return Ok(range);
        }

        let invalid = || Error::config(format!("Invalid version range '{s}'"), "Use N.x, N.N.x or '>=A <B'");
        let mut min = None;
        let mut max = None;
        for part in s.split([' ', ',']).filter(|p| !p.is_empty()) {
            if let Some(v) = part.strip_prefix(">=") {
                min = Some(parse_version(v).map_err(|_| invalid())?);
            } else if let Some(v) = part.strip_prefix('<') {
                max = Some(parse_version(v).map_err(|_| invalid())?);
            } else {
                return Err(invalid());
            }
        }

        let min = min.ok_or_else(invalid)?;
        Ok(Self::new(min, max))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ">={}", self.min)?;
        if let Some(max) = &self.max {
            write!(f, " <{max}")?;
        }
        Ok(())
    }
}

impl PartialOrd for VersionRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.min.cmp(&other.min).then_with(|| match (&self.max, &other.max) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

/// Compute the next version of `branch`.
///
/// - no previous release: the initial version (with a `-<id>.1` suffix on
///   prerelease branches)
/// - release and maintenance branches: `bump` applied to the last release
/// - prerelease branches: the prerelease counter is incremented when the last
///   release is a prerelease of the same channel, otherwise a new counter is
///   started on top of the bumped base version
///
/// The result is not checked against the branch range; see [`validate_next_version`].
///
/// # Errors
///
/// Returns [`Error::InvalidNextVersion`] when a version component overflows.
pub fn next_version(
    branch: &Branch,
    last_release: Option<&LastRelease>,
    bump_type: BumpType,
    initial: &Version,
) -> Result<Version> {
    let prerelease_id = match &branch.kind {
        BranchType::Prerelease { identifier } => Some(identifier.as_str()),
        _ => None,
    };

    let next = match (last_release, prerelease_id) {
        (None, None) => Some(initial.clone()),
        (None, Some(id)) => Some(with_prerelease(initial, id, FIRST_PRERELEASE)),
        (Some(last), None) => bump(&last.version, bump_type),
        (Some(last), Some(id)) => {
            if !last.version.pre.is_empty() && last.channel == branch.channel {
                increment_prerelease(&last.version)
            } else {
                let base = Version::new(last.version.major, last.version.minor, last.version.patch);
                let base_bump = if bump_type == BumpType::Prerelease {
                    BumpType::Patch
                } else {
                    bump_type
                };
                bump(&base, base_bump).map(|v| with_prerelease(&v, id, FIRST_PRERELEASE))
            }
        }
    };

    next.ok_or_else(|| Error::InvalidNextVersion {
        branch: branch.name.clone(),
        version: last_release.map_or_else(
            || format!("{bump_type} bump"),
            |last| format!("{bump_type} bump of {}", last.version),
        ),
        range: branch
            .range
            .as_ref()
            .map_or_else(|| "*".to_string(), ToString::to_string),
        valid_branches: String::new(),
    })
}

fn with_prerelease(base: &Version, identifier: &str, counter: u64) -> Version {
    let mut version = Version::new(base.major, base.minor, base.patch);
    version.pre = Prerelease::new(&format!("{identifier}.{counter}")).unwrap_or(Prerelease::EMPTY);
    version
}

/// Check that `version` fits the range of a release or maintenance branch.
///
/// Prerelease branches have no range and always pass.
///
/// # Errors
///
/// Returns [`Error::InvalidNextVersion`] listing the branches whose range
/// accepts `bump_type`.
pub fn validate_next_version(
    branch: &Branch,
    branches: &[Branch],
    version: &Version,
    bump_type: BumpType,
) -> Result<()> {
    let Some(range) = &branch.range else {
        return Ok(());
    };
    if branch.is_prerelease() || range.satisfies(version) {
        return Ok(());
    }

    let valid_branches: Vec<&str> = branches
        .iter()
        .filter(|b| !b.is_prerelease() && b.accept.contains(&bump_type))
        .map(|b| b.name.as_str())
        .collect();

    Err(Error::InvalidNextVersion {
        branch: branch.name.clone(),
        version: version.to_string(),
        range: range.to_string(),
        valid_branches: valid_branches.join(", "),
    })
}
