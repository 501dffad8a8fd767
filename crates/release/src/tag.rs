//! Git tag naming.
//!
//! A tag format is a template holding a single `{version}` placeholder. Tags
//! published on a non-default channel carry the channel after the version
//! (`v1.2.0@next`), so every `(version, channel)` pair maps to one tag.

use crate::error::{Error, Result};
use crate::version::parse_version;
use regex::Regex;
use semver::Version;
use std::fmt;

/// Placeholder replaced by the version in a tag format.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Default tag format.
pub const DEFAULT_TAG_FORMAT: &str = "v{version}";

/// Separator between version and channel inside a tag name.
const CHANNEL_SEPARATOR: char = '@';

/// Validated tag-name template.
#[derive(Debug, Clone)]
pub struct TagFormat {
    template: String,
    pattern: Regex,
}

impl TagFormat {
    /// Validate and compile a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTagFormat`] when the placeholder is missing or
    /// repeated, or when rendering produces an invalid git reference.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let occurrences = template.matches(VERSION_PLACEHOLDER).count();
        if occurrences != 1 {
            return Err(Error::invalid_tag_format(
                &template,
                format!("expected one {VERSION_PLACEHOLDER} placeholder, found {occurrences}"),
            ));
        }

        let sample = template.replace(VERSION_PLACEHOLDER, "1.0.0");
        if !is_valid_ref_name(&sample) {
            return Err(Error::invalid_tag_format(
                &template,
                format!("'{sample}' is not a valid git reference name"),
            ));
        }

        let (prefix, suffix) = template
            .split_once(VERSION_PLACEHOLDER)
            .unwrap_or((template.as_str(), ""));
        let pattern = Regex::new(&format!(
            "^{}(?P<version>.+?)(?:{}(?P<channel>[^@]+))?{}$",
            regex::escape(prefix),
            CHANNEL_SEPARATOR,
            regex::escape(suffix)
        ))
        .map_err(|e| Error::invalid_tag_format(&template, e.to_string()))?;

        Ok(Self { template, pattern })
    }

    /// The raw template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Tag name of `version` on `channel` (`None` is the default channel).
    #[must_use]
    pub fn render(&self, version: &Version, channel: Option<&str>) -> String {
        let value = match channel {
            Some(channel) => format!("{version}{CHANNEL_SEPARATOR}{channel}"),
            None => version.to_string(),
        };
        self.template.replace(VERSION_PLACEHOLDER, &value)
    }

    /// Recover `(version, channel)` from a tag name.
    ///
    /// Returns `None` for tags that were not produced by this format.
    #[must_use]
    pub fn parse(&self, tag: &str) -> Option<(Version, Option<String>)> {
        let captures = self.pattern.captures(tag)?;
        let version = parse_version(captures.name("version")?.as_str()).ok()?;
        let channel = captures.name("channel").map(|c| c.as_str().to_string());
        Some((version, channel))
    }
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Subset of `git check-ref-format` rules relevant to tag names.
fn is_valid_ref_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(['-', '.', '/'])
        && !name.ends_with(['.', '/'])
        && !name.ends_with(".lock")
        && !name.contains("..")
        && !name.contains("@{")
        && !name.contains("//")
        && name
            .chars()
            .all(|c| !c.is_control() && !matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
}
