//! Last release lookup and back-port computation.

use crate::branch::{Branch, ReleaseTag};
use crate::context::{LastRelease, NextRelease, ReleaseToAdd};
use crate::tag::TagFormat;
use crate::version::{BumpType, diff};
use semver::Version;
use std::collections::HashSet;

/// Most recent release of `branch`, optionally strictly below `before`.
///
/// Prerelease tags only count on prerelease branches, and only when they were
/// published on the branch's own channel. When a version carries several tags,
/// the one on the branch's channel is preferred.
#[must_use]
pub fn last_release(branch: &Branch, tag_format: &TagFormat, before: Option<&Version>) -> Option<LastRelease> {
    let channel = branch.channel.as_deref();
    branch
        .tags
        .iter()
        .filter(|tag| {
            tag.version.pre.is_empty() || (branch.is_prerelease() && tag.channel.as_deref() == channel)
        })
        .filter(|tag| before.is_none_or(|b| tag.version < *b))
        .max_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| (a.channel.as_deref() == channel).cmp(&(b.channel.as_deref() == channel)))
        })
        .map(|tag| LastRelease {
            version: tag.version.clone(),
            channel: tag.channel.clone(),
            git_tag: tag.git_tag.clone(),
            git_head: tag.git_head.clone(),
            name: tag_format.render(&tag.version, None),
        })
}

/// Releases published on higher branches that the branch at `index` has
/// merged but not yet tagged on its own channel, oldest first.
///
/// Candidates outside the branch range are skipped. On branches with a merge
/// range only releases below its lower bound are skipped; releases above it
/// are returned so the caller can reject them.
#[must_use]
pub fn releases_to_add(index: usize, branches: &[Branch], tag_format: &TagFormat) -> Vec<ReleaseToAdd> {
    let Some(branch) = branches.get(index) else {
        return Vec::new();
    };
    if branch.is_prerelease() {
        return Vec::new();
    }

    let own_channel = branch.channel.as_deref();
    let higher_channels: HashSet<Option<&str>> = branches[index + 1..]
        .iter()
        .filter(|b| !b.is_prerelease())
        .map(|b| b.channel.as_deref())
        .filter(|c| *c != own_channel)
        .collect();

    let mut seen: HashSet<&Version> = HashSet::new();
    let mut candidates: Vec<&ReleaseTag> = branch
        .tags
        .iter()
        .filter(|tag| tag.version.pre.is_empty())
        .filter(|tag| higher_channels.contains(&tag.channel.as_deref()))
        .filter(|tag| !branch.has_tag(&tag.version, own_channel))
        .filter(|tag| match &branch.merge_range {
            // Releases above the merge range are kept so the caller rejects them
            Some(merge_range) => tag.version >= merge_range.min,
            None => branch.range.as_ref().is_none_or(|r| r.satisfies(&tag.version)),
        })
        .filter(|tag| seen.insert(&tag.version))
        .collect();
    candidates.sort_by(|a, b| a.version.cmp(&b.version));

    candidates
        .into_iter()
        .map(|current| {
            let last = last_release(branch, tag_format, Some(&current.version));
            let bump = last
                .as_ref()
                .and_then(|l| diff(&l.version, &current.version))
                .unwrap_or(BumpType::Major);
            ReleaseToAdd {
                next_release: NextRelease {
                    bump,
                    channel: branch.channel.clone(),
                    git_head: current.git_head.clone(),
                    version: current.version.clone(),
                    git_tag: tag_format.render(&current.version, own_channel),
                    name: tag_format.render(&current.version, None),
                    notes: String::new(),
                },
                last_release: last,
                current_release: current.clone(),
            }
        })
        .collect()
}
