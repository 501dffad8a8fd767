//! Release notes generation and formatting.
//!
//! Notes are Markdown: a version header linking to the comparison with the
//! previous release, then one section per kind of change.

use crate::context::{Commit, HookContext};
use crate::error::Result;
use crate::git::web_url;
use crate::plugins::{ConventionalCommit, Plugin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Section titles by commit type, in output order.
const SECTIONS: [(&str, &str); 3] = [
    ("feat", "Features"),
    ("fix", "Bug Fixes"),
    ("perf", "Performance Improvements"),
];

/// Generates Markdown release notes from conventional commits.
#[derive(Debug, Clone, Default)]
pub struct ReleaseNotesGenerator {
    date: Option<DateTime<Utc>>,
}

impl ReleaseNotesGenerator {
    /// Creates a generator dating notes with the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self { date: None }
    }

    /// Sets a fixed release date.
    #[must_use]
    pub const fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Render notes for the commits of one release.
    #[must_use]
    pub fn render(
        &self,
        version: &str,
        previous_tag: Option<&str>,
        tag: &str,
        repository: Option<&str>,
        commits: &[Commit],
    ) -> String {
        let mut output = String::new();
        let date = self.date.unwrap_or_else(Utc::now).format("%Y-%m-%d");

        match (repository, previous_tag) {
            (Some(repo), Some(previous)) => {
                let _ = writeln!(output, "## [{version}]({repo}/compare/{previous}...{tag}) ({date})\n");
            }
            _ => {
                let _ = writeln!(output, "## {version} ({date})\n");
            }
        }

        let parsed: Vec<ConventionalCommit> = commits.iter().filter_map(ConventionalCommit::parse).collect();

        let breaking: Vec<&ConventionalCommit> = parsed.iter().filter(|c| c.breaking).collect();
        if !breaking.is_empty() {
            output.push_str("### ⚠ BREAKING CHANGES\n\n");
            for commit in breaking {
                let text = commit.breaking_description.as_deref().unwrap_or(&commit.description);
                output.push_str(&format_item(commit.scope.as_deref(), text, &commit.hash, repository));
            }
            output.push('\n');
        }

        for (kind, title) in SECTIONS {
            let items: Vec<&ConventionalCommit> = parsed.iter().filter(|c| c.commit_type == kind).collect();
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(output, "### {title}\n");
            for commit in items {
                output.push_str(&format_item(
                    commit.scope.as_deref(),
                    &commit.description,
                    &commit.hash,
                    repository,
                ));
            }
            output.push('\n');
        }

        output.trim_end().to_string()
    }
}

/// Format a single change as a Markdown list item.
fn format_item(scope: Option<&str>, text: &str, hash: &str, repository: Option<&str>) -> String {
    let mut item = String::from("* ");
    if let Some(scope) = scope {
        let _ = write!(item, "**{scope}:** ");
    }
    item.push_str(text);

    let short = hash.get(..7).unwrap_or(hash);
    match repository {
        Some(repo) => {
            let _ = writeln!(item, " ([{short}]({repo}/commit/{hash}))");
        }
        None => {
            let _ = writeln!(item, " ({short})");
        }
    }
    item
}

#[async_trait]
impl Plugin for ReleaseNotesGenerator {
    fn name(&self) -> &str {
        "release-notes-generator"
    }

    async fn generate_notes(&self, ctx: &HookContext<'_>) -> Result<Option<String>> {
        let Some(next) = ctx.next_release else {
            return Ok(None);
        };
        let repository = ctx.options.repository_url.as_deref().and_then(web_url);
        Ok(Some(self.render(
            &next.version.to_string(),
            ctx.last_release.map(|l| l.git_tag.as_str()),
            &next.git_tag,
            repository.as_deref(),
            ctx.commits,
        )))
    }
}
