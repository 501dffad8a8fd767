//! Rendering of the release result on stdout.

use semrel_release::ReleaseOutcome;
use std::fmt::Write;

/// JSON document for a run: the outcome, or `false` when nothing was released.
pub fn to_json(outcome: Option<&ReleaseOutcome>) -> serde_json::Result<String> {
    match outcome {
        Some(outcome) => serde_json::to_string_pretty(outcome),
        None => Ok("false".to_string()),
    }
}

/// One-line summary of a run.
pub fn summary(outcome: Option<&ReleaseOutcome>, dry_run: bool) -> String {
    let Some(outcome) = outcome else {
        return "No release published".to_string();
    };

    let mut line = match &outcome.next_release {
        Some(next) if dry_run => format!("The next release is {} ({}), dry run", next.version, next.git_tag),
        Some(next) => format!(
            "Published release {} on {}",
            next.version,
            next.channel
                .as_deref()
                .map_or_else(|| "the default channel".to_string(), |c| format!("channel {c}"))
        ),
        None => "No new version".to_string(),
    };

    let back_ports = outcome.releases.iter().filter(|r| {
        outcome
            .next_release
            .as_ref()
            .is_none_or(|next| next.git_tag != r.git_tag)
    });
    let count = back_ports.count();
    if count > 0 {
        let _ = write!(line, ", {count} release(s) added to channels");
    }
    line
}
