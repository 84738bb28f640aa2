//! Error context extraction.
//!
//! Two tiers:
//!
//! 1. **Generic error phrasing**, tried for every platform. Five patterns are
//!    checked in priority order; the first pattern with any match wins and
//!    its first occurrence is returned together with up to
//!    [`CONTEXT_RADIUS`] characters on either side.
//! 2. **Platform markers** (`##[error]`, `ERROR:`, `FATAL:`), used only when
//!    no generic pattern matches. The marker's block is returned as-is.
//!
//! # Blocks
//!
//! Every pattern matches a *head* (e.g. `npm ERR!`) and then extends lazily
//! to the end of its block: the first position at or after the head where a
//! blank line starts, a newline is followed by a non-whitespace character, or
//! the text ends. A single trailing newline at the very end of the log is
//! not part of the block.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Platform, NO_ERROR_CONTEXT};

/// Characters of surrounding log kept on each side of a generic match.
pub const CONTEXT_RADIUS: usize = 200;

/// Generic error heads in priority order. All are case-insensitive.
static GENERIC_PATTERNS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)(?:error|exception|failure|failed):")
            .expect("colon error regex is valid"),
        Regex::new(r"(?i)(?:Error|Exception|Failure):").expect("capitalized error regex is valid"),
        Regex::new(r"(?is)(?:npm ERR!|pip.*?error:|maven.*?error:)")
            .expect("package manager regex is valid"),
        Regex::new(r"(?i)(?:syntax error|runtime error|compilation failed)")
            .expect("phrase regex is valid"),
        Regex::new(r"(?i)exit code [1-9]\d*").expect("exit code regex is valid"),
    ]
});

static GITHUB_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##\[error\]").expect("github marker regex is valid"));
static JENKINS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ERROR:").expect("jenkins marker regex is valid"));
static GITLAB_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:ERROR|FATAL):").expect("gitlab marker regex is valid"));

/// Extract the snippet of `log` most likely to explain the failure.
///
/// `_failed_step` is accepted so callers can pass the previous stage's
/// output; the current rules do not consult it.
pub fn extract(log: &str, platform: Platform, _failed_step: &str) -> String {
    if let Some(context) = generic_context(log) {
        return context.to_string();
    }

    platform_context(log, platform)
        .map(str::to_string)
        .unwrap_or_else(|| NO_ERROR_CONTEXT.to_string())
}

fn generic_context(log: &str) -> Option<&str> {
    GENERIC_PATTERNS.iter().find_map(|re| {
        let head = re.find(log)?;
        let end = block_end(log, head.end());
        Some(window(log, head.start(), end, CONTEXT_RADIUS).trim())
    })
}

fn platform_context(log: &str, platform: Platform) -> Option<&str> {
    let marker: &Regex = match platform {
        Platform::GitHubActions => &*GITHUB_MARKER,
        Platform::Jenkins => &*JENKINS_MARKER,
        Platform::GitLabCI => &*GITLAB_MARKER,
        Platform::Unknown => return None,
    };
    let head = marker.find(log)?;
    Some(log[head.start()..block_end(log, head.end())].trim())
}

/// Byte offset where the block containing `from` ends.
fn block_end(log: &str, from: usize) -> usize {
    let mut pos = from;
    while let Some(offset) = log[pos..].find('\n') {
        let newline = pos + offset;
        match log[newline + 1..].chars().next() {
            None => return newline,
            Some(next) if next == '\n' || !next.is_whitespace() => return newline,
            Some(_) => pos = newline + 1,
        }
    }
    log.len()
}

/// `log[start..end]` widened by up to `radius` characters on each side.
fn window(log: &str, start: usize, end: usize, radius: usize) -> &str {
    let lo = log[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let hi = log[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(log.len());
    &log[lo..hi]
}
