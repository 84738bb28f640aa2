//! CI/CD platform detection.
//!
//! Signature rules are checked in a fixed order and the first platform with a
//! matching rule wins. A GitHub Actions log that happens to echo a Jenkins
//! `[Pipeline]` line is still a GitHub Actions log, so the order
//! GitHub Actions → Jenkins → GitLab CI must not change.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Platform;

static GITHUB_COMMANDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"##\[(?:group|endgroup|error|warning)\]").expect("github command regex is valid")
});
static GITHUB_ANNOTATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::(?:error|warning|notice|debug|group|endgroup)::")
        .expect("github annotation regex is valid")
});
static JENKINS_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:Pipeline|INFO|WARNING|ERROR)\]").expect("jenkins tag regex is valid")
});
static JENKINS_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Started by|Finished: (?:SUCCESS|FAILURE|ABORTED)")
        .expect("jenkins phrase regex is valid")
});
static GITLAB_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Running with GitLab Runner|Job succeeded|Job failed")
        .expect("gitlab phrase regex is valid")
});
static GITLAB_SECTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:section_start|section_end):\d+:[a-zA-Z0-9_]+")
        .expect("gitlab section regex is valid")
});

/// Ordered signature table: each platform with the patterns that identify it.
static SIGNATURES: LazyLock<[(Platform, [&'static Regex; 2]); 3]> = LazyLock::new(|| {
    [
        (
            Platform::GitHubActions,
            [&*GITHUB_COMMANDS, &*GITHUB_ANNOTATIONS],
        ),
        (Platform::Jenkins, [&*JENKINS_TAGS, &*JENKINS_PHRASES]),
        (Platform::GitLabCI, [&*GITLAB_PHRASES, &*GITLAB_SECTIONS]),
    ]
});

/// Classify a log by the first platform whose signature appears anywhere in it.
///
/// Returns [`Platform::Unknown`] when nothing matches.
pub fn detect(log: &str) -> Platform {
    SIGNATURES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(log)))
        .map(|(platform, _)| *platform)
        .unwrap_or(Platform::Unknown)
}
