//! Failed step extraction.
//!
//! Each platform has an ordered pair of rules; the first rule that matches
//! names the failing step, job, stage, or command. When neither matches (or
//! the platform is unknown) the [`NO_FAILED_STEP`] sentinel is returned.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Platform, NO_FAILED_STEP};

static GITHUB_ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##\[error\]([^\n]*)").expect("github error regex is valid"));
static GITHUB_FAILED_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)##\[group\](.*?)(?:failed|error)").expect("github group regex is valid")
});
static JENKINS_STAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:FAILURE|ERROR).*?Stage "(.*?)""#).expect("jenkins stage regex is valid")
});
static JENKINS_ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ERROR|FAILURE): ([^\n]*)").expect("jenkins error regex is valid")
});
static GITLAB_RUNNER_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Running with gitlab-runner.*?\n\$ ([^\n]*)")
        .expect("gitlab command regex is valid")
});
static GITLAB_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)section_start:\d+:([^\n]*)").expect("gitlab section regex is valid")
});
static ERROR_OR_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)error|failed").expect("error word regex is valid"));

const GITLAB_JOB_FAILED: &str = "ERROR: Job failed";

/// Name the failing unit of work in `log`, or return [`NO_FAILED_STEP`].
pub fn extract(log: &str, platform: Platform) -> String {
    let found = match platform {
        Platform::GitHubActions => github_step(log),
        Platform::Jenkins => jenkins_step(log),
        Platform::GitLabCI => gitlab_step(log),
        Platform::Unknown => None,
    };
    found.unwrap_or_else(|| NO_FAILED_STEP.to_string())
}

fn github_step(log: &str) -> Option<String> {
    first_capture(&GITHUB_ERROR_LINE, log)
        .or_else(|| first_capture(&GITHUB_FAILED_GROUP, log))
        .map(str::to_string)
}

fn jenkins_step(log: &str) -> Option<String> {
    if let Some(stage) = first_capture(&JENKINS_STAGE, log) {
        return Some(format!("Stage: {}", stage));
    }
    first_capture(&JENKINS_ERROR_LINE, log).map(str::to_string)
}

fn gitlab_step(log: &str) -> Option<String> {
    // Only the first marker/command can qualify: any later candidate ends
    // further into the log, so it can only see fewer failure lines after it.
    if let Some(caps) = GITLAB_RUNNER_COMMAND.captures(log) {
        let command = caps.get(1)?;
        if log[command.end()..].contains(GITLAB_JOB_FAILED) {
            return Some(format!("Command: {}", command.as_str().trim()));
        }
    }

    let caps = GITLAB_SECTION.captures(log)?;
    let name = caps.get(1)?;
    if ERROR_OR_FAILED.is_match(&log[name.end()..]) {
        return Some(format!("Section: {}", name.as_str().trim()));
    }
    None
}

/// Trimmed first capture group of the leftmost match.
fn first_capture<'a>(re: &Regex, log: &'a str) -> Option<&'a str> {
    re.captures(log)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}
