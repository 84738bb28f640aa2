//! Core data models used throughout ci-triage.
//!
//! These types flow through the triage pipeline: a [`Platform`] is detected
//! first, then a failed step and an error context are extracted, and finally
//! an [`AnalysisResult`] comes back from the language model.

use serde::{Serialize, Serializer};
use std::fmt;

/// Returned by the failed-step extractor when no rule matches.
pub const NO_FAILED_STEP: &str = "Could not identify specific failed step";

/// Returned by the error-context extractor when no pattern matches.
pub const NO_ERROR_CONTEXT: &str = "No specific error context found";

/// The CI/CD system that produced a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    GitHubActions,
    Jenkins,
    GitLabCI,
    Unknown,
}

impl Platform {
    /// Human-readable name, used on the wire and in the model prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GitHubActions => "GitHub Actions",
            Platform::Jenkins => "Jenkins",
            Platform::GitLabCI => "GitLab CI",
            Platform::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output of the three extraction stages, before the model is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLog {
    pub platform: Platform,
    pub failed_step: String,
    pub error_context: String,
}

/// Root cause and suggested fix returned by the language model.
///
/// Both fields are always populated; on failure they hold fallback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub root_cause: String,
    pub suggested_fix: String,
}

/// Full response body for `POST /analyze` and `ci-triage analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub platform: Platform,
    pub failed_step: String,
    pub error_context: String,
    pub root_cause: String,
    pub suggested_fix: String,
}

impl AnalysisReport {
    pub fn new(parsed: ParsedLog, analysis: AnalysisResult) -> Self {
        Self {
            platform: parsed.platform,
            failed_step: parsed.failed_step,
            error_context: parsed.error_context,
            root_cause: analysis.root_cause,
            suggested_fix: analysis.suggested_fix,
        }
    }
}
