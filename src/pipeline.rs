//! The triage pipeline: detect → failed step → error context → model.
//!
//! Every stage consumes the full log and always yields a value, so a log
//! nothing recognizes still produces a complete report made of sentinels.

use crate::llm::{self, CompletionClient};
use crate::models::{AnalysisReport, ParsedLog};
use crate::{error_context, failed_step, platform};

/// Run the three extraction stages. Pure; performs no I/O.
pub fn parse_log(log: &str) -> ParsedLog {
    let platform = platform::detect(log);
    let failed_step = failed_step::extract(log, platform);
    let error_context = error_context::extract(log, platform, &failed_step);

    tracing::debug!(
        %platform,
        failed_step = %failed_step,
        context_chars = error_context.chars().count(),
        "log parsed"
    );

    ParsedLog {
        platform,
        failed_step,
        error_context,
    }
}

/// Parse `log` and ask `client` for a root cause and fix.
///
/// Model failures are folded into the report's `root_cause` and
/// `suggested_fix`; this function itself cannot fail.
pub async fn analyze_log(client: &dyn CompletionClient, log: &str) -> AnalysisReport {
    let parsed = parse_log(log);
    let analysis = llm::analyze(client, &parsed).await;
    AnalysisReport::new(parsed, analysis)
}
