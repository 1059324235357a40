//! Run report rendering and the delivery capability.
//!
//! The orchestrator's `RunResult` is the sole payload handed onward for
//! delivery. How it travels (mail, chat, log) is the sink's concern;
//! [`LogReportSink`] is the built-in default and an SMTP sink can be
//! plugged in without touching the pipeline.

use crate::error::Result;
use crate::types::RunResult;
use async_trait::async_trait;
use tracing::info;

/// Capability that delivers a finished run's aggregate result.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one run report.
    async fn deliver(&self, result: &RunResult) -> Result<()>;
}

/// Render a run result as a (subject, body) pair.
pub fn render_report(result: &RunResult) -> (String, String) {
    let subject = format!(
        "Network Backup Report: {} Success, {} Failed",
        result.successful, result.failed
    );

    let mut body = format!(
        "Backup completed.\n\nSuccess: {}\nFailed: {}\n",
        result.successful, result.failed
    );
    if !result.errors.is_empty() {
        body.push_str("\nErrors:\n");
        body.push_str(&result.errors.join("\n"));
        body.push('\n');
    }

    (subject, body)
}

/// Sink that emits the report through the process log.
#[derive(Debug, Default)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn deliver(&self, result: &RunResult) -> Result<()> {
        let (subject, body) = render_report(result);
        info!(%subject, "Backup report\n{}", body);
        Ok(())
    }
}
