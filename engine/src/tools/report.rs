//! Session report tool
//!
//! Writes a markdown summary of the session (transcript plus the artifacts
//! the other agents left in scratch) to `<data_dir>/reports/`.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::ToolArgs;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use crate::agent::{Tool, ToolScope};
use crate::services::render::session_slug;
use crate::workflow::context::{scratch, HistoryRole, SessionState};

pub struct GenerateReportTool {
    reports_dir: PathBuf,
}

impl GenerateReportTool {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for GenerateReportTool {
    fn name(&self) -> &str {
        "generate_report"
    }

    fn description(&self) -> &str {
        "Write a report of everything done in this session and return its path"
    }

    async fn invoke(&self, _args: ToolArgs, scope: &mut ToolScope<'_>) -> Result<String, EngineError> {
        let session_id = scope.state.session_id().to_string();
        let body = render_report(scope.state, &session_id);

        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let path = self
            .reports_dir
            .join(format!("report-{}.md", session_slug(&session_id)));
        tokio::fs::write(&path, body).await?;

        let path = path.display().to_string();
        info!(path = %path, "Report written");
        scope.state.set_scratch(scratch::REPORT_PATH, path.clone());
        Ok(format!("Report written to {}", path))
    }
}

pub(crate) fn render_report(state: &SessionState, session_id: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Session report\n");
    let _ = writeln!(out, "- Session: `{}`", session_id);
    if let Some(user) = &state.user {
        let _ = writeln!(out, "- Started: {}", user.started_at.to_rfc3339());
    }

    let mut results = Vec::new();
    if let Some(path) = state.scratch_str(scratch::DIAGRAM_ARTIFACT) {
        results.push(format!("Diagram: `{}`", path));
    }
    if let Some(error) = state.scratch_str(scratch::DIAGRAM_SYNTAX_ERROR) {
        results.push(format!("Unresolved diagram error:\n\n```\n{}\n```", error));
    }
    if let Some(lookup) = state.scratch(scratch::LAST_PRICE_LOOKUP) {
        let service = lookup["service"].as_str().unwrap_or("unknown service");
        let mut entry = format!("Prices for {}:", service);
        if let Some(prices) = lookup["prices"].as_array() {
            for p in prices {
                let _ = write!(
                    entry,
                    "\n  - {}: ${} per {}",
                    p["description"].as_str().unwrap_or(""),
                    p["price_usd"].as_str().unwrap_or("?"),
                    p["unit"].as_str().unwrap_or("unit")
                );
            }
        }
        results.push(entry);
    }
    if let Some(passages) = state.scratch_str(scratch::RAG_SEARCH_RESPONSE) {
        if !passages.is_empty() {
            results.push(format!("Knowledge base findings:\n\n> {}", passages.replace('\n', "\n> ")));
        }
    }

    let _ = writeln!(out, "\n## Results\n");
    if results.is_empty() {
        let _ = writeln!(out, "Nothing was produced in this session.");
    } else {
        for r in results {
            let _ = writeln!(out, "- {}", r);
        }
    }

    let _ = writeln!(out, "\n## Transcript\n");
    for entry in &state.history {
        let who = match entry.role {
            HistoryRole::User => "user",
            HistoryRole::Assistant => "assistant",
            HistoryRole::System => "system",
        };
        let _ = writeln!(
            out,
            "- `{}` **{}** ({}): {}",
            entry.at.format("%H:%M:%S"),
            who,
            entry.step,
            entry.content.replace('\n', " ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::outbox::Outbox;
    use serde_json::json;

    #[test]
    fn test_report_lists_results_and_transcript() {
        let mut state = SessionState::default();
        state.initialize("s1");
        state.record("concierge", HistoryRole::User, "price of s3");
        state.set_scratch(
            scratch::LAST_PRICE_LOOKUP,
            json!({"service": "AmazonS3", "prices": [
                {"description": "Standard", "price_usd": "0.023", "unit": "GB-Mo"}
            ]}),
        );

        let report = render_report(&state, "s1");

        assert!(report.contains("Session: `s1`"));
        assert!(report.contains("Prices for AmazonS3"));
        assert!(report.contains("Standard: $0.023 per GB-Mo"));
        assert!(report.contains("**user** (concierge): price of s3"));
    }

    #[tokio::test]
    async fn test_report_written_under_reports_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = GenerateReportTool::new(dir.path().join("reports"));
        let mut state = SessionState::default();
        state.initialize("abc");
        let mut outbox = Outbox::default();
        let mut scope = ToolScope::new(&mut state, &mut outbox, "Report Agent", "report");

        let out = tool.invoke(ToolArgs::new(), &mut scope).await.unwrap();

        let path = dir.path().join("reports").join("report-abc.md");
        assert!(path.exists());
        assert!(out.contains("report-abc.md"));
        assert!(state.scratch_str(scratch::REPORT_PATH).is_some());
    }
}
