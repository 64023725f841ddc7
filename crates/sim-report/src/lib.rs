//! The report (spec component C10): aggregates fixture outcomes into a
//! [`SimulationReport`] and renders it as Markdown or self-contained HTML.
//! Purely a formatting layer — it has no opinion on how an outcome was
//! reached.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use sim_diff::{DiffResult, Difference, DifferenceKind};

/// What happened when the runner replayed one fixture against the
/// candidate. A diffed fixture may still have failed (`DiffResult::passed
/// == false`); the other variants are failures the diff engine never ran
/// for, because replay itself could not produce a candidate response.
#[derive(Debug, Clone)]
pub enum FixtureOutcome {
    Diffed(DiffResult),
    StubMiss { fixture_id: String, endpoint: String, message: String },
    BlockedWrite { fixture_id: String, endpoint: String, message: String },
    Error { fixture_id: String, endpoint: String, message: String },
}

impl FixtureOutcome {
    fn fixture_id(&self) -> &str {
        match self {
            FixtureOutcome::Diffed(d) => &d.fixture_id,
            FixtureOutcome::StubMiss { fixture_id, .. }
            | FixtureOutcome::BlockedWrite { fixture_id, .. }
            | FixtureOutcome::Error { fixture_id, .. } => fixture_id,
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            FixtureOutcome::Diffed(d) => &d.endpoint,
            FixtureOutcome::StubMiss { endpoint, .. }
            | FixtureOutcome::BlockedWrite { endpoint, .. }
            | FixtureOutcome::Error { endpoint, .. } => endpoint,
        }
    }

    fn passed(&self) -> bool {
        matches!(self, FixtureOutcome::Diffed(d) if d.passed)
    }

    fn status_label(&self) -> &'static str {
        match self {
            FixtureOutcome::Diffed(d) if d.passed => "pass",
            FixtureOutcome::Diffed(_) => "fail",
            FixtureOutcome::StubMiss { .. } => "stub-miss",
            FixtureOutcome::BlockedWrite { .. } => "blocked-write",
            FixtureOutcome::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReportCounters {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub stub_misses: usize,
    pub blocked_writes: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulationReport {
    pub counters: ReportCounters,
    pub outcomes: Vec<FixtureOutcomeSummary>,
}

/// A serializable projection of [`FixtureOutcome`], since `DiffResult`
/// already serializes on its own but the other variants need one shared
/// shape for the JSON report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FixtureOutcomeSummary {
    pub fixture_id: String,
    pub endpoint: String,
    pub status: &'static str,
    pub message: Option<String>,
    pub differences: Vec<Difference>,
}

impl SimulationReport {
    pub fn from_outcomes(outcomes: Vec<FixtureOutcome>) -> SimulationReport {
        let mut counters = ReportCounters::default();
        let mut summaries = Vec::with_capacity(outcomes.len());

        for outcome in &outcomes {
            counters.total += 1;
            match outcome {
                FixtureOutcome::Diffed(d) if d.passed => counters.passed += 1,
                FixtureOutcome::Diffed(_) => counters.failed += 1,
                FixtureOutcome::StubMiss { .. } => counters.stub_misses += 1,
                FixtureOutcome::BlockedWrite { .. } => counters.blocked_writes += 1,
                FixtureOutcome::Error { .. } => counters.errors += 1,
            }
        }

        for outcome in outcomes {
            let status = outcome.status_label();
            let fixture_id = outcome.fixture_id().to_string();
            let endpoint = outcome.endpoint().to_string();
            let (message, differences) = match outcome {
                FixtureOutcome::Diffed(d) => (None, d.differences),
                FixtureOutcome::StubMiss { message, .. }
                | FixtureOutcome::BlockedWrite { message, .. }
                | FixtureOutcome::Error { message, .. } => (Some(message), Vec::new()),
            };
            summaries.push(FixtureOutcomeSummary { fixture_id, endpoint, status, message, differences });
        }

        SimulationReport { counters, outcomes: summaries }
    }

    /// Per spec §4.11 "Exit code: 0 iff failed == 0 AND stub_misses == 0 AND errors == ∅".
    pub fn exit_code(&self) -> i32 {
        if self.counters.failed == 0 && self.counters.stub_misses == 0 && self.counters.errors == 0 {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("SimulationReport always serializes")
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Simulation report\n\n");
        out.push_str(&format!(
            "| total | passed | failed | stub misses | blocked writes | errors |\n\
             |---|---|---|---|---|---|\n\
             | {} | {} | {} | {} | {} | {} |\n\n",
            self.counters.total,
            self.counters.passed,
            self.counters.failed,
            self.counters.stub_misses,
            self.counters.blocked_writes,
            self.counters.errors,
        ));

        out.push_str("| fixture | endpoint | status | detail |\n|---|---|---|---|\n");
        for outcome in &self.outcomes {
            let detail = if !outcome.differences.is_empty() {
                outcome
                    .differences
                    .iter()
                    .map(|d| format!("{:?} at `{}`", d.kind, d.path))
                    .collect::<Vec<_>>()
                    .join("; ")
            } else {
                outcome.message.clone().unwrap_or_default()
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                outcome.fixture_id, outcome.endpoint, outcome.status, escape_pipes(&detail)
            ));
        }
        out
    }

    /// A self-contained HTML document: no external stylesheet or script
    /// references, so the report can be opened straight from disk.
    pub fn render_html(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["fixture", "endpoint", "status", "detail"]);

        for outcome in &self.outcomes {
            let detail = if !outcome.differences.is_empty() {
                outcome
                    .differences
                    .iter()
                    .map(|d| format!("{:?} at {}", d.kind, d.path))
                    .collect::<Vec<_>>()
                    .join("; ")
            } else {
                outcome.message.clone().unwrap_or_default()
            };
            table.add_row(vec![
                Cell::new(&outcome.fixture_id),
                Cell::new(&outcome.endpoint),
                Cell::new(outcome.status),
                Cell::new(detail),
            ]);
        }

        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Simulation report</title></head><body>\n\
             <h1>Simulation report</h1>\n\
             <p>total={} passed={} failed={} stub_misses={} blocked_writes={} errors={}</p>\n\
             <pre>{}</pre>\n\
             </body></html>\n",
            self.counters.total,
            self.counters.passed,
            self.counters.failed,
            self.counters.stub_misses,
            self.counters.blocked_writes,
            self.counters.errors,
            html_escape(&table.to_string()),
        )
    }
}

fn escape_pipes(s: &str) -> String {
    s.replace('|', "\\|")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
