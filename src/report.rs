//! Rendering of a [`RunResult`]. Both renderers are pure functions of their input.

use std::fmt::Write;

use serde::Serialize;

use crate::runner::{FailureKind, RunResult, StepOutcome, StepStatus};

/// Human-readable report: one line per step, failure details, then the verdict.
pub fn render_text(result: &RunResult) -> String {
    let mut out = String::new();

    for (index, outcome) in result.outcomes.iter().enumerate() {
        let tag = match &outcome.status {
            StepStatus::Passed => "PASS",
            StepStatus::Failed { .. } => "FAIL",
            StepStatus::NotRun => "SKIP",
        };
        let _ = writeln!(
            out,
            "[{tag}] {}. {} ({})",
            index + 1,
            outcome.label,
            outcome.method
        );

        if let StepStatus::Failed { kind, message } = &outcome.status {
            let kind = match kind {
                FailureKind::Io => "io",
                FailureKind::Protocol => "protocol",
                FailureKind::Step => "step",
            };
            let _ = writeln!(out, "       {kind} error: {message}");
            match &outcome.response {
                Some(payload) => {
                    let _ = writeln!(out, "       received: {payload}");
                }
                None => {
                    let _ = writeln!(out, "       received: <nothing>");
                }
            }
        }
    }

    if result.interrupted {
        let _ = writeln!(out, "Run interrupted.");
    }

    let verdict = if result.all_passed() { "PASSED" } else { "FAILED" };
    let _ = writeln!(
        out,
        "Result: {verdict} ({}/{} steps passed)",
        result.passed_count(),
        result.outcomes.len()
    );
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    interrupted: bool,
    steps: &'a [StepOutcome],
}

/// Machine-readable report.
pub fn render_json(result: &RunResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        passed: result.all_passed(),
        interrupted: result.interrupted,
        steps: &result.outcomes,
    })
}
