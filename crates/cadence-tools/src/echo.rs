//! A deterministic, in-memory payload runner used by the core's
//! `EchoEvaluator` for tests and demos that must not spawn processes.
//!
//! A payload prefixed with `fail:` produces a failing outcome carrying the
//! remainder of the payload as the error message, so callers can exercise
//! the evaluator-error path without a live shell.

use super::ToolOutcome;

const FAIL_PREFIX: &str = "fail:";

pub fn run(payload: &str) -> ToolOutcome {
    match payload.strip_prefix(FAIL_PREFIX) {
        Some(reason) => ToolOutcome::failure(reason.trim().to_string()),
        None => ToolOutcome::success(payload.to_string()),
    }
}
