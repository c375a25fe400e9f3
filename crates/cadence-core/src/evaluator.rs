//! The `Evaluator` collaborator (spec §6): a single hook that hands a
//! task's opaque payload to whatever actually runs it and awaits
//! completion. The engine and facade depend only on this trait — never on
//! a concrete evaluator — so the payload language stays opaque to the
//! scheduler core.

use async_trait::async_trait;

use crate::error::{Error, Result};

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, payload: &str) -> Result<String>;
}

/// Runs a payload as a shell command line. The crate's usable, runnable
/// default — commits to no particular payload language, since the original
/// system's evaluator is out of scope here.
pub struct ShellEvaluator;

impl ShellEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evaluator for ShellEvaluator {
    async fn evaluate(&self, payload: &str) -> Result<String> {
        let outcome = cadence_tools::shell::run(payload).await;
        if outcome.success {
            Ok(outcome.output)
        } else {
            Err(Error::Evaluator(
                outcome.error.unwrap_or_else(|| "command failed".to_string()),
            ))
        }
    }
}

/// Deterministic in-memory evaluator for tests and demos. A payload
/// prefixed `fail:` produces an evaluator error carrying the remainder as
/// the message, exercising the evaluator-error path without a shell.
pub struct EchoEvaluator;

impl EchoEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evaluator for EchoEvaluator {
    async fn evaluate(&self, payload: &str) -> Result<String> {
        let outcome = cadence_tools::echo::run(payload);
        if outcome.success {
            Ok(outcome.output)
        } else {
            Err(Error::Evaluator(
                outcome.error.unwrap_or_else(|| "echo evaluator failure".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_evaluator_returns_payload() {
        let eval = EchoEvaluator::new();
        let result = eval.evaluate("hello").await.unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn echo_evaluator_fail_prefix_is_an_evaluator_error() {
        let eval = EchoEvaluator::new();
        let result = eval.evaluate("fail: boom").await;
        assert!(matches!(result, Err(Error::Evaluator(_))));
    }

    #[tokio::test]
    async fn shell_evaluator_runs_commands() {
        let eval = ShellEvaluator::new();
        let result = eval.evaluate("echo hi").await.unwrap();
        assert_eq!(result.trim(), "hi");
    }

    #[tokio::test]
    async fn shell_evaluator_surfaces_nonzero_exit_as_evaluator_error() {
        let eval = ShellEvaluator::new();
        let result = eval.evaluate("exit 3").await;
        assert!(matches!(result, Err(Error::Evaluator(_))));
    }
}
