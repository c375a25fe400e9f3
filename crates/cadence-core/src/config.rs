//! Environment-variable configuration, loaded once at startup.

use anyhow::{Context, Result};

/// Which built-in [`crate::evaluator::Evaluator`] the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorKind {
    Shell,
    Echo,
}

impl std::str::FromStr for EvaluatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shell" => Ok(EvaluatorKind::Shell),
            "echo" => Ok(EvaluatorKind::Echo),
            other => Err(anyhow::anyhow!(
                "invalid CADENCE_EVALUATOR '{}', expected 'shell' or 'echo'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub evaluator: EvaluatorKind,
    /// Lower clamp bound for the re-arm delay (spec: 250ms).
    pub min_rearm_delay_ms: u64,
    /// Upper clamp bound for the re-arm delay (spec: 45 days).
    pub max_rearm_delay_secs: u64,
    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            evaluator: std::env::var("CADENCE_EVALUATOR")
                .unwrap_or_else(|_| "shell".to_string())
                .parse()?,
            min_rearm_delay_ms: std::env::var("CADENCE_MIN_REARM_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(250),
            max_rearm_delay_secs: std::env::var("CADENCE_MAX_REARM_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(45 * 86_400),
            http_port: std::env::var("CADENCE_HTTP_PORT")
                .unwrap_or_else(|_| "3030".to_string())
                .parse()
                .context("CADENCE_HTTP_PORT must be a valid port number")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluator_kind_parses_known_values() {
        assert_eq!("shell".parse::<EvaluatorKind>().unwrap(), EvaluatorKind::Shell);
        assert_eq!("echo".parse::<EvaluatorKind>().unwrap(), EvaluatorKind::Echo);
    }

    #[test]
    fn evaluator_kind_rejects_unknown_value() {
        assert!("wat".parse::<EvaluatorKind>().is_err());
    }
}
