//! Shell command execution, used by the core's `ShellEvaluator`.
//!
//! Mirrors the blocked-pattern / truncation discipline this codebase already
//! applies to shell-executing tools, but runs via `tokio::process::Command`
//! so it can be awaited from an async evaluator without blocking a worker
//! thread.

use tokio::process::Command;
use tracing::{debug, warn};

use super::ToolOutcome;

/// Dangerous command patterns that should be refused outright.
const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "mkfs",
    "dd if=",
    ":(){:|:&};:", // fork bomb
    "> /dev/sd",
    "chmod -R 777 /",
    "shutdown",
    "reboot",
    "init 0",
    "init 6",
];

const MAX_OUTPUT_SIZE: usize = 100_000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn is_blocked(command: &str) -> Option<&'static str> {
    let lower = command.to_lowercase();
    BLOCKED_PATTERNS.iter().copied().find(|p| lower.contains(p))
}

fn truncate(output: String) -> String {
    if output.len() <= MAX_OUTPUT_SIZE {
        return output;
    }
    let mut end = MAX_OUTPUT_SIZE;
    while !output.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!(
        "{}\n\n[output truncated - exceeded {} bytes, showing first {}]",
        &output[..end],
        output.len(),
        end
    )
}

/// Runs `command` as a `bash -c` line with a timeout, returning captured
/// stdout on success and stderr (plus exit code) as the error on failure.
pub async fn run(command: &str) -> ToolOutcome {
    if let Some(pattern) = is_blocked(command) {
        warn!(pattern, "blocked dangerous command pattern");
        return ToolOutcome::failure(format!(
            "command blocked: contains dangerous pattern '{}'",
            pattern
        ));
    }

    let child = Command::new("bash").args(["-c", command]).output();
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        child,
    )
    .await;

    match outcome {
        Err(_) => ToolOutcome::failure(format!(
            "command timed out after {}s",
            DEFAULT_TIMEOUT_SECS
        )),
        Ok(Err(e)) => ToolOutcome::failure(format!("failed to spawn command: {}", e)),
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(exit_code, "shell command completed");

            if output.status.success() {
                ToolOutcome::success(truncate(stdout))
            } else {
                let mut message = format!("exit code {}", exit_code);
                if !stderr.trim().is_empty() {
                    message.push_str(&format!(": {}", stderr.trim()));
                }
                ToolOutcome::failure(truncate(message))
            }
        }
    }
}
