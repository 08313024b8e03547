//! Polling loop behind the wait-for tool.
//!
//! Each check is bounded by the time left until the deadline, so a hung
//! agent call cannot stretch the wait past `timeout`.

use std::time::Duration;

use tokio::time::Instant;

use crate::agent::{AgentError, BrowserAgent};

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitForOptions {
    pub timeout: Duration,
    pub check_interval: Duration,
}

impl Default for WaitForOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            check_interval: Duration::from_millis(DEFAULT_CHECK_INTERVAL_MS),
        }
    }
}

/// Poll `agent.ai_boolean(assertion)` until it is true or the timeout elapses.
///
/// Check failures do not end the wait; the last one is reported in the
/// timeout message.
pub async fn wait_for_condition(
    agent: &dyn BrowserAgent,
    assertion: &str,
    options: WaitForOptions,
) -> Result<(), AgentError> {
    let deadline = Instant::now() + options.timeout;
    let interval = options.check_interval.max(Duration::from_millis(1));
    let mut last_error: Option<AgentError> = None;
    let mut checks = 0u32;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        checks += 1;
        match tokio::time::timeout(remaining, agent.ai_boolean(assertion)).await {
            Ok(Ok(true)) => {
                tracing::debug!(checks, "Wait condition met");
                return Ok(());
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                tracing::debug!(checks, error = %e, "Wait condition check failed");
                last_error = Some(e);
            }
            Err(_elapsed) => break,
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }

    let mut message = format!(
        "Wait for condition timed out after {}ms: \"{}\"",
        options.timeout.as_millis(),
        assertion
    );
    if let Some(e) = last_error {
        message.push_str(&format!("\nLast check error: {}", e));
    }
    Err(AgentError::Runtime(message))
}
