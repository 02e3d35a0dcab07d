//! Bounded-retry polling shared by every uncertain probe.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Retry budget for one uncertain probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Number of attempts, at least 1.
	pub retries: u32,
	/// Pause between attempts.
	pub delay: Duration,
	/// Probe name used in logs.
	pub label: &'static str,
}

impl RetryPolicy {
	/// Creates a policy, clamping `retries` to at least one attempt.
	pub fn new(retries: u32, delay: Duration, label: &'static str) -> Self {
		Self {
			retries: retries.max(1),
			delay,
			label,
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			retries: 5,
			delay: Duration::from_secs(1),
			label: "probe",
		}
	}
}

/// Runs `probe` up to the policy's retry budget.
///
/// A failed attempt sleeps for the configured delay before the next try.
/// An exhausted budget resolves to `None` rather than an error, so
/// callers can treat "still unknown" as a legitimate terminal state.
pub async fn poll<T, F, Fut>(policy: &RetryPolicy, allow_logs: bool, mut probe: F) -> Option<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	for attempt in 1..=policy.retries {
		match probe().await {
			Ok(value) => {
				if allow_logs {
					debug!(target: "cg.poll", label = policy.label, attempt, "probe succeeded");
				}
				return Some(value);
			}
			Err(err) => {
				if allow_logs {
					debug!(target: "cg.poll", label = policy.label, attempt, error = %err, "probe attempt failed");
				}
				if attempt < policy.retries {
					tokio::time::sleep(policy.delay).await;
				}
			}
		}
	}
	if allow_logs {
		debug!(target: "cg.poll", label = policy.label, retries = policy.retries, "probe budget exhausted");
	}
	None
}
