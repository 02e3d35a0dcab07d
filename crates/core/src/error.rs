//! Error types for the session core.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a session.
///
/// Only [`NotInitialized`](Self::NotInitialized) marks caller misuse;
/// everything arising from scraping an uncooperative external surface is
/// absorbed into sentinel values before it reaches callers, so most
/// variants here describe driver-level failures, not flaky signals.
#[derive(Debug, Error)]
pub enum Error {
	/// An operation ran before `initialize()` created the session.
	#[error("the session is not initialized, did you call 'initialize()'?")]
	NotInitialized,

	/// A capability port (the browser driver) failed.
	#[error("driver error: {0}")]
	Driver(String),

	/// Timed out waiting for a page-side condition.
	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	/// The requested conversation does not exist on the backend.
	#[error("conversation not found: {0}")]
	ChatNotFound(String),

	/// A turn finished without the page settling on a saved conversation.
	#[error("no conversation id was assigned after the turn")]
	ChatIdUnresolved,

	/// An uncertain probe reported "not yet". Consumed by the polling
	/// primitive, which converts exhaustion into an absence value; never
	/// surfaced to callers.
	#[error("probe failed: {0}")]
	Probe(String),

	/// An event channel closed while waiting on it.
	#[error("event channel closed unexpectedly")]
	ChannelClosed,

	/// A route or domain pattern failed to compile.
	#[error("invalid pattern: {0}")]
	Pattern(#[from] regex::Error),

	/// JSON (de)serialization failure.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Shorthand for a driver-side failure.
	pub fn driver(message: impl Into<String>) -> Self {
		Self::Driver(message.into())
	}

	/// Shorthand for the polling primitive's retry signal.
	pub fn probe(message: impl Into<String>) -> Self {
		Self::Probe(message.into())
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
