//! Login-state tracking from cookie and request-header evidence.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use tracing::debug;

use crate::driver::{CredentialStore, OutboundRequest};
use crate::error::{Error, Result};
use crate::events::{EventBus, SessionEvent};
use crate::polling::{self, RetryPolicy};

/// Whether a login is currently believed active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
	/// No evidence of an active login.
	Unauthenticated,
	/// A login is active.
	Authenticated,
}

/// Reconciles independent evidence channels into one login state.
///
/// Evidence arrives from three places, freshest observation winning:
///
/// 1. Passive: outbound requests carrying an `Authorization` header
///    prove a login before the UI finishes rendering, and latch the
///    bearer credential for direct backend calls.
/// 2. Active: an on-demand probe for the site's persistent session
///    cookie, run within a bounded retry budget. Exhaustion reads as
///    logged out.
/// 3. Route-level: landing on a login page is decisive logout evidence.
///
/// Transitions are edge-triggered: exactly one `Ready`/`Disconnected`
/// event fires per edge, and redundant observations are no-ops. Any
/// transition to [`AuthState::Unauthenticated`] drops the credential.
pub struct AuthMonitor {
	bus: Arc<EventBus>,
	state: Mutex<AuthState>,
	credential: Mutex<Option<String>>,
	cookie_name: String,
	cookie_domain: Regex,
	policy: RetryPolicy,
	allow_logs: bool,
}

impl AuthMonitor {
	/// Creates a monitor in the unauthenticated state.
	pub fn new(
		bus: Arc<EventBus>,
		cookie_name: impl Into<String>,
		cookie_domain_pattern: &str,
		allow_logs: bool,
	) -> Result<Self> {
		Ok(Self {
			bus,
			state: Mutex::new(AuthState::Unauthenticated),
			credential: Mutex::new(None),
			cookie_name: cookie_name.into(),
			cookie_domain: Regex::new(cookie_domain_pattern)?,
			policy: RetryPolicy::new(1, Duration::from_secs(1), "login state checker"),
			allow_logs,
		})
	}

	/// Current state.
	pub fn state(&self) -> AuthState {
		*self.state.lock()
	}

	/// True when a login is believed active.
	pub fn is_authenticated(&self) -> bool {
		self.state() == AuthState::Authenticated
	}

	/// Latched bearer credential, absent until a request carried one.
	pub fn authorization(&self) -> Option<String> {
		self.credential.lock().clone()
	}

	/// Passive channel: latches the first `Authorization` header seen and
	/// treats it as proof of an active login.
	pub fn observe_request(&self, request: &OutboundRequest) {
		let Some(authorization) = request.authorization() else {
			return;
		};
		{
			let mut credential = self.credential.lock();
			if credential.is_none() {
				*credential = Some(authorization.to_string());
				if self.allow_logs {
					debug!(target: "cg.auth", url = %request.url, "authorization header latched");
				}
			}
		}
		self.transition(true);
	}

	/// Active channel: probes for the persistent session cookie within
	/// the retry budget. Absence after the budget reads as logged out.
	pub async fn probe<S>(&self, store: &S) -> bool
	where
		S: CredentialStore + ?Sized,
	{
		let found = polling::poll(&self.policy, self.allow_logs, || {
			let name = self.cookie_name.as_str();
			let domain = &self.cookie_domain;
			async move {
				let cookies = store.cookies().await?;
				let present = cookies.iter().any(|cookie| {
					cookie.name == name
						&& cookie
							.domain
							.as_deref()
							.is_some_and(|cookie_domain| domain.is_match(cookie_domain))
				});
				if present {
					Ok(())
				} else {
					Err(Error::probe("session cookie not present"))
				}
			}
		})
		.await
		.is_some();

		self.transition(found);
		found
	}

	/// Route-level logout evidence (a login page was observed); forces
	/// the disconnected edge without waiting for a probe.
	pub fn force_unauthenticated(&self) {
		self.transition(false);
	}

	fn transition(&self, authenticated: bool) {
		let mut state = self.state.lock();
		match (*state, authenticated) {
			(AuthState::Unauthenticated, true) => {
				*state = AuthState::Authenticated;
				drop(state);
				self.bus.emit(SessionEvent::Ready);
			}
			(AuthState::Authenticated, false) => {
				*state = AuthState::Unauthenticated;
				drop(state);
				self.credential.lock().take();
				self.bus.emit(SessionEvent::Disconnected);
			}
			_ => {}
		}
	}
}
