//! Typed session event bus.
//!
//! State transitions are published on a broadcast channel. Callers
//! subscribe via [`EventStream`]; the core itself registers one-shot
//! predicate waiters, which double as the navigation-settled signal the
//! turn engine blocks on.
//!
//! Waiters are checked before the broadcast send, so `wait_for` patterns
//! have guaranteed delivery even when stream receivers are lagging.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use cg_protocol::Location;

use crate::error::{Error, Result};
use crate::options::SessionOptions;

/// Notifications emitted by the session as its observed state changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
	/// The user is logged in. Fired once per false→true auth edge.
	Ready,
	/// The user is logged out. Fired once per true→false auth edge.
	Disconnected,
	/// The page navigated to a login route.
	LoginPage,
	/// The session finished initializing.
	Initialized,
	/// The browser was released.
	BrowserDestroyed,
	/// The browser window was hidden (headless flipped on).
	Hide,
	/// The browser window was shown (headless flipped off).
	Show,
	/// The configuration was replaced.
	OptionsChanged {
		/// Configuration before the change.
		old: Box<SessionOptions>,
		/// Configuration after the change.
		new: Box<SessionOptions>,
	},
	/// The page location changed.
	LocationChange(Location),
}

impl SessionEvent {
	/// Stable event name, mirroring the wire-level event vocabulary.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Ready => "ready",
			Self::Disconnected => "disconnected",
			Self::LoginPage => "login_page",
			Self::Initialized => "initialized",
			Self::BrowserDestroyed => "browser_destroyed",
			Self::Hide => "hide",
			Self::Show => "show",
			Self::OptionsChanged { .. } => "options_changed",
			Self::LocationChange(_) => "location_change",
		}
	}
}

struct WaiterEntry {
	predicate: Box<dyn Fn(&SessionEvent) -> bool + Send + Sync>,
	complete_tx: oneshot::Sender<SessionEvent>,
}

/// Broadcast bus combining stream subscriptions with predicate waiters.
pub struct EventBus {
	tx: broadcast::Sender<SessionEvent>,
	waiters: Mutex<Vec<WaiterEntry>>,
}

impl EventBus {
	/// Creates a bus with the given broadcast channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self {
			tx,
			waiters: Mutex::new(Vec::new()),
		}
	}

	/// Emits an event to all matching waiters, then all subscribers.
	pub fn emit(&self, event: SessionEvent) {
		{
			let mut waiters = self.waiters.lock();
			let mut i = 0;
			while i < waiters.len() {
				if (waiters[i].predicate)(&event) {
					let entry = waiters.swap_remove(i);
					let _ = entry.complete_tx.send(event.clone());
				} else {
					i += 1;
				}
			}
		}
		let _ = self.tx.send(event);
	}

	/// Subscribes to the event stream. Events emitted before subscription
	/// are not received.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.tx.subscribe()
	}

	/// Registers a one-shot waiter completed by the first matching event.
	pub fn register_waiter<F>(&self, predicate: F) -> oneshot::Receiver<SessionEvent>
	where
		F: Fn(&SessionEvent) -> bool + Send + Sync + 'static,
	{
		let (complete_tx, complete_rx) = oneshot::channel();
		self.waiters.lock().push(WaiterEntry {
			predicate: Box::new(predicate),
			complete_tx,
		});
		complete_rx
	}

	/// Registers a waiter and wraps it with a timeout.
	pub fn waiter<F>(&self, predicate: F, timeout: Duration, condition: &str) -> EventWaiter
	where
		F: Fn(&SessionEvent) -> bool + Send + Sync + 'static,
	{
		EventWaiter {
			rx: self.register_waiter(predicate),
			timeout,
			condition: condition.to_string(),
		}
	}

	/// Returns the number of registered waiters.
	#[allow(dead_code)]
	pub(crate) fn waiter_count(&self) -> usize {
		self.waiters.lock().len()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}

/// Ergonomic wrapper around a broadcast receiver with lag handling.
///
/// Broadcast lag is logged and skipped instead of breaking the receive
/// loop.
pub struct EventStream {
	rx: broadcast::Receiver<SessionEvent>,
}

impl EventStream {
	/// Wraps the given broadcast receiver.
	pub fn new(rx: broadcast::Receiver<SessionEvent>) -> Self {
		Self { rx }
	}

	/// Receives the next event, or `None` once the bus is dropped.
	pub async fn recv(&mut self) -> Option<SessionEvent> {
		loop {
			match self.rx.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(target: "cg.events", dropped = n, "event stream lagged, dropped events");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Receives an event without blocking, if one is ready.
	pub fn try_recv(&mut self) -> Option<SessionEvent> {
		loop {
			match self.rx.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					tracing::warn!(target: "cg.events", dropped = n, "event stream lagged, dropped events");
				}
				Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
					return None;
				}
			}
		}
	}
}

/// One-shot event waiter with a timeout.
pub struct EventWaiter {
	rx: oneshot::Receiver<SessionEvent>,
	timeout: Duration,
	condition: String,
}

impl EventWaiter {
	/// Waits for the matching event within the timeout.
	///
	/// # Errors
	///
	/// [`Error::Timeout`] when no matching event arrives in time, or
	/// [`Error::ChannelClosed`] when the bus is dropped.
	pub async fn wait(self) -> Result<SessionEvent> {
		tokio::time::timeout(self.timeout, self.rx)
			.await
			.map_err(|_| Error::Timeout {
				ms: self.timeout.as_millis() as u64,
				condition: self.condition,
			})?
			.map_err(|_| Error::ChannelClosed)
	}
}
