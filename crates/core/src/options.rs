//! Session configuration.

use std::time::Duration;

use cg_protocol::LaunchOptions;

use crate::nav::Routes;
use crate::ui::Selectors;

/// Configuration for a [`ChatGpt`](crate::ChatGpt) session.
///
/// Reconfiguring a live session (`set_options`) recycles the browser, so
/// every field can change between turns.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Name the assistant is told to adopt in the instruction preamble.
	pub assistant_name: String,
	/// Pause between simulated keystrokes.
	pub keyboard_write_delay: Duration,
	/// Emit debug logs for probe attempts.
	pub allow_logs: bool,
	/// Browser launch configuration forwarded to the driver.
	pub launch: LaunchOptions,
	/// Route addresses and patterns of the target site.
	pub routes: Routes,
	/// UI affordance selectors of the target site.
	pub selectors: Selectors,
	/// Interval between completion-detection polls.
	pub completion_poll_interval: Duration,
	/// Interval between send-control readiness polls.
	pub send_poll_interval: Duration,
	/// Budget for a navigation to settle after a route assignment.
	pub navigation_timeout: Duration,
	/// Budget for the prompt input surface to appear.
	pub composer_timeout: Duration,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			assistant_name: "ChatGPT".to_string(),
			keyboard_write_delay: Duration::ZERO,
			allow_logs: false,
			launch: LaunchOptions::default(),
			routes: Routes::default(),
			selectors: Selectors::default(),
			completion_poll_interval: Duration::from_millis(1500),
			send_poll_interval: Duration::from_millis(250),
			navigation_timeout: Duration::from_secs(15),
			composer_timeout: Duration::from_secs(30),
		}
	}
}

impl SessionOptions {
	/// Sets the assistant's name in the instruction preamble.
	pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
		self.assistant_name = name.into();
		self
	}

	/// Sets the pause between simulated keystrokes.
	pub fn with_keyboard_write_delay(mut self, delay: Duration) -> Self {
		self.keyboard_write_delay = delay;
		self
	}

	/// Enables or disables probe-attempt logging.
	pub fn with_allow_logs(mut self, allow: bool) -> Self {
		self.allow_logs = allow;
		self
	}

	/// Sets the browser launch configuration.
	pub fn with_launch(mut self, launch: LaunchOptions) -> Self {
		self.launch = launch;
		self
	}

	/// Sets headless mode on the launch configuration.
	pub fn with_headless(mut self, headless: bool) -> Self {
		self.launch.headless = headless;
		self
	}

	/// Overrides the route table.
	pub fn with_routes(mut self, routes: Routes) -> Self {
		self.routes = routes;
		self
	}

	/// Overrides the UI selectors.
	pub fn with_selectors(mut self, selectors: Selectors) -> Self {
		self.selectors = selectors;
		self
	}

	/// Sets the completion-detection poll interval.
	pub fn with_completion_poll_interval(mut self, interval: Duration) -> Self {
		self.completion_poll_interval = interval;
		self
	}

	/// Sets the send-control readiness poll interval.
	pub fn with_send_poll_interval(mut self, interval: Duration) -> Self {
		self.send_poll_interval = interval;
		self
	}

	/// Sets the navigation-settled budget.
	pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
		self.navigation_timeout = timeout;
		self
	}

	/// Sets the prompt-input appearance budget.
	pub fn with_composer_timeout(mut self, timeout: Duration) -> Self {
		self.composer_timeout = timeout;
		self
	}
}
