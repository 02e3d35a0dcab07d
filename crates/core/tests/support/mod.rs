//! In-process fake driver backing the integration tests.
//!
//! Implements the capability ports over plain shared state. Tests script
//! the page (queued completion probes, queued backend responses) and
//! fire synthetic signals (location changes, outbound requests) to drive
//! the session exactly the way a real browser would.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use cg::cg_protocol::{Cookie, LaunchOptions, Location};
use cg::{
	Browser, BrowserLauncher, CredentialStore, Error, EventStream, FileChooser, LocationHandler,
	OutboundRequest, Page, RequestHandler, Result, Routes, Selectors,
};

/// Launcher handing out one shared fake browser.
pub struct FakeLauncher {
	browser: Arc<FakeBrowser>,
	launches: Mutex<Vec<LaunchOptions>>,
}

impl FakeLauncher {
	pub fn new(browser: Arc<FakeBrowser>) -> Arc<Self> {
		Arc::new(Self {
			browser,
			launches: Mutex::new(Vec::new()),
		})
	}

	pub fn launch_count(&self) -> usize {
		self.launches.lock().len()
	}

	pub fn last_launch(&self) -> Option<LaunchOptions> {
		self.launches.lock().last().cloned()
	}
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
	async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn Browser>> {
		self.launches.lock().push(options.clone());
		Ok(self.browser.clone())
	}
}

/// Fake browser owning one page and a scriptable cookie jar.
pub struct FakeBrowser {
	page: Arc<FakePage>,
	jar: Mutex<Vec<Cookie>>,
	closed: Mutex<usize>,
}

impl FakeBrowser {
	pub fn new(page: Arc<FakePage>) -> Arc<Self> {
		Arc::new(Self {
			page,
			jar: Mutex::new(Vec::new()),
			closed: Mutex::new(0),
		})
	}

	pub fn set_cookies(&self, cookies: Vec<Cookie>) {
		*self.jar.lock() = cookies;
	}

	pub fn clear_cookies(&self) {
		self.jar.lock().clear();
	}

	pub fn close_count(&self) -> usize {
		*self.closed.lock()
	}
}

#[async_trait]
impl CredentialStore for FakeBrowser {
	async fn cookies(&self) -> Result<Vec<Cookie>> {
		Ok(self.jar.lock().clone())
	}
}

#[async_trait]
impl Browser for FakeBrowser {
	async fn new_page(&self) -> Result<Arc<dyn Page>> {
		Ok(self.page.clone())
	}

	async fn close(&self) -> Result<()> {
		*self.closed.lock() += 1;
		Ok(())
	}
}

/// Fake page with scripted DOM readings and synthetic signals.
pub struct FakePage {
	selectors: Selectors,
	location: Mutex<Location>,
	request_handlers: Mutex<Vec<RequestHandler>>,
	location_handlers: Mutex<Vec<LocationHandler>>,

	pub goto_log: Mutex<Vec<String>>,
	/// `location.href` assignments made by the turn engine.
	pub assignments: Mutex<Vec<String>>,
	pub clicks: Mutex<Vec<String>>,
	pub typed: Mutex<Vec<String>>,

	reply_probes: Mutex<VecDeque<Value>>,
	last_probe: Mutex<Option<Value>>,
	api_responses: Mutex<VecDeque<Value>>,
	send_ready: Mutex<bool>,
	composer_present: Mutex<bool>,
	chooser_fails: Mutex<bool>,
	chooser_accepts: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl FakePage {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			selectors: Selectors::default(),
			location: Mutex::new(Location::from_href("about:blank")),
			request_handlers: Mutex::new(Vec::new()),
			location_handlers: Mutex::new(Vec::new()),
			goto_log: Mutex::new(Vec::new()),
			assignments: Mutex::new(Vec::new()),
			clicks: Mutex::new(Vec::new()),
			typed: Mutex::new(Vec::new()),
			reply_probes: Mutex::new(VecDeque::new()),
			last_probe: Mutex::new(None),
			api_responses: Mutex::new(VecDeque::new()),
			send_ready: Mutex::new(true),
			composer_present: Mutex::new(true),
			chooser_fails: Mutex::new(false),
			chooser_accepts: Arc::new(Mutex::new(Vec::new())),
		})
	}

	/// Simulates a navigation or in-page route mutation.
	pub fn emit_location(&self, href: &str) {
		let location = Location::from_href(href);
		*self.location.lock() = location.clone();
		let handlers: Vec<LocationHandler> = self.location_handlers.lock().clone();
		for handler in handlers {
			handler(location.clone());
		}
	}

	/// Simulates one outbound request leaving the page.
	pub fn emit_request(&self, url: &str, authorization: Option<&str>) {
		let mut headers = HashMap::new();
		if let Some(value) = authorization {
			headers.insert("Authorization".to_string(), value.to_string());
		}
		let request = OutboundRequest {
			url: url.to_string(),
			headers,
		};
		let handlers: Vec<RequestHandler> = self.request_handlers.lock().clone();
		for handler in handlers {
			handler(request.clone());
		}
	}

	/// Queues the reading the next completion poll will observe. Once the
	/// queue drains, the last reading repeats.
	pub fn queue_reply_probe(&self, text: Option<&str>, streaming: bool, spoken: bool) {
		self.reply_probes.lock().push_back(json!({
			"text": text,
			"streaming": streaming,
			"spoken": spoken,
		}));
	}

	pub fn queued_probe_count(&self) -> usize {
		self.reply_probes.lock().len()
	}

	/// Queues the next backend (`fetch`) response.
	pub fn queue_api_response(&self, value: Value) {
		self.api_responses.lock().push_back(value);
	}

	pub fn set_send_ready(&self, ready: bool) {
		*self.send_ready.lock() = ready;
	}

	pub fn set_composer_present(&self, present: bool) {
		*self.composer_present.lock() = present;
	}

	pub fn fail_file_chooser(&self) {
		*self.chooser_fails.lock() = true;
	}

	pub fn accepted_files(&self) -> Vec<Vec<PathBuf>> {
		self.chooser_accepts.lock().clone()
	}

	pub fn click_count(&self, selector: &str) -> usize {
		self.clicks.lock().iter().filter(|s| s.as_str() == selector).count()
	}
}

#[async_trait]
impl Page for FakePage {
	async fn goto(&self, url: &str) -> Result<()> {
		self.goto_log.lock().push(url.to_string());
		self.emit_location(url);
		Ok(())
	}

	async fn location(&self) -> Result<Location> {
		Ok(self.location.lock().clone())
	}

	async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
		if selector == self.selectors.prompt_input && !*self.composer_present.lock() {
			return Err(Error::driver(format!("timed out waiting for {selector}")));
		}
		Ok(())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.clicks.lock().push(selector.to_string());
		Ok(())
	}

	async fn type_keys(&self, text: &str, _per_key_delay: Duration) -> Result<()> {
		self.typed.lock().push(text.to_string());
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		if let Some(rest) = expression.strip_prefix("location.href = ") {
			let url: String = serde_json::from_str(rest).map_err(|err| Error::driver(err.to_string()))?;
			self.assignments.lock().push(url.clone());
			self.emit_location(&url);
			return Ok(Value::Null);
		}
		if expression.contains(self.selectors.assistant_message.as_str()) {
			let value = match self.reply_probes.lock().pop_front() {
				Some(value) => {
					*self.last_probe.lock() = Some(value.clone());
					value
				}
				None => self
					.last_probe
					.lock()
					.clone()
					.unwrap_or_else(|| json!({ "text": null, "streaming": false, "spoken": false })),
			};
			return Ok(value);
		}
		if expression.contains("fetch(") {
			return Ok(self.api_responses.lock().pop_front().unwrap_or(Value::Null));
		}
		if expression.contains(self.selectors.send_button.as_str()) {
			return Ok(json!(*self.send_ready.lock()));
		}
		Ok(Value::Null)
	}

	async fn wait_for_file_chooser(&self) -> Result<Box<dyn FileChooser>> {
		if *self.chooser_fails.lock() {
			return Err(Error::driver("file chooser did not open"));
		}
		Ok(Box::new(FakeChooser {
			accepts: self.chooser_accepts.clone(),
		}))
	}

	fn on_request(&self, handler: RequestHandler) {
		self.request_handlers.lock().push(handler);
	}

	fn on_location_change(&self, handler: LocationHandler) {
		self.location_handlers.lock().push(handler);
	}
}

struct FakeChooser {
	accepts: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

#[async_trait]
impl FileChooser for FakeChooser {
	async fn accept(&self, paths: &[PathBuf]) -> Result<()> {
		self.accepts.lock().push(paths.to_vec());
		Ok(())
	}
}

/// The site's session cookie on the site's domain.
pub fn session_cookie() -> Cookie {
	let routes = Routes::default();
	Cookie::new(routes.session_cookie, "opaque-token", ".chatgpt.com")
}

/// Lets the location bridge and other spawned tasks drain.
pub async fn settle() {
	for _ in 0..32 {
		tokio::task::yield_now().await;
	}
}

/// Drains every pending event name from the stream.
pub fn drain(stream: &mut EventStream) -> Vec<&'static str> {
	let mut names = Vec::new();
	while let Some(event) = stream.try_recv() {
		names.push(event.name());
	}
	names
}
