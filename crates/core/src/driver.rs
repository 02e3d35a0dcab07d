//! Capability ports implemented by the browser driver.
//!
//! The session core never talks to a browser engine directly. It consumes
//! these narrow trait objects, and the embedding application injects an
//! implementation (CDP, WebDriver, an in-process fake for tests).
//!
//! Two details of the contract matter to the core:
//!
//! - [`Page::evaluate`] must await promise results before serializing
//!   them, since the core's backend helpers evaluate `fetch` chains.
//! - [`Page::on_location_change`] must fire for in-page route mutations
//!   as well as full loads; single-page applications rewrite the address
//!   without a navigation event.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use cg_protocol::{Cookie, LaunchOptions, Location};

use crate::error::Result;

/// Handler invoked for every outbound network request the page issues.
pub type RequestHandler = Arc<dyn Fn(OutboundRequest) + Send + Sync>;

/// Handler invoked whenever the page's location changes.
pub type LocationHandler = Arc<dyn Fn(Location) + Send + Sync>;

/// One outbound request observed leaving the page.
#[derive(Debug, Clone, Default)]
pub struct OutboundRequest {
	/// Request address.
	pub url: String,
	/// Request headers as sent.
	pub headers: HashMap<String, String>,
}

impl OutboundRequest {
	/// Returns the `Authorization` header value, whatever its casing.
	pub fn authorization(&self) -> Option<&str> {
		self.headers
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
			.map(|(_, value)| value.as_str())
	}
}

/// Launches browser instances.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
	/// Starts a browser configured with `options`.
	async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn Browser>>;
}

/// Cookie lookup over the browser's persistent storage.
///
/// The narrow port the authentication monitor consumes; every
/// [`Browser`] is one.
#[async_trait]
pub trait CredentialStore: Send + Sync {
	/// Returns every cookie the browser currently holds.
	async fn cookies(&self) -> Result<Vec<Cookie>>;
}

/// A live browser owning pages and persistent storage.
#[async_trait]
pub trait Browser: CredentialStore {
	/// Opens a new page (tab).
	async fn new_page(&self) -> Result<Arc<dyn Page>>;

	/// Closes the browser and releases its resources.
	async fn close(&self) -> Result<()>;
}

/// A file-chooser dialog opened by the page.
#[async_trait]
pub trait FileChooser: Send + Sync {
	/// Accepts the dialog with the given file paths.
	async fn accept(&self, paths: &[PathBuf]) -> Result<()>;
}

/// A single page (tab) the session drives.
#[async_trait]
pub trait Page: Send + Sync {
	/// Navigates to `url` with a full page load.
	async fn goto(&self, url: &str) -> Result<()>;

	/// Reads the page's current location.
	async fn location(&self) -> Result<Location>;

	/// Waits until `selector` matches an element, up to `timeout`.
	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

	/// Clicks the first element matching `selector`.
	async fn click(&self, selector: &str) -> Result<()>;

	/// Types `text` into the focused element, one key at a time.
	async fn type_keys(&self, text: &str, per_key_delay: Duration) -> Result<()>;

	/// Evaluates a JavaScript expression in the page and returns its
	/// JSON-serialized result, awaiting promises first.
	async fn evaluate(&self, expression: &str) -> Result<Value>;

	/// Starts waiting for the next file-chooser dialog the page opens.
	async fn wait_for_file_chooser(&self) -> Result<Box<dyn FileChooser>>;

	/// Registers a handler observing every outbound request.
	fn on_request(&self, handler: RequestHandler);

	/// Registers a handler observing every location change.
	fn on_location_change(&self, handler: LocationHandler);
}
