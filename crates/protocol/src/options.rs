//! Browser launch configuration forwarded to the driver.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_headless() -> bool {
	true
}

/// Options the driver applies when launching a browser.
///
/// Only `headless` is interpreted by the session core (it decides the
/// `hide`/`show` events on reconfiguration); everything else is a
/// passthrough for the concrete driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOptions {
	/// Run the browser without a visible window.
	#[serde(default = "default_headless")]
	pub headless: bool,

	/// Profile directory reused across launches so logins persist.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_data_dir: Option<PathBuf>,

	/// Extra command-line arguments for the browser binary.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,

	/// Driver-specific options forwarded untouched.
	#[serde(default, flatten)]
	pub extra: serde_json::Map<String, Value>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			headless: true,
			user_data_dir: None,
			args: Vec::new(),
			extra: serde_json::Map::new(),
		}
	}
}

impl LaunchOptions {
	/// Sets headless mode.
	pub fn headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	/// Sets the profile directory.
	pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.user_data_dir = Some(dir.into());
		self
	}

	/// Appends a browser command-line argument.
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Adds a driver-specific passthrough option.
	pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
		self.extra.insert(key.into(), value);
		self
	}
}
