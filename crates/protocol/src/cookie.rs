//! Cookie snapshots read from the browser's persistent storage.

use serde::{Deserialize, Serialize};

/// A browser cookie as the driver reports it.
///
/// The session core only inspects `name` and `domain` (to find the site's
/// session cookie); the remaining attributes ride along so drivers can
/// report cookies without losing information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	/// Cookie name.
	pub name: String,

	/// Cookie value.
	pub value: String,

	/// Domain the cookie is scoped to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,

	/// Path the cookie is scoped to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,

	/// Unix timestamp in seconds. -1 means session cookie.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,

	/// Whether the cookie is HTTP-only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,

	/// Whether the cookie requires HTTPS.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,
}

impl Cookie {
	/// Creates a cookie with the fields the core cares about.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: Some(domain.into()),
			path: None,
			expires: None,
			http_only: None,
			secure: None,
		}
	}

	/// Sets the path the cookie is scoped to.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Sets the expiration timestamp (Unix seconds).
	pub fn expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Sets whether the cookie is HTTP-only.
	pub fn http_only(mut self, http_only: bool) -> Self {
		self.http_only = Some(http_only);
		self
	}

	/// Sets whether the cookie requires HTTPS.
	pub fn secure(mut self, secure: bool) -> Self {
		self.secure = Some(secure);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cookie_new() {
		let cookie = Cookie::new("session", "abc123", ".chatgpt.com");
		assert_eq!(cookie.name, "session");
		assert_eq!(cookie.value, "abc123");
		assert_eq!(cookie.domain, Some(".chatgpt.com".to_string()));
	}

	#[test]
	fn cookie_serializes_camel_case() {
		let cookie = Cookie::new("token", "xyz", "chatgpt.com").http_only(true).secure(true);
		let json = serde_json::to_string(&cookie).unwrap();
		assert!(json.contains("\"httpOnly\":true"));
		assert!(json.contains("\"secure\":true"));
	}

	#[test]
	fn cookie_round_trip() {
		let cookie = Cookie::new("a", "b", "c").path("/").expires(-1.0);
		let json = serde_json::to_string(&cookie).unwrap();
		let restored: Cookie = serde_json::from_str(&json).unwrap();
		assert_eq!(restored, cookie);
	}
}
