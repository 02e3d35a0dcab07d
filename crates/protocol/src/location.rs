//! Page location snapshots observed from the driver.

use serde::{Deserialize, Serialize};

/// Snapshot of a page's location at one observed instant.
///
/// Carries the three components the session core classifies routes by:
/// the full address, the path, and the raw query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	/// Full address, including scheme, host, path, and query.
	pub href: String,
	/// Path component, always starting with `/`.
	pub pathname: String,
	/// Raw query string including the leading `?`, or empty.
	pub search: String,
}

impl Location {
	/// Builds a location from explicit components.
	pub fn new(href: impl Into<String>, pathname: impl Into<String>, search: impl Into<String>) -> Self {
		Self {
			href: href.into(),
			pathname: pathname.into(),
			search: search.into(),
		}
	}

	/// Derives the path and query components from a full address.
	///
	/// Fragments are not part of either component and are dropped; an
	/// address without a path reads as the root path.
	pub fn from_href(href: impl Into<String>) -> Self {
		let href = href.into();
		let after_scheme = href.find("://").map(|i| i + 3).unwrap_or(0);
		let rest = &href[after_scheme..];

		let tail = match rest.find(['/', '?', '#']) {
			Some(i) => &rest[i..],
			None => "",
		};
		let tail = tail.split('#').next().unwrap_or("");

		let (pathname, search) = match tail.find('?') {
			Some(q) => (&tail[..q], tail[q..].to_string()),
			None => (tail, String::new()),
		};
		let pathname = if pathname.is_empty() {
			"/".to_string()
		} else {
			pathname.to_string()
		};

		Self { href, pathname, search }
	}

	/// True when the address carries a query string.
	pub fn has_query(&self) -> bool {
		!self.search.is_empty()
	}
}
