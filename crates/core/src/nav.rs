//! Route classification and chat-selection tracking.

use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use tracing::debug;

use cg_protocol::Location;

use crate::auth::AuthMonitor;
use crate::driver::CredentialStore;
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};

/// Route addresses and patterns of the target site.
///
/// Like the UI selectors, these are details of the site subject to
/// change, carried as configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
	/// Site root.
	pub base_url: String,
	/// Query string marking an unsaved temporary chat.
	pub temporary_chat_query: String,
	/// Pattern matching every login page the site can bounce through.
	pub auth_page_pattern: String,
	/// Pattern scoping cookies to the site's domain.
	pub cookie_domain_pattern: String,
	/// Session cookie the site keeps while a login is active.
	pub session_cookie: String,
	/// Path prefix of saved conversations.
	pub saved_chat_prefix: String,
}

impl Default for Routes {
	fn default() -> Self {
		Self {
			base_url: "https://chatgpt.com".to_string(),
			temporary_chat_query: "temporary-chat=true".to_string(),
			auth_page_pattern: r"(auth\.openai\.com)|(login\.live\.com)|(accounts\.google\.com)|(appleid\.apple\.com)"
				.to_string(),
			cookie_domain_pattern: r"(chatgpt\.com)|(\.chatgpt\.com)".to_string(),
			session_cookie: "__Secure-next-auth.session-token".to_string(),
			saved_chat_prefix: "/c/".to_string(),
		}
	}
}

impl Routes {
	/// Address of the unsaved temporary chat.
	pub fn temporary_chat_url(&self) -> String {
		format!("{}/?{}", self.base_url, self.temporary_chat_query)
	}

	/// Address of the saved conversation `id`.
	pub fn saved_chat_url(&self, id: &str) -> String {
		format!("{}{}{}", self.base_url, self.saved_chat_prefix, id)
	}
}

/// Which conversation thread the next turn targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatSelection {
	/// The route did not map to any chat surface.
	None,
	/// A fresh, not-yet-saved chat.
	New,
	/// The unsaved temporary chat.
	Temporary,
	/// A saved conversation.
	Saved(String),
}

impl ChatSelection {
	/// Saved conversation id, when one is selected.
	pub fn chat_id(&self) -> Option<&str> {
		match self {
			Self::Saved(id) => Some(id),
			_ => None,
		}
	}
}

/// Outcome of classifying one location, first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClass {
	/// A login page of the site or one of its identity providers.
	Login,
	/// A saved conversation page.
	SavedChat(String),
	/// The unsaved temporary chat page.
	TemporaryChat,
	/// The fresh-chat page (root without query).
	NewChat,
	/// Anything else, usually a transient route mid-navigation.
	Unknown,
}

/// Classifies a location against the site's route table.
///
/// The order is significant: login detection runs first so auth bounces
/// through provider domains never read as chat routes, and the saved
/// prefix is checked before the temporary address.
pub fn classify(auth_page: &Regex, routes: &Routes, location: &Location) -> RouteClass {
	if auth_page.is_match(&location.href) {
		return RouteClass::Login;
	}
	if let Some(rest) = location.pathname.strip_prefix(routes.saved_chat_prefix.as_str()) {
		let id = rest.trim_end_matches('/').rsplit('/').next().unwrap_or("");
		if !id.is_empty() {
			return RouteClass::SavedChat(id.to_string());
		}
	}
	if location.href == routes.temporary_chat_url() {
		return RouteClass::TemporaryChat;
	}
	if location.pathname == "/" && location.search.is_empty() {
		return RouteClass::NewChat;
	}
	RouteClass::Unknown
}

/// Tracks the active chat selection from observed navigations.
///
/// Driven by a single upstream signal: "the location changed", whether
/// from a full load or an in-page route mutation. Each observation
/// classifies the route, updates the selection, emits events, and then
/// re-verifies auth, since a navigation is a natural checkpoint for it.
pub struct NavigationTracker {
	routes: Routes,
	auth_page: Regex,
	selection: Mutex<ChatSelection>,
	bus: Arc<EventBus>,
	auth: Arc<AuthMonitor>,
}

impl NavigationTracker {
	/// Creates a tracker with no chat selected.
	pub fn new(routes: Routes, bus: Arc<EventBus>, auth: Arc<AuthMonitor>) -> Result<Self> {
		let auth_page = Regex::new(&routes.auth_page_pattern)?;
		Ok(Self {
			routes,
			auth_page,
			selection: Mutex::new(ChatSelection::None),
			bus,
			auth,
		})
	}

	/// The route table this tracker classifies against.
	pub fn routes(&self) -> &Routes {
		&self.routes
	}

	/// Currently selected chat.
	pub fn selection(&self) -> ChatSelection {
		self.selection.lock().clone()
	}

	/// Overwrites the selection. Used by the turn engine for optimistic
	/// updates after it set a destination route itself.
	pub fn set_selection(&self, selection: ChatSelection) {
		*self.selection.lock() = selection;
	}

	/// Applies a route classification to the selection without emitting
	/// events. Used for post-turn reclassification, where the final URL
	/// is authoritative but no new navigation happened.
	pub fn apply_route(&self, location: &Location) -> ChatSelection {
		let class = classify(&self.auth_page, &self.routes, location);
		self.apply_class(&class)
	}

	fn apply_class(&self, class: &RouteClass) -> ChatSelection {
		let mut selection = self.selection.lock();
		match class {
			// a login bounce says nothing about which chat is active
			RouteClass::Login => {}
			RouteClass::SavedChat(id) => *selection = ChatSelection::Saved(id.clone()),
			RouteClass::TemporaryChat => *selection = ChatSelection::Temporary,
			RouteClass::NewChat => *selection = ChatSelection::New,
			RouteClass::Unknown => *selection = ChatSelection::None,
		}
		selection.clone()
	}

	/// Processes one observed navigation to completion.
	pub async fn observe<S>(&self, location: Location, store: &S)
	where
		S: CredentialStore + ?Sized,
	{
		let class = classify(&self.auth_page, &self.routes, &location);
		debug!(target: "cg.nav", href = %location.href, class = ?class, "location changed");

		if matches!(class, RouteClass::Login) {
			self.bus.emit(SessionEvent::LoginPage);
			self.auth.force_unauthenticated();
		}
		self.apply_class(&class);
		self.bus.emit(SessionEvent::LocationChange(location));

		self.auth.probe(store).await;
	}
}

#[cfg(test)]
mod tests {
	use async_trait::async_trait;
	use cg_protocol::Cookie;

	use super::*;
	use crate::events::EventStream;

	fn class_of(href: &str) -> RouteClass {
		let routes = Routes::default();
		let auth_page = Regex::new(&routes.auth_page_pattern).unwrap();
		classify(&auth_page, &routes, &Location::from_href(href))
	}

	#[test]
	fn saved_chat_route_extracts_trailing_id() {
		assert_eq!(class_of("https://chatgpt.com/c/abc123"), RouteClass::SavedChat("abc123".to_string()));
		assert_eq!(class_of("https://chatgpt.com/c/abc123/"), RouteClass::SavedChat("abc123".to_string()));
		assert_eq!(
			class_of("https://chatgpt.com/c/g-xyz/abc123"),
			RouteClass::SavedChat("abc123".to_string())
		);
	}

	#[test]
	fn temporary_route_requires_exact_address() {
		assert_eq!(class_of("https://chatgpt.com/?temporary-chat=true"), RouteClass::TemporaryChat);
		assert_eq!(class_of("https://chatgpt.com/?temporary-chat=true&x=1"), RouteClass::Unknown);
	}

	#[test]
	fn root_without_query_is_a_new_chat() {
		assert_eq!(class_of("https://chatgpt.com/"), RouteClass::NewChat);
		assert_eq!(class_of("https://chatgpt.com"), RouteClass::NewChat);
		assert_eq!(class_of("https://chatgpt.com/?model=auto"), RouteClass::Unknown);
	}

	#[test]
	fn login_pages_win_over_every_other_rule() {
		assert_eq!(class_of("https://auth.openai.com/authorize"), RouteClass::Login);
		assert_eq!(class_of("https://accounts.google.com/signin"), RouteClass::Login);
		// even a path that looks like a saved chat
		assert_eq!(class_of("https://accounts.google.com/c/abc123"), RouteClass::Login);
	}

	#[test]
	fn unrelated_routes_are_unknown() {
		assert_eq!(class_of("https://chatgpt.com/gpts"), RouteClass::Unknown);
		assert_eq!(class_of("https://chatgpt.com/c/"), RouteClass::Unknown);
	}

	struct StaticJar(Vec<Cookie>);

	#[async_trait]
	impl CredentialStore for StaticJar {
		async fn cookies(&self) -> crate::error::Result<Vec<Cookie>> {
			Ok(self.0.clone())
		}
	}

	fn tracker() -> (NavigationTracker, Arc<EventBus>) {
		let bus = Arc::new(EventBus::default());
		let routes = Routes::default();
		let auth = Arc::new(
			AuthMonitor::new(bus.clone(), routes.session_cookie.clone(), &routes.cookie_domain_pattern, false)
				.unwrap(),
		);
		(NavigationTracker::new(routes, bus.clone(), auth).unwrap(), bus)
	}

	#[tokio::test]
	async fn observation_updates_selection_and_emits_location_change() {
		let (tracker, bus) = tracker();
		let mut stream = EventStream::new(bus.subscribe());
		let jar = StaticJar(Vec::new());

		tracker.observe(Location::from_href("https://chatgpt.com/c/abc123"), &jar).await;

		assert_eq!(tracker.selection(), ChatSelection::Saved("abc123".to_string()));
		let event = stream.try_recv().unwrap();
		assert_eq!(event.name(), "location_change");
	}

	#[tokio::test]
	async fn login_route_keeps_selection_and_raises_login_page() {
		let (tracker, bus) = tracker();
		tracker.set_selection(ChatSelection::Saved("abc".to_string()));
		let mut stream = EventStream::new(bus.subscribe());
		let jar = StaticJar(Vec::new());

		tracker
			.observe(Location::from_href("https://auth.openai.com/authorize"), &jar)
			.await;

		assert_eq!(tracker.selection(), ChatSelection::Saved("abc".to_string()));
		assert_eq!(stream.try_recv().unwrap().name(), "login_page");
		assert_eq!(stream.try_recv().unwrap().name(), "location_change");
	}

	#[tokio::test]
	async fn unknown_route_clears_selection() {
		let (tracker, _bus) = tracker();
		tracker.set_selection(ChatSelection::Temporary);
		let jar = StaticJar(Vec::new());

		tracker.observe(Location::from_href("https://chatgpt.com/gpts"), &jar).await;

		assert_eq!(tracker.selection(), ChatSelection::None);
	}

	#[test]
	fn apply_route_does_not_emit() {
		let (tracker, bus) = tracker();
		let mut stream = EventStream::new(bus.subscribe());

		let selection = tracker.apply_route(&Location::from_href("https://chatgpt.com/c/xyz"));

		assert_eq!(selection, ChatSelection::Saved("xyz".to_string()));
		assert!(stream.try_recv().is_none());
	}
}
