//! Session lifecycle and the public operation surface.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use cg_protocol::{ConversationPage, Cookie};

use crate::api::ConversationApi;
use crate::auth::AuthMonitor;
use crate::driver::{Browser, BrowserLauncher, Page};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventStream, SessionEvent};
use crate::nav::{ChatSelection, NavigationTracker};
use crate::options::SessionOptions;
use crate::turn::{GenerateOptions, TurnEngine, TurnOutcome};

/// Lifecycle phase of a [`ChatGpt`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	/// No browser has been acquired yet.
	Uninitialized,
	/// `initialize()` is acquiring resources.
	Initializing,
	/// The session is live.
	Ready,
	/// The browser was released; `initialize()` may run again.
	Destroyed,
}

/// Live resources owned by an initialized session.
struct Active {
	browser: Arc<dyn Browser>,
	page: Arc<dyn Page>,
	auth: Arc<AuthMonitor>,
	tracker: Arc<NavigationTracker>,
	engine: TurnEngine,
	bridge: JoinHandle<()>,
}

/// A scripted session against the ChatGPT web application.
///
/// Owns at most one browser and one page, both acquired through the
/// injected [`BrowserLauncher`] port. Application state (logged in/out,
/// active conversation, reply completion) is inferred entirely from what
/// the page exposes: network headers, cookies, DOM readings, and URL
/// changes.
///
/// All operations are cooperative tasks on the caller's runtime; running
/// two turns concurrently races on the same composer surface and is
/// unsupported, so callers serialize `generate` themselves.
pub struct ChatGpt {
	launcher: Arc<dyn BrowserLauncher>,
	options: Mutex<SessionOptions>,
	bus: Arc<EventBus>,
	active: Mutex<Option<Arc<Active>>>,
	state: Mutex<LifecycleState>,
}

impl ChatGpt {
	/// Creates an uninitialized session over the given driver.
	pub fn new(launcher: Arc<dyn BrowserLauncher>, options: SessionOptions) -> Self {
		Self {
			launcher,
			options: Mutex::new(options),
			bus: Arc::new(EventBus::default()),
			active: Mutex::new(None),
			state: Mutex::new(LifecycleState::Uninitialized),
		}
	}

	/// The session's event bus.
	pub fn events(&self) -> &Arc<EventBus> {
		&self.bus
	}

	/// Subscribes to session events.
	pub fn subscribe(&self) -> EventStream {
		EventStream::new(self.bus.subscribe())
	}

	/// Current lifecycle phase.
	pub fn state(&self) -> LifecycleState {
		*self.state.lock()
	}

	/// Snapshot of the current configuration.
	pub fn options(&self) -> SessionOptions {
		self.options.lock().clone()
	}

	fn active(&self) -> Result<Arc<Active>> {
		self.active.lock().clone().ok_or(Error::NotInitialized)
	}

	/// Acquires the browser and page, wires the signal observers, and
	/// runs the startup auth probe. Idempotent: a live session is left
	/// untouched.
	pub async fn initialize(&self) -> Result<()> {
		if self.active.lock().is_some() {
			return Ok(());
		}
		*self.state.lock() = LifecycleState::Initializing;

		let options = self.options.lock().clone();
		let browser = self.launcher.launch(&options.launch).await?;
		let page = browser.new_page().await?;
		page.goto(&options.routes.base_url).await?;

		let auth = Arc::new(AuthMonitor::new(
			self.bus.clone(),
			options.routes.session_cookie.clone(),
			&options.routes.cookie_domain_pattern,
			options.allow_logs,
		)?);
		let tracker = Arc::new(NavigationTracker::new(
			options.routes.clone(),
			self.bus.clone(),
			auth.clone(),
		)?);

		// passive auth evidence: watch every outbound request
		{
			let auth = auth.clone();
			page.on_request(Arc::new(move |request| auth.observe_request(&request)));
		}

		// location bridge: route changes drain in order through one task,
		// so each classification (and its auth re-probe) completes before
		// the next is looked at
		let (location_tx, mut location_rx) = mpsc::unbounded_channel();
		page.on_location_change(Arc::new(move |location| {
			let _ = location_tx.send(location);
		}));
		let bridge = {
			let tracker = tracker.clone();
			let browser = browser.clone();
			tokio::spawn(async move {
				while let Some(location) = location_rx.recv().await {
					tracker.observe(location, browser.as_ref()).await;
				}
			})
		};

		auth.probe(browser.as_ref()).await;

		let engine = TurnEngine::new(page.clone(), tracker.clone(), auth.clone(), self.bus.clone(), options);
		*self.active.lock() = Some(Arc::new(Active {
			browser,
			page,
			auth,
			tracker,
			engine,
			bridge,
		}));
		*self.state.lock() = LifecycleState::Ready;
		self.bus.emit(SessionEvent::Initialized);
		debug!(target: "cg.session", "session initialized");
		Ok(())
	}

	/// Releases the browser. The session may be initialized again.
	pub async fn destroy(&self) -> Result<()> {
		let active = self.active.lock().take().ok_or(Error::NotInitialized)?;
		active.bridge.abort();
		active.browser.close().await?;
		*self.state.lock() = LifecycleState::Destroyed;
		self.bus.emit(SessionEvent::BrowserDestroyed);
		debug!(target: "cg.session", "browser released");
		Ok(())
	}

	/// Replaces the configuration and recycles the browser under it.
	///
	/// Emits `Hide`/`Show` when the headless flag flips, then
	/// `OptionsChanged` carrying both configuration snapshots.
	pub async fn set_options(&self, options: SessionOptions) -> Result<()> {
		let old = self.options.lock().clone();
		let flip = match (old.launch.headless, options.launch.headless) {
			(false, true) => Some(SessionEvent::Hide),
			(true, false) => Some(SessionEvent::Show),
			_ => None,
		};

		*self.options.lock() = options.clone();
		self.recycle().await?;

		if let Some(event) = flip {
			self.bus.emit(event);
		}
		self.bus.emit(SessionEvent::OptionsChanged {
			old: Box::new(old),
			new: Box::new(options),
		});
		Ok(())
	}

	/// Shows the browser window (headful relaunch).
	pub async fn show(&self) -> Result<()> {
		self.options.lock().launch.headless = false;
		self.recycle().await?;
		self.bus.emit(SessionEvent::Show);
		Ok(())
	}

	/// Hides the browser window (headless relaunch).
	pub async fn hide(&self) -> Result<()> {
		self.options.lock().launch.headless = true;
		self.recycle().await?;
		self.bus.emit(SessionEvent::Hide);
		Ok(())
	}

	async fn recycle(&self) -> Result<()> {
		self.destroy().await?;
		self.initialize().await
	}

	/// Which conversation the next turn targets.
	pub fn get_selected_chat(&self) -> Result<ChatSelection> {
		Ok(self.active()?.tracker.selection())
	}

	/// Latched bearer credential, absent until a request carried one.
	pub fn get_authorization_string(&self) -> Result<Option<String>> {
		Ok(self.active()?.auth.authorization())
	}

	/// Every cookie the browser currently holds.
	pub async fn cookies(&self) -> Result<Vec<Cookie>> {
		self.active()?.browser.cookies().await
	}

	/// Submits a prompt on the selected chat and returns the parsed
	/// reply together with the chat the page settled on.
	pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<TurnOutcome> {
		self.active()?.engine.generate(prompt, options).await
	}

	/// Selects the fresh-chat surface.
	pub async fn select_new_chat(&self) -> Result<()> {
		self.active()?.engine.select_new_chat().await
	}

	/// Selects the unsaved temporary chat.
	pub async fn select_temporary_chat(&self) -> Result<()> {
		self.active()?.engine.select_temporary_chat().await
	}

	/// Selects the saved conversation `id`.
	pub async fn select_chat(&self, id: &str) -> Result<()> {
		self.active()?.engine.select_chat(id).await
	}

	/// Re-enters the selected (or given) chat, recovering stuck UI.
	pub async fn reload_chat_page(&self, id: Option<&str>) -> Result<()> {
		self.active()?.engine.reload_chat_page(id).await
	}

	/// Establishes a fresh saved thread and returns its id.
	pub async fn create_chat(&self) -> Result<String> {
		self.active()?.engine.create_chat().await
	}

	/// Lists conversations ordered by last update.
	pub async fn conversations(&self, offset: u32, limit: u32) -> Result<Option<ConversationPage>> {
		let active = self.active()?;
		ConversationApi::new(active.page.as_ref(), &active.auth).list(offset, limit).await
	}

	/// Soft-deletes the conversation `id`.
	pub async fn delete_chat(&self, id: &str) -> Result<bool> {
		let active = self.active()?;
		ConversationApi::new(active.page.as_ref(), &active.auth).delete(id).await
	}
}
