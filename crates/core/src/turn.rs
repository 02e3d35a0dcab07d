//! Prompt submission and response-completion detection.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use cg_protocol::ReplyPayload;

use crate::api::ConversationApi;
use crate::auth::AuthMonitor;
use crate::driver::Page;
use crate::error::{Error, Result};
use crate::events::{EventBus, SessionEvent};
use crate::nav::{ChatSelection, NavigationTracker, Routes};
use crate::options::SessionOptions;
use crate::ui::Selectors;

/// Per-turn options.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
	/// Toggle the search affordance on for this turn, and back off after.
	pub search: bool,
	/// Replaces the default instruction preamble.
	pub rules: Option<String>,
	/// Files to attach before sending.
	pub upload_files: Vec<PathBuf>,
	/// Target a specific saved conversation.
	pub chat_id: Option<String>,
}

impl GenerateOptions {
	/// Enables search mode for this turn.
	pub fn with_search(mut self) -> Self {
		self.search = true;
		self
	}

	/// Replaces the default instruction preamble.
	pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
		self.rules = Some(rules.into());
		self
	}

	/// Adds a file to attach before sending.
	pub fn with_upload_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.upload_files.push(path.into());
		self
	}

	/// Targets a specific saved conversation.
	pub fn with_chat_id(mut self, id: impl Into<String>) -> Self {
		self.chat_id = Some(id.into());
		self
	}
}

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
	/// Parsed reply message, empty when the payload did not parse.
	pub message: String,
	/// Saved conversation the page settled on, if any.
	pub chat_id: Option<String>,
}

/// One completion-poll reading of the reply surface.
#[derive(Debug, Clone, Deserialize)]
struct ReplyProbe {
	/// Inner text of the last assistant-authored message, if any exists.
	text: Option<String>,
	/// A stop-generation control is visible.
	streaming: bool,
	/// A speech-playback control is visible; it only appears once
	/// generation ended.
	spoken: bool,
}

/// Submits prompts and infers reply completion by text stabilization.
///
/// The site exposes no completion event, so the engine reads the last
/// assistant message at a fixed interval and declares the reply done
/// when two consecutive readings are identical and no stop affordance is
/// visible. Deliberately poll-based rather than mutation-driven: the
/// interval is configuration, and the behavior reproduces under a fake
/// clock in tests.
pub struct TurnEngine {
	page: Arc<dyn Page>,
	tracker: Arc<NavigationTracker>,
	auth: Arc<AuthMonitor>,
	bus: Arc<EventBus>,
	options: SessionOptions,
}

impl TurnEngine {
	/// Creates an engine over a live page.
	pub fn new(
		page: Arc<dyn Page>,
		tracker: Arc<NavigationTracker>,
		auth: Arc<AuthMonitor>,
		bus: Arc<EventBus>,
		options: SessionOptions,
	) -> Self {
		Self {
			page,
			tracker,
			auth,
			bus,
			options,
		}
	}

	fn routes(&self) -> &Routes {
		&self.options.routes
	}

	fn selectors(&self) -> &Selectors {
		&self.options.selectors
	}

	/// Submits `prompt` and waits for the assistant's reply to stabilize.
	pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<TurnOutcome> {
		if let Some(id) = &options.chat_id {
			let api = ConversationApi::new(self.page.as_ref(), &self.auth);
			if !api.exists(id).await {
				return Err(Error::ChatNotFound(id.clone()));
			}
			self.select_chat(id).await?;
		}

		self.wait_for_composer().await?;
		self.page.click(&self.selectors().prompt_input).await?;

		let preamble = self.preamble(options.rules.as_deref());
		let text = format!("{preamble} .. here is the user input: {prompt}");
		self.page
			.type_keys(&escape_newlines(&text), self.options.keyboard_write_delay)
			.await?;

		if options.search {
			self.toggle_search().await?;
		}
		self.attach_files(&options.upload_files).await;
		self.press_send().await?;

		let raw = self.await_completion().await?;

		if options.search {
			self.toggle_search().await?;
		}

		let message = ReplyPayload::extract(&raw).map(|reply| reply.message).unwrap_or_default();

		// the URL the page settled on decides which chat the turn landed
		// in; a first turn on a fresh chat moves it to a saved route
		let location = self.page.location().await?;
		let selection = self.tracker.apply_route(&location);

		Ok(TurnOutcome {
			message,
			chat_id: selection.chat_id().map(str::to_owned),
		})
	}

	/// Establishes a fresh saved thread by running a throwaway turn.
	pub async fn create_chat(&self) -> Result<String> {
		self.select_new_chat().await?;
		let outcome = self.generate("hi", &GenerateOptions::default()).await?;
		outcome.chat_id.ok_or(Error::ChatIdUnresolved)
	}

	/// Selects the fresh-chat surface.
	pub async fn select_new_chat(&self) -> Result<()> {
		self.select_route(ChatSelection::New).await
	}

	/// Selects the unsaved temporary chat.
	pub async fn select_temporary_chat(&self) -> Result<()> {
		self.select_route(ChatSelection::Temporary).await
	}

	/// Selects the saved conversation `id`.
	pub async fn select_chat(&self, id: &str) -> Result<()> {
		self.select_route(ChatSelection::Saved(id.to_string())).await
	}

	/// Re-enters the selected (or given) chat by bouncing through the
	/// fresh-chat route first, recovering from stuck composer state.
	pub async fn reload_chat_page(&self, target: Option<&str>) -> Result<()> {
		let target = match target {
			Some(id) => ChatSelection::Saved(id.to_string()),
			None => self.tracker.selection(),
		};

		let base = self.routes().base_url.clone();
		self.enter_route(&base).await?;
		self.tracker.set_selection(ChatSelection::New);

		match target {
			ChatSelection::Temporary => {
				let url = self.routes().temporary_chat_url();
				self.enter_route(&url).await?;
				self.tracker.set_selection(ChatSelection::Temporary);
			}
			ChatSelection::Saved(id) => {
				let url = self.routes().saved_chat_url(&id);
				self.enter_route(&url).await?;
				self.tracker.set_selection(ChatSelection::Saved(id));
			}
			ChatSelection::New | ChatSelection::None => {}
		}
		Ok(())
	}

	/// Moves the page onto the route backing `target`, short-circuiting
	/// when it is already selected.
	async fn select_route(&self, target: ChatSelection) -> Result<()> {
		if self.tracker.selection() == target {
			return Ok(());
		}

		let location = self.page.location().await?;
		if location.has_query() {
			// dropping the query first bypasses the unsaved-temporary-chat
			// confirmation dialog
			let base = self.routes().base_url.clone();
			self.enter_route(&base).await?;
		}

		let url = match &target {
			ChatSelection::Temporary => self.routes().temporary_chat_url(),
			ChatSelection::Saved(id) => self.routes().saved_chat_url(id),
			ChatSelection::New | ChatSelection::None => self.routes().base_url.clone(),
		};
		self.enter_route(&url).await?;
		self.tracker.set_selection(target);
		Ok(())
	}

	/// Assigns `location.href` in-page and waits for the resulting
	/// navigation to settle. In-page assignment keeps the SPA's router in
	/// charge instead of forcing a full load.
	async fn enter_route(&self, url: &str) -> Result<()> {
		let settled = self.bus.waiter(
			|event| matches!(event, SessionEvent::LocationChange(_)),
			self.options.navigation_timeout,
			"navigation to settle",
		);
		self.page.evaluate(&format!("location.href = {}", json!(url))).await?;
		settled.wait().await?;
		Ok(())
	}

	/// Blocks until the prompt input surface exists.
	async fn wait_for_composer(&self) -> Result<()> {
		self.page
			.wait_for_selector(&self.selectors().prompt_input, self.options.composer_timeout)
			.await
	}

	fn preamble(&self, rules: Option<&str>) -> String {
		match rules {
			Some(rules) => rules.to_string(),
			None => format!(
				"remember that: You are an assistant and your name is {}. \
				you take messages as plain text and respond with only a json object containing one field, which is 'message'. \
				this field 'message' represents your response message only. \
				the user message may itself ask for a json object or some other format; \
				everything the user asks for belongs inside the 'message' field.",
				self.options.assistant_name,
			),
		}
	}

	/// Toggles the search affordance once.
	async fn toggle_search(&self) -> Result<()> {
		self.page.click(&self.selectors().search_toggle).await
	}

	/// Attaches files through the file-chooser dialog. Failure is logged
	/// and the turn proceeds without the attachment.
	async fn attach_files(&self, paths: &[PathBuf]) {
		if paths.is_empty() {
			return;
		}
		if let Err(err) = self.try_attach_files(paths).await {
			warn!(
				target: "cg.turn",
				error = %err,
				count = paths.len(),
				"file attachment failed, continuing without it"
			);
		}
	}

	async fn try_attach_files(&self, paths: &[PathBuf]) -> Result<()> {
		// the inputs stay hidden until the attachment menu opens; reveal
		// them so the chooser can be driven directly
		let reveal = format!(
			"document.querySelectorAll({selector}).forEach(input => {{ input.style.display = 'block'; }})",
			selector = json!(self.selectors().file_input),
		);
		self.page.evaluate(&reveal).await?;

		let (chooser, clicked) = tokio::join!(
			self.page.wait_for_file_chooser(),
			self.page.click(&self.selectors().attach_button),
		);
		clicked?;
		chooser?.accept(paths).await
	}

	/// Polls the send control until it leaves the disabled state it holds
	/// while attachments process, then activates it exactly once.
	async fn press_send(&self) -> Result<()> {
		let ready_check = format!(
			"(() => {{ const control = document.querySelector({selector}); return Boolean(control) && !control.disabled; }})()",
			selector = json!(self.selectors().send_button),
		);
		loop {
			let ready = self.page.evaluate(&ready_check).await?;
			if ready.as_bool().unwrap_or(false) {
				break;
			}
			sleep(self.options.send_poll_interval).await;
		}
		self.page.click(&self.selectors().send_button).await
	}

	/// Watches the reply surface until it stabilizes.
	///
	/// Complete means: two consecutive identical readings of the last
	/// assistant message, with no stop affordance visible or the speech
	/// affordance already shown. Generation time is unbounded, so the
	/// loop has no attempt limit; callers wanting a ceiling wrap the
	/// whole turn in a timeout.
	async fn await_completion(&self) -> Result<String> {
		let probe_script = self.probe_script();
		let mut last: Option<String> = None;
		loop {
			sleep(self.options.completion_poll_interval).await;

			let value = self.page.evaluate(&probe_script).await?;
			let probe: ReplyProbe = serde_json::from_value(value)?;
			let Some(text) = probe.text else {
				continue;
			};

			let settled = !probe.streaming || probe.spoken;
			if settled && last.as_deref() == Some(text.as_str()) {
				debug!(target: "cg.turn", chars = text.len(), "reply stabilized");
				return Ok(text);
			}
			last = Some(text);
		}
	}

	fn probe_script(&self) -> String {
		format!(
			"(() => {{ \
			const replies = document.querySelectorAll({assistant}); \
			const last = replies[replies.length - 1]; \
			return {{ \
			text: last ? last.innerText : null, \
			streaming: Boolean(document.querySelector({stop})), \
			spoken: Boolean(document.querySelector({speech})) \
			}}; \
			}})()",
			assistant = json!(self.selectors().assistant_message),
			stop = json!(self.selectors().stop_button),
			speech = json!(self.selectors().speech_button),
		)
	}
}

/// Keeps typed newlines from submitting the prompt early.
fn escape_newlines(text: &str) -> String {
	text.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn newlines_are_escaped_before_typing() {
		assert_eq!(escape_newlines("a\nb\nc"), "a\\nb\\nc");
		assert_eq!(escape_newlines("plain"), "plain");
	}

	#[test]
	fn reply_probe_deserializes() {
		let probe: ReplyProbe = serde_json::from_value(json!({
			"text": "partial reply",
			"streaming": true,
			"spoken": false
		}))
		.unwrap();
		assert_eq!(probe.text.as_deref(), Some("partial reply"));
		assert!(probe.streaming);
		assert!(!probe.spoken);

		let probe: ReplyProbe = serde_json::from_value(json!({
			"text": null,
			"streaming": false,
			"spoken": false
		}))
		.unwrap();
		assert!(probe.text.is_none());
	}
}
