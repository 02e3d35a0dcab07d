//! Thin request helpers over the latched credential.
//!
//! Conversation listing and deletion go through the site's backend,
//! executed inside the page so the browser supplies origin and cookies
//! and only the `Authorization` header has to be added. Every failure
//! degrades to an absence value; a flaky backend never crashes the
//! session.

use serde_json::json;
use tracing::debug;

use cg_protocol::ConversationPage;

use crate::auth::AuthMonitor;
use crate::driver::Page;
use crate::error::Result;

/// Backend calls scoped to one page and one credential.
pub struct ConversationApi<'a> {
	page: &'a dyn Page,
	auth: &'a AuthMonitor,
}

impl<'a> ConversationApi<'a> {
	/// Creates helpers over the given page and auth monitor.
	pub fn new(page: &'a dyn Page, auth: &'a AuthMonitor) -> Self {
		Self { page, auth }
	}

	/// Lists conversations ordered by last update.
	///
	/// `None` when no credential has been observed yet or the backend
	/// answer is unusable.
	pub async fn list(&self, offset: u32, limit: u32) -> Result<Option<ConversationPage>> {
		let Some(authorization) = self.auth.authorization() else {
			return Ok(None);
		};
		let endpoint = format!("/backend-api/conversations?offset={offset}&limit={limit}&order=updated");
		let script = format!(
			"fetch({endpoint}, {{ headers: {{ Authorization: {authorization} }} }}).then(res => res.json()).catch(() => null)",
			endpoint = json!(endpoint),
			authorization = json!(authorization),
		);

		let value = self.page.evaluate(&script).await?;
		if value.get("items").is_none() {
			return Ok(None);
		}
		match serde_json::from_value::<ConversationPage>(value) {
			Ok(page) => Ok(Some(page)),
			Err(err) => {
				debug!(target: "cg.api", error = %err, "conversation listing did not parse");
				Ok(None)
			}
		}
	}

	/// True when the saved conversation `id` is reachable with the
	/// current credential.
	pub async fn exists(&self, id: &str) -> bool {
		let Some(authorization) = self.auth.authorization() else {
			return false;
		};
		let script = format!(
			"fetch({endpoint}, {{ headers: {{ Authorization: {authorization} }} }}).then(res => res.ok).catch(() => false)",
			endpoint = json!(format!("/backend-api/conversation/{id}")),
			authorization = json!(authorization),
		);

		match self.page.evaluate(&script).await {
			Ok(value) => value.as_bool().unwrap_or(false),
			Err(_) => false,
		}
	}

	/// Hides the conversation `id` (the backend's soft delete). Returns
	/// whether the backend acknowledged it.
	pub async fn delete(&self, id: &str) -> Result<bool> {
		let Some(authorization) = self.auth.authorization() else {
			return Ok(false);
		};
		let body = json!({ "is_visible": false }).to_string();
		let script = format!(
			"fetch({endpoint}, {{ method: 'PATCH', headers: {{ 'Content-Type': 'application/json', Authorization: {authorization} }}, body: {body} }}).then(res => res.ok).catch(() => false)",
			endpoint = json!(format!("/backend-api/conversation/{id}")),
			authorization = json!(authorization),
			body = json!(body),
		);

		let value = self.page.evaluate(&script).await?;
		Ok(value.as_bool().unwrap_or(false))
	}
}
