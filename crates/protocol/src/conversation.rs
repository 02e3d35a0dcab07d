//! Conversation listings returned by the site's backend.

use serde::{Deserialize, Serialize};

/// One conversation as the backend lists it.
///
/// The backend payload carries far more than this; unknown fields are
/// ignored on purpose since the listing helpers only surface metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
	/// Conversation id, also the trailing segment of its page route.
	pub id: String,

	/// Display title.
	#[serde(default)]
	pub title: String,

	/// Creation timestamp as the backend formats it.
	#[serde(default)]
	pub create_time: Option<String>,

	/// Last-update timestamp as the backend formats it.
	#[serde(default)]
	pub update_time: Option<String>,

	/// Whether the conversation is archived.
	#[serde(default)]
	pub is_archived: bool,

	/// Whether the conversation is starred.
	#[serde(default)]
	pub is_starred: Option<bool>,
}

/// One page of the conversation listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationPage {
	/// Conversations in this page.
	#[serde(default)]
	pub items: Vec<Conversation>,

	/// Offset this page starts at.
	#[serde(default)]
	pub offset: u32,

	/// Page size that was requested.
	#[serde(default)]
	pub limit: u32,

	/// Total number of conversations.
	#[serde(default)]
	pub total: u32,
}
