//! Structured reply extraction from streamed assistant text.

use serde::{Deserialize, Serialize};

/// The structured body the assistant is instructed to reply with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
	/// The assistant's response message.
	#[serde(default)]
	pub message: String,
}

impl ReplyPayload {
	/// Extracts the first balanced `{...}` span from `text` and parses it.
	///
	/// Streamed output often wraps the payload in prose or formatting, so
	/// the scan tolerates surrounding text and unbalanced braces before
	/// the payload. Returns `None` when no balanced span exists or the
	/// span does not parse as an object.
	pub fn extract(text: &str) -> Option<Self> {
		let span = first_balanced_object(text)?;
		serde_json::from_str(span).ok()
	}
}

/// Finds the first balanced `{...}` span, honoring JSON string escapes.
///
/// Candidate opening braces that never close are skipped, so a stray `{`
/// in the surrounding text does not hide the payload behind it.
fn first_balanced_object(text: &str) -> Option<&str> {
	let mut from = 0;
	while let Some(offset) = text[from..].find('{') {
		let start = from + offset;
		if let Some(len) = balanced_len(&text[start..]) {
			return Some(&text[start..start + len]);
		}
		from = start + 1;
	}
	None
}

/// Length of the balanced object starting at the first byte of `text`,
/// or `None` if it never closes.
fn balanced_len(text: &str) -> Option<usize> {
	let mut depth = 0usize;
	let mut in_string = false;
	let mut escaped = false;

	for (i, byte) in text.bytes().enumerate() {
		if in_string {
			if escaped {
				escaped = false;
			} else if byte == b'\\' {
				escaped = true;
			} else if byte == b'"' {
				in_string = false;
			}
			continue;
		}
		match byte {
			b'"' => in_string = true,
			b'{' => depth += 1,
			b'}' => {
				depth -= 1;
				if depth == 0 {
					return Some(i + 1);
				}
			}
			_ => {}
		}
	}
	None
}
