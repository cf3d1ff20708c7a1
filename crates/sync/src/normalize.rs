//! Content normalization for comparisons.
//!
//! Engines and stores disagree on incidental details: line endings picked up
//! from pasted text, trailing newlines appended by serializers. Comparing
//! normalized forms keeps those from triggering replaces that would reset the
//! user's cursor mid-edit. Normalized text is only ever compared, never written.

use std::borrow::Cow;

/// Unifies line endings to `\n` and trims trailing whitespace from the document.
pub fn normalize(content: &str) -> Cow<'_, str> {
	let trimmed = content.trim_end();
	if !trimmed.contains('\r') {
		return Cow::Borrowed(trimmed);
	}
	Cow::Owned(trimmed.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Returns true if `a` and `b` are equal after [`normalize`].
pub fn content_eq(a: &str, b: &str) -> bool {
	a == b || normalize(a) == normalize(b)
}
