//! Deferred validation of auto-triggered responses.
//!
//! An auto request is fired optimistically before the user stops typing. By
//! the time the response arrives the user may have typed further characters;
//! if they are a prefix of a candidate the response is still usable once
//! trimmed, otherwise showing it would contradict the document. The decision
//! is pure: the engine feeds live cursor state into [`validate`] and applies
//! the returned [`ValidationOutcome`].
//!
//! The number of typed characters required before a candidate is trusted
//! comes from the overlap threshold of the first candidate's first line.
//! Until the threshold is met the engine arms an idle timer and calls back
//! in with `force = true` when it elapses, so a completion is never held
//! hostage indefinitely.

use wisp_text::OverlapSpec;

use crate::events::RejectReason;
use crate::host::{DocumentId, Position};
use crate::request::RequestId;
use crate::store::Candidate;

/// A response awaiting validation. At most one exists at a time; it is
/// destroyed by promotion into the candidate store or by discard.
#[derive(Debug)]
pub struct PendingValidation {
	pub candidates: Vec<Candidate>,
	pub document: DocumentId,
	/// Cursor position at trigger time.
	pub position: Position,
	/// Text of the trigger line at trigger time.
	pub line: String,
	pub request_id: RequestId,
	pub generation: u64,
	/// Identity of the currently armed idle timer.
	pub idle_seq: u64,
}

/// What the engine should do with a pending validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
	/// Install the trimmed candidates at the current cursor and render.
	Promote { candidates: Vec<Candidate>, at: Position },
	/// Not enough typed yet; refresh the idle timer and keep waiting.
	Wait,
	/// Discard with a user-visible rejection reason.
	Reject(RejectReason),
	/// Discard silently: everything matched but nothing survived trimming.
	Discard,
}

/// Chars of `line` between two columns.
pub(crate) fn typed_between(line: &str, from: usize, to: usize) -> String {
	line.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// True if `line` and `snapshot` agree on their first `columns` chars.
pub(crate) fn line_prefix_matches(line: &str, snapshot: &str, columns: usize) -> bool {
	let mut live = line.chars();
	let mut snap = snapshot.chars();
	for _ in 0..columns {
		if live.next() != snap.next() {
			return false;
		}
	}
	true
}

/// Decides the fate of a pending validation against live cursor state.
///
/// `line` is the current text of the cursor's line. With `force` set (the
/// idle fallback fired) the threshold is skipped and whatever has been typed
/// so far decides.
pub fn validate(
	pending: &PendingValidation,
	cursor: Position,
	line: &str,
	spec: &OverlapSpec,
	force: bool,
) -> ValidationOutcome {
	if cursor.line != pending.position.line || cursor.column < pending.position.column {
		return ValidationOutcome::Reject(RejectReason::CursorMoved);
	}
	// An edit behind the trigger column invalidates the snapshot even though
	// the cursor looks compatible.
	if !line_prefix_matches(line, &pending.line, pending.position.column) {
		return ValidationOutcome::Reject(RejectReason::CursorMoved);
	}
	let typed = typed_between(line, pending.position.column, cursor.column);
	if !pending.candidates.iter().any(|c| c.text.starts_with(&typed)) {
		return ValidationOutcome::Reject(RejectReason::Mismatch { typed });
	}
	if !force {
		let first_line = pending
			.candidates
			.first()
			.and_then(|c| c.text.lines().next())
			.unwrap_or_default();
		match spec.threshold(first_line) {
			Some(threshold) if typed.chars().count() >= threshold => {}
			// No threshold (degenerate spec or not enough content) falls
			// back to the idle timer as well.
			_ => return ValidationOutcome::Wait,
		}
	}
	let survivors: Vec<Candidate> = pending
		.candidates
		.iter()
		.filter(|c| c.text.starts_with(&typed))
		.filter_map(|c| {
			let text = c.text[typed.len()..].to_string();
			(!text.is_empty()).then(|| Candidate { text, source: c.source.clone() })
		})
		.collect();
	if survivors.is_empty() {
		return ValidationOutcome::Discard;
	}
	ValidationOutcome::Promote { candidates: survivors, at: cursor }
}
