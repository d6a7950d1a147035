//! The active candidate set.
//!
//! Holds the ordered candidates, the selected index, and the visibility
//! flag, anchored to the position they were installed at. Invariant: while
//! visible, the candidate list is non-empty and the selected index is valid.

use crate::host::{DocumentId, Position};

/// One proposed insertion, possibly multi-line.
///
/// `text` is what would be inserted at the anchor right now; `source` is the
/// postprocessed provider output before any typed-prefix trimming, kept so a
/// regeneration can exclude the original proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
	pub text: String,
	pub source: String,
}

impl Candidate {
	pub fn new(text: String) -> Self {
		Self { source: text.clone(), text }
	}
}

/// Result of trimming the store against newly typed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
	/// At least one candidate survived; anchor moved to the cursor.
	Trimmed,
	/// Everything matched but was typed out completely; store cleared.
	Emptied,
	/// No candidate has the typed text as a prefix; store untouched.
	Mismatch,
}

/// The displayed candidate set.
#[derive(Debug, Default)]
pub struct CandidateStore {
	document: Option<DocumentId>,
	anchor: Position,
	/// Text of the anchor line when the set was installed, for detecting
	/// edits behind the anchor column.
	anchor_line: String,
	candidates: Vec<Candidate>,
	selected: usize,
	visible: bool,
}

impl CandidateStore {
	/// Installs a fresh candidate set anchored at `anchor`.
	///
	/// Empty candidate texts are dropped; installing nothing usable clears
	/// the store instead.
	pub fn install(&mut self, document: DocumentId, anchor: Position, anchor_line: String, candidates: Vec<Candidate>) {
		let candidates: Vec<Candidate> = candidates.into_iter().filter(|c| !c.text.is_empty()).collect();
		if candidates.is_empty() {
			self.clear();
			return;
		}
		self.document = Some(document);
		self.anchor = anchor;
		self.anchor_line = anchor_line;
		self.candidates = candidates;
		self.selected = 0;
		self.visible = true;
	}

	/// Replaces the set with a single candidate, keeping the document.
	pub fn set_sole(&mut self, candidate: Candidate, anchor: Position, anchor_line: String) {
		let Some(document) = self.document else {
			self.clear();
			return;
		};
		self.install(document, anchor, anchor_line, vec![candidate]);
	}

	pub fn clear(&mut self) {
		self.document = None;
		self.anchor = Position::default();
		self.anchor_line.clear();
		self.candidates.clear();
		self.selected = 0;
		self.visible = false;
	}

	pub fn is_visible(&self) -> bool {
		self.visible
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	pub fn document(&self) -> Option<DocumentId> {
		self.document
	}

	pub fn anchor(&self) -> Position {
		self.anchor
	}

	pub fn anchor_line(&self) -> &str {
		&self.anchor_line
	}

	/// Zero-based index of the selected candidate.
	pub fn selected_index(&self) -> usize {
		self.selected
	}

	/// The selected candidate, `Some` exactly while visible.
	pub fn selected(&self) -> Option<&Candidate> {
		self.visible.then(|| self.candidates.get(self.selected)).flatten()
	}

	/// Rotates the selection forward. Returns false when nothing is shown.
	pub fn next(&mut self) -> bool {
		if !self.visible || self.candidates.is_empty() {
			return false;
		}
		self.selected = (self.selected + 1) % self.candidates.len();
		true
	}

	/// Rotates the selection backward. Returns false when nothing is shown.
	pub fn prev(&mut self) -> bool {
		if !self.visible || self.candidates.is_empty() {
			return false;
		}
		self.selected = (self.selected + self.candidates.len() - 1) % self.candidates.len();
		true
	}

	/// Trims `typed` off the front of every matching candidate and re-anchors
	/// the set at the cursor. Candidates that do not match, or that become
	/// empty, are dropped; the previously selected candidate stays selected
	/// when it survives.
	pub fn trim(&mut self, typed: &str, anchor: Position, anchor_line: String) -> TrimOutcome {
		if !self.candidates.iter().any(|c| c.text.starts_with(typed)) {
			return TrimOutcome::Mismatch;
		}
		let selected_text = self.candidates.get(self.selected).map(|c| c.text.clone());
		let mut survivors = Vec::with_capacity(self.candidates.len());
		let mut selected = None;
		for candidate in std::mem::take(&mut self.candidates) {
			if !candidate.text.starts_with(typed) {
				continue;
			}
			let text = candidate.text[typed.len()..].to_string();
			if text.is_empty() {
				continue;
			}
			if selected.is_none() && selected_text.as_deref() == Some(candidate.text.as_str()) {
				selected = Some(survivors.len());
			}
			survivors.push(Candidate { text, source: candidate.source });
		}
		if survivors.is_empty() {
			self.clear();
			return TrimOutcome::Emptied;
		}
		self.candidates = survivors;
		self.selected = selected.unwrap_or(0);
		self.anchor = anchor;
		self.anchor_line = anchor_line;
		TrimOutcome::Trimmed
	}
}
