//! The editor-facing seam.
//!
//! The engine never touches a text buffer or draws ghost text itself; it
//! reads document state and applies edits through [`Host`]. Columns are
//! char offsets within a line, lines are zero-based.

/// Identifies one open document in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

/// A cursor location: zero-based line, char column within that line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
	pub line: usize,
	pub column: usize,
}

impl Position {
	pub fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}
}

/// One atomic document mutation plus the caret move that goes with it.
///
/// Replaces `removed` lines starting at `line` with `inserted`, then places
/// the cursor at `caret`. Hosts must apply the whole edit as a single
/// undo/redraw unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
	/// First line replaced.
	pub line: usize,
	/// Number of existing lines removed.
	pub removed: usize,
	/// Replacement lines.
	pub inserted: Vec<String>,
	/// Cursor position after the edit.
	pub caret: Position,
}

/// Editor capabilities the engine drives.
///
/// Read methods reflect live state and are called on every event; they must
/// be cheap. `apply_edit` is the only way the engine mutates a document, and
/// overlay methods render the non-destructive ghost text for the currently
/// selected candidate (`selected` is zero-based, alongside `total` so a UI
/// can show a cycle indicator).
pub trait Host {
	fn active_document(&self) -> Option<DocumentId>;
	/// True while the document accepts insert-mode style edits.
	fn is_editable(&self, document: DocumentId) -> bool;
	fn cursor(&self) -> Position;
	fn line_text(&self, document: DocumentId, line: usize) -> Option<String>;
	fn filetype(&self, document: DocumentId) -> Option<String>;
	fn apply_edit(&mut self, document: DocumentId, edit: DocumentEdit);
	fn show_overlay(&mut self, document: DocumentId, at: Position, text: &str, selected: usize, total: usize);
	fn clear_overlay(&mut self);
}
