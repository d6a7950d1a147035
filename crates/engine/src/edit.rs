//! Pure builders for acceptance edits.
//!
//! Acceptance is a single atomic [`DocumentEdit`]: the cursor line is split
//! at the anchor column, candidate lines are spliced between the two halves,
//! and the caret lands at the end of the inserted text. Partial acceptance
//! additionally returns the candidate remainder that stays displayed.

use crate::host::{DocumentEdit, Position};

/// Splits `line` at a char column, clamping past-the-end columns.
pub(crate) fn split_at_column(line: &str, column: usize) -> (&str, &str) {
	match line.char_indices().nth(column) {
		Some((idx, _)) => line.split_at(idx),
		None => (line, ""),
	}
}

pub(crate) fn char_len(text: &str) -> usize {
	text.chars().count()
}

/// Builds the edit committing the whole candidate at `at`.
pub fn splice_full(line: &str, at: Position, candidate: &str) -> DocumentEdit {
	let (prefix, suffix) = split_at_column(line, at.column);
	let lines: Vec<&str> = candidate.split('\n').collect();
	if let [only] = lines.as_slice() {
		return DocumentEdit {
			line: at.line,
			removed: 1,
			inserted: vec![format!("{prefix}{only}{suffix}")],
			caret: Position::new(at.line, at.column + char_len(only)),
		};
	}
	let last = lines[lines.len() - 1];
	let mut inserted = Vec::with_capacity(lines.len());
	inserted.push(format!("{prefix}{}", lines[0]));
	inserted.extend(lines[1..lines.len() - 1].iter().map(|l| (*l).to_string()));
	inserted.push(format!("{last}{suffix}"));
	DocumentEdit {
		line: at.line,
		removed: 1,
		inserted,
		caret: Position::new(at.line + lines.len() - 1, char_len(last)),
	}
}

/// A partial-acceptance edit plus the candidate text that remains displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSplice {
	pub edit: DocumentEdit,
	/// Remaining candidate lines, leading whitespace stripped from the first.
	pub remaining: String,
}

/// Builds the edit committing the first `keep` candidate lines.
///
/// The line after the boundary keeps its indentation in the document so the
/// caret lands past it, while the remainder loses that indentation. Callers
/// pass `1 <= keep < line count`; out-of-range values are clamped.
pub fn splice_partial(line: &str, at: Position, candidate: &str, keep: usize) -> PartialSplice {
	let lines: Vec<&str> = candidate.split('\n').collect();
	if lines.len() < 2 {
		return PartialSplice {
			edit: splice_full(line, at, candidate),
			remaining: String::new(),
		};
	}
	let keep = keep.clamp(1, lines.len() - 1);
	let (prefix, suffix) = split_at_column(line, at.column);
	let mut inserted = Vec::with_capacity(keep + 1);
	inserted.push(format!("{prefix}{}", lines[0]));
	inserted.extend(lines[1..keep].iter().map(|l| (*l).to_string()));
	let boundary = lines[keep];
	let stripped = boundary.trim_start();
	let indent = &boundary[..boundary.len() - stripped.len()];
	inserted.push(format!("{indent}{suffix}"));
	let caret = Position::new(at.line + keep, char_len(indent));
	let mut remaining_lines = Vec::with_capacity(lines.len() - keep);
	remaining_lines.push(stripped);
	remaining_lines.extend(&lines[keep + 1..]);
	PartialSplice {
		edit: DocumentEdit {
			line: at.line,
			removed: 1,
			inserted,
			caret,
		},
		remaining: remaining_lines.join("\n"),
	}
}
