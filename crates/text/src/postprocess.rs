//! Cleanup of raw provider output.
//!
//! Providers wrap completions in markdown fences or echo back lines that
//! already exist around the cursor. Both transforms are pure and applied to
//! every raw candidate before it is validated or shown.

use rustc_hash::FxHashSet;

/// Maximum trimmed length of a trailing line that may be bridged over while
/// looking for a genuine suffix match further up.
const BRIDGE_MAX_CHARS: usize = 2;

/// Maximum number of bridged lines per gap.
const BRIDGE_MAX_LINES: usize = 2;

/// Runs both transforms: fence stripping, then context-overlap stripping.
pub fn postprocess(text: &str, before: &str, after: &str) -> String {
	let text = strip_code_fences(text);
	strip_context_overlap(&text, before, after)
}

/// Strips a wrapping markdown code fence.
///
/// If the first line opens a fence it is dropped and leading whitespace is
/// removed from the new first line; if the last line closes a fence it is
/// dropped. The two halves are independent, so a candidate missing its
/// closer still loses the opener.
pub fn strip_code_fences(text: &str) -> String {
	let mut lines: Vec<&str> = text.lines().collect();
	let mut trimmed_first = None;
	if lines.first().is_some_and(|l| is_fence(l)) {
		lines.remove(0);
		if let Some(first) = lines.first() {
			trimmed_first = Some(first.trim_start());
		}
	}
	if let Some(first) = trimmed_first {
		lines[0] = first;
	}
	if lines.last().is_some_and(|l| is_fence(l)) {
		lines.pop();
	}
	lines.join("\n")
}

fn is_fence(line: &str) -> bool {
	line.trim_start().starts_with("```")
}

/// Strips candidate lines that duplicate the surrounding document context.
///
/// Leading lines present in the prefix are removed from the top; trailing
/// lines present in the suffix are removed from the bottom. The bottom scan
/// bridges over up to two short lines (closing brackets and the like) that
/// are not themselves in the suffix, on the theory the suffix context may
/// have been truncated; a bridge only counts when a genuine match sits above
/// it. Never returns an empty result for non-empty input: if stripping would
/// remove every line the input is returned unchanged.
pub fn strip_context_overlap(text: &str, before: &str, after: &str) -> String {
	let lines: Vec<&str> = text.lines().collect();
	if lines.is_empty() {
		return text.to_string();
	}
	let before_set: FxHashSet<&str> = context_lines(before);
	let after_set: FxHashSet<&str> = context_lines(after);

	let mut start = 0;
	while start < lines.len() {
		let trimmed = lines[start].trim();
		if trimmed.is_empty() || !before_set.contains(trimmed) {
			break;
		}
		start += 1;
	}

	let mut stripped = 0;
	let mut bridged = 0;
	for line in lines[start..].iter().rev() {
		let trimmed = line.trim();
		if !trimmed.is_empty() && after_set.contains(trimmed) {
			stripped += bridged + 1;
			bridged = 0;
		} else if trimmed.chars().count() <= BRIDGE_MAX_CHARS && bridged < BRIDGE_MAX_LINES {
			bridged += 1;
		} else {
			break;
		}
	}
	let end = lines.len() - stripped;

	if start >= end {
		return text.to_string();
	}
	let out = lines[start..end].join("\n");
	// Stripping everything but blank lines still counts as emptying.
	if out.is_empty() {
		return text.to_string();
	}
	out
}

fn context_lines(context: &str) -> FxHashSet<&str> {
	context.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}
