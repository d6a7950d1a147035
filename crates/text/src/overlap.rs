//! Overlap threshold arithmetic.
//!
//! An overlap spec is a string of the form `"[N][+M]"`: `N` is a segment
//! count and `M` is either an extra-character count or, when `0 < M < 1`, a
//! fraction of the following segment's length. The threshold derived from a
//! spec and a candidate's first line is the number of characters the user
//! must have typed past the trigger point before a speculatively requested
//! candidate is trusted enough to display.
//!
//! A spec that cannot produce a threshold for a given line returns `None`;
//! callers fall back to their idle timer. Malformed specs parse to the
//! degenerate spec whose threshold is always `None` rather than an error.

use crate::words::segments;

/// Parsed overlap spec.
///
/// `words` is the number of leading segments that must be fully typed;
/// `extra` is the additional requirement into the following segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlapSpec {
	words: Option<usize>,
	extra: Option<f64>,
}

impl OverlapSpec {
	/// Parses a `"[N][+M]"` spec string.
	///
	/// `"2"`, `"1+1"`, `"+0"`, and `"2+0.5"` are all valid. Anything that
	/// does not parse yields the degenerate spec.
	pub fn parse(spec: &str) -> Self {
		let spec = spec.trim();
		let (words_part, extra_part) = match spec.split_once('+') {
			Some((n, m)) => (n, Some(m)),
			None => (spec, None),
		};
		let words = if words_part.is_empty() {
			None
		} else {
			match words_part.trim().parse::<usize>() {
				Ok(n) => Some(n),
				Err(_) => return Self::default(),
			}
		};
		let extra = match extra_part {
			None => None,
			Some(m) => match m.trim().parse::<f64>() {
				Ok(m) if m >= 0.0 => Some(m),
				_ => return Self::default(),
			},
		};
		Self { words, extra }
	}

	/// True if this spec can never produce a threshold.
	pub fn is_degenerate(&self) -> bool {
		self.words.is_none() && self.extra.is_none()
	}

	/// Computes the typed-character threshold for a candidate's first line.
	///
	/// Offsets are in characters. Returns `None` when the line does not have
	/// enough content to satisfy the spec.
	pub fn threshold(&self, text: &str) -> Option<usize> {
		let Some(words) = self.words else {
			// No segment requirement: the extra count alone is the threshold.
			return self.extra.map(|m| m.floor() as usize);
		};
		let segs = segments(text);
		if segs.len() < words {
			return None;
		}
		let next = segs.get(words);
		match self.extra {
			None => match next {
				// N full segments plus any whitespace up to the next one.
				Some(seg) => Some(seg.start),
				None => {
					let end = if words == 0 { 0 } else { segs[words - 1].end() };
					let total = text.chars().count();
					(total > end).then_some(total)
				}
			},
			Some(extra) => {
				let next = next?;
				let chars = if extra > 0.0 && extra < 1.0 {
					(extra * next.len as f64).ceil() as usize
				} else {
					(extra.floor() as usize).min(next.len)
				};
				Some(next.start + chars)
			}
		}
	}
}
