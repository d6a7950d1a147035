//! In-flight request bookkeeping.

use std::fmt;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::host::{DocumentId, Position};

/// Opaque request correlation id, unique per engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "req-{}", self.0)
	}
}

/// How a request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
	/// Fired by the debounce timer after document changes.
	Auto,
	/// Explicitly requested by the user.
	Manual,
}

/// The single request currently in flight, created at trigger time and
/// consumed exactly once by its response. Never mutated after creation.
#[derive(Debug)]
pub struct PendingRequest {
	/// Generation captured at trigger time; the response is dropped if the
	/// engine has moved past it.
	pub generation: u64,
	pub id: RequestId,
	pub kind: TriggerKind,
	pub document: DocumentId,
	/// Cursor position at trigger time.
	pub position: Position,
	/// Text of the cursor's line at trigger time.
	pub line: String,
	pub filetype: Option<String>,
	/// Candidate texts rejected since the last successful display.
	pub rejected: Vec<String>,
	pub started: Instant,
	/// Best-effort cancellation handle for the provider call.
	pub cancel: CancellationToken,
}
