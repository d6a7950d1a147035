//! Lifecycle events for external observers and the internal message pump.

use crate::error::ProviderError;
use crate::request::{RequestId, TriggerKind};

/// How a completed request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
	/// Installed into the candidate store and rendered.
	Shown,
	/// Handed to the deferred validator.
	Deferred,
	/// Provider returned nothing usable.
	Empty,
	/// Dropped because the cursor or document no longer matched.
	Discarded,
	/// Provider error.
	Failed,
}

/// Granularity of an acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptScope {
	Full,
	Lines(usize),
}

/// Why a candidate or pending validation went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
	/// User dismissed or regenerated.
	Explicit,
	/// Typed text matched no candidate prefix.
	Mismatch { typed: String },
	/// Cursor left the position the candidates were anchored to.
	CursorMoved,
	/// Idle fallback fired but nothing could be promoted.
	IdleTimeout,
}

/// Events delivered to [`Engine::subscribe`] observers (telemetry, UI).
///
/// [`Engine::subscribe`]: crate::engine::Engine::subscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
	RequestStarted {
		request_id: RequestId,
		generation: u64,
		kind: TriggerKind,
	},
	RequestComplete {
		request_id: RequestId,
		generation: u64,
		outcome: RequestOutcome,
	},
	Accepted {
		scope: AcceptScope,
	},
	Rejected {
		reason: RejectReason,
	},
}

/// Messages from spawned timers and request tasks back to the engine.
///
/// The host loop receives these via [`Engine::recv`] and applies them with
/// [`Engine::handle`]; every variant carries the identity it was started
/// under so stale ones can be dropped.
///
/// [`Engine::recv`]: crate::engine::Engine::recv
/// [`Engine::handle`]: crate::engine::Engine::handle
#[derive(Debug)]
pub enum EngineMsg {
	DebounceElapsed {
		seq: u64,
	},
	Response {
		generation: u64,
		request_id: RequestId,
		result: Result<Vec<String>, ProviderError>,
	},
	IdleElapsed {
		seq: u64,
	},
}
