//! Engine configuration.
//!
//! Carried as plain integers/strings so it can sit inside a host's own
//! serialized config, then resolved once at engine construction into the
//! durations and parsed specs the engine actually runs on.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wisp_text::OverlapSpec;

/// User-facing engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Delay between the last document change and an auto trigger.
	pub debounce_ms: u64,
	/// Whether auto-triggered responses go through deferred validation.
	pub deferred_validation: bool,
	/// Overlap spec string, `"[N][+M]"`. Malformed specs degrade to
	/// "no threshold" so the idle fallback decides instead.
	pub overlap_spec: String,
	/// Idle fallback for deferred validation, in milliseconds. `0` promotes
	/// immediately on arrival; a negative value disables the fallback.
	pub idle_ms: i64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 80,
			deferred_validation: true,
			overlap_spec: "1+1".to_string(),
			idle_ms: 350,
		}
	}
}

/// Idle-timer behavior while a validation is short of its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleFallback {
	/// Force-promote after this much further inactivity.
	After(Duration),
	/// Promote immediately on arrival.
	Immediate,
	/// No fallback: only the threshold or explicit dismissal resolves.
	Disabled,
}

/// [`EngineConfig`] with durations and specs in their runtime form.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
	pub debounce: Duration,
	pub deferred: bool,
	pub overlap: OverlapSpec,
	pub idle: IdleFallback,
}

impl EngineConfig {
	pub fn resolve(&self) -> ResolvedConfig {
		let overlap = OverlapSpec::parse(&self.overlap_spec);
		if overlap.is_degenerate() && !self.overlap_spec.trim().is_empty() {
			warn!(spec = %self.overlap_spec, "overlap spec did not parse, relying on idle fallback");
		}
		let idle = match self.idle_ms {
			0 => IdleFallback::Immediate,
			ms if ms < 0 => IdleFallback::Disabled,
			ms => IdleFallback::After(Duration::from_millis(ms as u64)),
		};
		ResolvedConfig {
			debounce: Duration::from_millis(self.debounce_ms),
			deferred: self.deferred_validation,
			overlap,
			idle,
		}
	}
}
