//! The engine proper: trigger controller, deferred-validation driver, and
//! the cycling/acceptance API.
//!
//! # Design
//!
//! The engine is single-owner state driven by a cooperative loop. Debounce
//! timers, provider round trips, and idle timers run as spawned tasks that
//! report back through an internal [`EngineMsg`] channel; the host loop
//! awaits [`Engine::recv`] and feeds each message to [`Engine::handle`].
//! Nothing here blocks and nothing is shared across threads.
//!
//! # Staleness
//!
//! Every continuation carries the identity it was started under: responses
//! carry the generation captured at trigger time, timers carry a sequence
//! number. A mismatch on receipt means the world moved on and the message is
//! dropped without side effects. Cancelling the provider call is best-effort
//! only; the generation check is what actually makes late responses
//! harmless.
//!
//! # Dispatch asymmetry
//!
//! A manual response installs only when the cursor still matches the trigger
//! position exactly. An auto response with deferred validation enabled is
//! handed to the validator whenever the cursor is still on the trigger line,
//! even if the column advanced. The two paths are deliberately not unified;
//! see [`validator`](crate::validator) for the second half.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use wisp_text::postprocess;

use crate::config::{EngineConfig, IdleFallback, ResolvedConfig};
use crate::edit::{splice_full, splice_partial};
use crate::error::ProviderError;
use crate::events::{AcceptScope, EngineMsg, LifecycleEvent, RejectReason, RequestOutcome};
use crate::host::{DocumentId, Host, Position};
use crate::provider::{
	CompletionProvider, ContextExtractor, ContextGatherer, GatherParams, PromptFn, PromptFormat,
	PromptOptions,
};
use crate::request::{PendingRequest, RequestId, TriggerKind};
use crate::store::{Candidate, CandidateStore, TrimOutcome};
use crate::validator::{self, PendingValidation, ValidationOutcome};

/// The external collaborators a new engine is wired to.
pub struct Collaborators {
	pub extractor: Arc<dyn ContextExtractor>,
	pub provider: Arc<dyn CompletionProvider>,
	pub gatherer: Option<Arc<dyn ContextGatherer>>,
	pub format: PromptFormat,
}

/// Inline-suggestion engine for a single active document context.
pub struct Engine<H: Host> {
	host: H,
	config: ResolvedConfig,
	extractor: Arc<dyn ContextExtractor>,
	provider: Arc<dyn CompletionProvider>,
	gatherer: Option<Arc<dyn ContextGatherer>>,
	format: Arc<PromptFn>,
	generation: u64,
	request_counter: u64,
	in_flight: Option<PendingRequest>,
	store: CandidateStore,
	validation: Option<PendingValidation>,
	/// Candidate texts rejected since the last successful display, consumed
	/// by the next request.
	rejected: Vec<String>,
	debounce_seq: u64,
	idle_seq: u64,
	/// Set around self-inflicted edits so the resulting cursor event is not
	/// mistaken for user input.
	ignore_next_move: bool,
	msg_tx: mpsc::UnboundedSender<EngineMsg>,
	msg_rx: mpsc::UnboundedReceiver<EngineMsg>,
	events: Option<mpsc::UnboundedSender<LifecycleEvent>>,
}

impl<H: Host> Engine<H> {
	pub fn new(host: H, config: EngineConfig, collaborators: Collaborators) -> Self {
		let (msg_tx, msg_rx) = mpsc::unbounded_channel();
		Self {
			host,
			config: config.resolve(),
			extractor: collaborators.extractor,
			provider: collaborators.provider,
			gatherer: collaborators.gatherer,
			format: collaborators.format.resolve(),
			generation: 0,
			request_counter: 0,
			in_flight: None,
			store: CandidateStore::default(),
			validation: None,
			rejected: Vec::new(),
			debounce_seq: 0,
			idle_seq: 0,
			ignore_next_move: false,
			msg_tx,
			msg_rx,
			events: None,
		}
	}

	/// Opens the lifecycle event stream, replacing any earlier subscriber.
	pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.events = Some(tx);
		rx
	}

	/// Awaits the next internal message. The engine holds its own sender, so
	/// this only resolves when a timer or request task reports in.
	pub async fn recv(&mut self) -> Option<EngineMsg> {
		self.msg_rx.recv().await
	}

	/// Non-blocking variant of [`recv`](Self::recv) for hosts that poll.
	pub fn try_recv(&mut self) -> Option<EngineMsg> {
		self.msg_rx.try_recv().ok()
	}

	/// Applies one internal message, dropping it if stale.
	pub fn handle(&mut self, msg: EngineMsg) {
		match msg {
			EngineMsg::DebounceElapsed { seq } => self.on_debounce(seq),
			EngineMsg::Response {
				generation,
				request_id,
				result,
			} => self.on_response(generation, request_id, result),
			EngineMsg::IdleElapsed { seq } => self.on_idle(seq),
		}
	}

	pub fn is_visible(&self) -> bool {
		self.store.is_visible()
	}

	/// Current request epoch, strictly increasing.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	/// Cancels everything in flight and fires a fresh request.
	///
	/// The caller has already checked mode and filetype gating; this always
	/// clears current state even when no new request can be started.
	pub fn trigger(&mut self, kind: TriggerKind) {
		self.cancel_debounce();
		self.cancel_in_flight();
		self.validation = None;
		self.store.clear();
		self.host.clear_overlay();
		self.generation = self.generation.wrapping_add(1);

		let Some(document) = self.host.active_document() else {
			return;
		};
		if !self.host.is_editable(document) {
			return;
		}
		let position = self.host.cursor();
		let line = self.host.line_text(document, position.line).unwrap_or_default();
		let filetype = self.host.filetype(document);
		let rejected = std::mem::take(&mut self.rejected);

		self.request_counter += 1;
		let id = RequestId(self.request_counter);
		let cancel = CancellationToken::new();
		let generation = self.generation;
		debug!(generation, %id, ?kind, line = position.line, column = position.column, "completion trigger");

		let task = RequestTask {
			extractor: Arc::clone(&self.extractor),
			provider: Arc::clone(&self.provider),
			gatherer: self.gatherer.clone(),
			format: Arc::clone(&self.format),
			document,
			position,
			filetype: filetype.clone(),
			rejected: rejected.clone(),
			cancel: cancel.clone(),
		};
		self.in_flight = Some(PendingRequest {
			generation,
			id,
			kind,
			document,
			position,
			line,
			filetype,
			rejected,
			started: Instant::now(),
			cancel: cancel.clone(),
		});
		self.emit(LifecycleEvent::RequestStarted {
			request_id: id,
			generation,
			kind,
		});

		let tx = self.msg_tx.clone();
		tokio::spawn(async move {
			let result = task.run().await;
			if cancel.is_cancelled() {
				return;
			}
			let _ = tx.send(EngineMsg::Response {
				generation,
				request_id: id,
				result,
			});
		});
	}

	/// A document change in insert mode: feeds a live validation, otherwise
	/// restarts the debounce timer. While a candidate is displayed the
	/// companion cursor event decides between trimming and dismissal, so the
	/// timer stays quiet.
	pub fn document_changed(&mut self) {
		if self.validation.is_some() {
			self.revalidate(false);
			return;
		}
		if self.store.is_visible() {
			return;
		}
		self.start_debounce();
	}

	/// A cursor move in insert mode.
	pub fn cursor_moved(&mut self) {
		if self.ignore_next_move {
			self.ignore_next_move = false;
			return;
		}
		if self.validation.is_some() {
			self.revalidate(false);
			return;
		}
		if self.store.is_visible() {
			self.retrim();
		}
	}

	/// Cancels any pending request, timer, and validation, clears the
	/// candidate store and the rejected-candidates queue. Idempotent.
	pub fn dismiss(&mut self) {
		let user_facing = self.validation.is_some() || self.store.is_visible();
		let had_pending = user_facing || self.in_flight.is_some();
		self.cancel_debounce();
		self.cancel_in_flight();
		self.validation = None;
		self.rejected.clear();
		self.clear_display();
		if had_pending {
			// Explicit invalidation opens a new epoch so a late response can
			// never match a dismissed one.
			self.generation = self.generation.wrapping_add(1);
			trace!(generation = self.generation, "dismissed");
		}
		if user_facing {
			self.emit(LifecycleEvent::Rejected {
				reason: RejectReason::Explicit,
			});
		}
	}

	/// Selects the next candidate.
	pub fn next(&mut self) {
		if self.store.next() {
			self.render();
		}
	}

	/// Selects the previous candidate.
	pub fn prev(&mut self) {
		if self.store.prev() {
			self.render();
		}
	}

	/// Commits the whole selected candidate as one atomic edit.
	pub fn accept(&mut self) {
		let Some(candidate) = self.store.selected().cloned() else {
			return;
		};
		if candidate.text.is_empty() {
			return;
		}
		let Some(document) = self.store.document() else {
			return;
		};
		let anchor = self.store.anchor();
		let line = self.host.line_text(document, anchor.line).unwrap_or_default();
		let edit = splice_full(&line, anchor, &candidate.text);
		self.validation = None;
		self.ignore_next_move = true;
		self.host.apply_edit(document, edit);
		self.host.clear_overlay();
		self.store.clear();
		debug!("accepted candidate");
		self.emit(LifecycleEvent::Accepted {
			scope: AcceptScope::Full,
		});
	}

	/// Commits the first `lines` lines of the selected candidate; the rest
	/// stays displayed as the sole candidate at the new cursor.
	pub fn accept_lines(&mut self, lines: usize) {
		if lines == 0 {
			return;
		}
		let Some(candidate) = self.store.selected().cloned() else {
			return;
		};
		let total = candidate.text.split('\n').count();
		if lines >= total {
			self.accept();
			return;
		}
		let Some(document) = self.store.document() else {
			return;
		};
		let anchor = self.store.anchor();
		let line = self.host.line_text(document, anchor.line).unwrap_or_default();
		let splice = splice_partial(&line, anchor, &candidate.text, lines);
		let caret = splice.edit.caret;
		self.validation = None;
		self.ignore_next_move = true;
		self.host.apply_edit(document, splice.edit);
		if splice.remaining.is_empty() {
			self.clear_display();
		} else {
			let anchor_line = self.host.line_text(document, caret.line).unwrap_or_default();
			self.store.set_sole(
				Candidate {
					text: splice.remaining,
					source: candidate.source,
				},
				caret,
				anchor_line,
			);
			self.render();
		}
		debug!(lines, "accepted candidate lines");
		self.emit(LifecycleEvent::Accepted {
			scope: AcceptScope::Lines(lines),
		});
	}

	/// Commits up to and including the candidate's first blank line, or
	/// everything when it has none.
	pub fn accept_paragraph(&mut self) {
		let Some(candidate) = self.store.selected() else {
			return;
		};
		let blank = candidate.text.split('\n').position(|l| l.trim().is_empty());
		match blank {
			Some(index) => self.accept_lines(index + 1),
			None => self.accept(),
		}
	}

	/// Rejects the selected candidate and re-requests, asking the provider
	/// not to propose it again for this context.
	pub fn regenerate(&mut self) {
		let Some(candidate) = self.store.selected() else {
			return;
		};
		self.rejected.push(candidate.source.clone());
		self.emit(LifecycleEvent::Rejected {
			reason: RejectReason::Explicit,
		});
		self.trigger(TriggerKind::Manual);
	}

	fn on_debounce(&mut self, seq: u64) {
		if seq != self.debounce_seq {
			trace!(seq, "stale debounce timer");
			return;
		}
		if self.validation.is_some() {
			// The keystrokes that armed this timer are being validated.
			trace!(seq, "debounce elapsed under a pending validation");
			return;
		}
		if self.store.is_visible() {
			// Armed before the display appeared; the cursor handler decides
			// between trimming and dismissal now.
			trace!(seq, "debounce elapsed behind a visible candidate");
			return;
		}
		self.trigger(TriggerKind::Auto);
	}

	fn on_idle(&mut self, seq: u64) {
		if self.validation.as_ref().is_none_or(|v| v.idle_seq != seq) {
			trace!(seq, "stale idle timer");
			return;
		}
		debug!(seq, "idle fallback elapsed, force promoting");
		self.revalidate(true);
	}

	fn on_response(&mut self, generation: u64, request_id: RequestId, result: Result<Vec<String>, ProviderError>) {
		if generation != self.generation {
			trace!(generation, current = self.generation, %request_id, "dropping stale response");
			return;
		}
		let Some(request) = self.in_flight.take_if(|r| r.id == request_id) else {
			trace!(%request_id, "response without a matching in-flight request");
			return;
		};
		let elapsed_ms = request.started.elapsed().as_millis() as u64;
		let candidates = match result {
			Ok(candidates) => candidates,
			Err(ProviderError::Cancelled) => {
				trace!(%request_id, "completion cancelled in flight");
				return;
			}
			Err(err) => {
				warn!(%request_id, elapsed_ms, %err, "completion failed");
				self.complete_event(&request, RequestOutcome::Failed);
				return;
			}
		};
		debug!(%request_id, elapsed_ms, count = candidates.len(), "completion response");
		if candidates.is_empty() {
			self.complete_event(&request, RequestOutcome::Empty);
			return;
		}
		if self.host.active_document() != Some(request.document) || !self.host.is_editable(request.document) {
			self.complete_event(&request, RequestOutcome::Discarded);
			return;
		}
		let cursor = self.host.cursor();
		let candidates: Vec<Candidate> = candidates.into_iter().map(Candidate::new).collect();
		if request.kind == TriggerKind::Auto && self.config.deferred && cursor.line == request.position.line {
			self.complete_event(&request, RequestOutcome::Deferred);
			// Fresh idle identity so an older timer cannot fire into this
			// validation.
			self.idle_seq = self.idle_seq.wrapping_add(1);
			self.validation = Some(PendingValidation {
				candidates,
				document: request.document,
				position: request.position,
				line: request.line.clone(),
				request_id: request.id,
				generation: request.generation,
				idle_seq: self.idle_seq,
			});
			self.revalidate(false);
		} else if cursor == request.position {
			self.complete_event(&request, RequestOutcome::Shown);
			self.install(request.document, cursor, candidates);
		} else {
			debug!(%request_id, "cursor moved since trigger, discarding");
			self.complete_event(&request, RequestOutcome::Discarded);
		}
	}

	/// Re-runs validation against live cursor state and applies the outcome.
	fn revalidate(&mut self, force: bool) {
		let Some(pending) = &self.validation else {
			return;
		};
		let document = pending.document;
		let alive = self.host.active_document() == Some(document) && self.host.is_editable(document);
		let cursor = self.host.cursor();
		let line = self.host.line_text(document, cursor.line).unwrap_or_default();
		let outcome = if alive {
			validator::validate(pending, cursor, &line, &self.config.overlap, force)
		} else {
			ValidationOutcome::Reject(RejectReason::CursorMoved)
		};
		match outcome {
			ValidationOutcome::Promote { candidates, at } => {
				self.validation = None;
				debug!(line = at.line, column = at.column, count = candidates.len(), "promoting validated candidates");
				self.install(document, at, candidates);
			}
			ValidationOutcome::Wait => self.arm_idle(),
			ValidationOutcome::Reject(reason) => {
				self.validation = None;
				let reason = if force { RejectReason::IdleTimeout } else { reason };
				debug!(?reason, "deferred validation rejected");
				self.emit(LifecycleEvent::Rejected { reason });
			}
			ValidationOutcome::Discard => {
				self.validation = None;
				trace!("validated candidates fully typed, discarding");
				if force {
					self.emit(LifecycleEvent::Rejected {
						reason: RejectReason::IdleTimeout,
					});
				}
			}
		}
	}

	/// Trims the displayed set against text typed since the anchor, or
	/// dismisses on any incompatible cursor state.
	fn retrim(&mut self) {
		let Some(document) = self.store.document() else {
			return;
		};
		let anchor = self.store.anchor();
		let cursor = self.host.cursor();
		let line = self.host.line_text(document, cursor.line).unwrap_or_default();
		let compatible = self.host.active_document() == Some(document)
			&& self.host.is_editable(document)
			&& cursor.line == anchor.line
			&& cursor.column >= anchor.column
			&& validator::line_prefix_matches(&line, self.store.anchor_line(), anchor.column);
		if !compatible {
			self.clear_display();
			self.emit(LifecycleEvent::Rejected {
				reason: RejectReason::CursorMoved,
			});
			return;
		}
		if cursor.column == anchor.column {
			return;
		}
		let typed = validator::typed_between(&line, anchor.column, cursor.column);
		match self.store.trim(&typed, cursor, line) {
			TrimOutcome::Trimmed => self.render(),
			TrimOutcome::Emptied => {
				// The user typed the suggestion out in full.
				self.host.clear_overlay();
			}
			TrimOutcome::Mismatch => {
				debug!(typed = %typed, "typed text matches no candidate, dismissing");
				self.clear_display();
				self.emit(LifecycleEvent::Rejected {
					reason: RejectReason::Mismatch { typed },
				});
				self.start_debounce();
			}
		}
	}

	fn arm_idle(&mut self) {
		match self.config.idle {
			IdleFallback::Disabled => {}
			IdleFallback::Immediate => self.revalidate(true),
			IdleFallback::After(delay) => {
				self.idle_seq = self.idle_seq.wrapping_add(1);
				let seq = self.idle_seq;
				if let Some(pending) = &mut self.validation {
					pending.idle_seq = seq;
				}
				let tx = self.msg_tx.clone();
				tokio::spawn(async move {
					sleep(delay).await;
					let _ = tx.send(EngineMsg::IdleElapsed { seq });
				});
			}
		}
	}

	fn start_debounce(&mut self) {
		self.debounce_seq = self.debounce_seq.wrapping_add(1);
		let seq = self.debounce_seq;
		let delay = self.config.debounce;
		let tx = self.msg_tx.clone();
		tokio::spawn(async move {
			if !delay.is_zero() {
				sleep(delay).await;
			}
			let _ = tx.send(EngineMsg::DebounceElapsed { seq });
		});
	}

	fn cancel_debounce(&mut self) {
		self.debounce_seq = self.debounce_seq.wrapping_add(1);
	}

	fn cancel_in_flight(&mut self) {
		if let Some(request) = self.in_flight.take() {
			request.cancel.cancel();
		}
	}

	fn install(&mut self, document: DocumentId, at: Position, candidates: Vec<Candidate>) {
		let anchor_line = self.host.line_text(document, at.line).unwrap_or_default();
		self.store.install(document, at, anchor_line, candidates);
		if self.store.is_visible() {
			self.render();
		} else {
			self.host.clear_overlay();
		}
	}

	fn render(&mut self) {
		let Some(document) = self.store.document() else {
			return;
		};
		let Some(candidate) = self.store.selected() else {
			return;
		};
		self.host.show_overlay(
			document,
			self.store.anchor(),
			&candidate.text,
			self.store.selected_index(),
			self.store.len(),
		);
	}

	fn clear_display(&mut self) {
		self.store.clear();
		self.host.clear_overlay();
	}

	fn complete_event(&self, request: &PendingRequest, outcome: RequestOutcome) {
		self.emit(LifecycleEvent::RequestComplete {
			request_id: request.id,
			generation: request.generation,
			outcome,
		});
	}

	fn emit(&self, event: LifecycleEvent) {
		if let Some(tx) = &self.events {
			let _ = tx.send(event);
		}
	}
}

/// Everything a spawned request needs, detached from the engine.
struct RequestTask {
	extractor: Arc<dyn ContextExtractor>,
	provider: Arc<dyn CompletionProvider>,
	gatherer: Option<Arc<dyn ContextGatherer>>,
	format: Arc<PromptFn>,
	document: DocumentId,
	position: Position,
	filetype: Option<String>,
	rejected: Vec<String>,
	cancel: CancellationToken,
}

impl RequestTask {
	/// Runs the pipeline: extract, resolve model, gather, format, complete,
	/// postprocess. The cancellation check after each await keeps a
	/// superseded request from doing further work; the generation check on
	/// receipt is what guarantees correctness.
	async fn run(self) -> Result<Vec<String>, ProviderError> {
		let surrounding = self.extractor.extract(self.document, self.position).await?;
		if self.cancel.is_cancelled() {
			return Err(ProviderError::Cancelled);
		}
		let model = self.provider.resolve_model().await?;
		if self.cancel.is_cancelled() {
			return Err(ProviderError::Cancelled);
		}
		let additional = match &self.gatherer {
			Some(gatherer) if gatherer.is_enabled() => {
				let extra = gatherer
					.gather(GatherParams {
						document: self.document,
						at: self.position,
						filetype: self.filetype.clone(),
					})
					.await;
				if self.cancel.is_cancelled() {
					return Err(ProviderError::Cancelled);
				}
				extra
			}
			_ => None,
		};
		let options = PromptOptions {
			filetype: self.filetype,
			rejected: self.rejected,
		};
		let prompt = (*self.format)(&surrounding, &options, additional.as_deref());
		let raw = self.provider.complete(prompt, &model, self.cancel.clone()).await?;
		Ok(raw
			.into_iter()
			.map(|candidate| postprocess(&candidate, &surrounding.before, &surrounding.after))
			.filter(|candidate| !candidate.is_empty())
			.collect())
	}
}
