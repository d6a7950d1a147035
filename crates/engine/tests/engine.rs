#![allow(unused_crate_dependencies)]
//! End-to-end engine tests over a scripted host and provider.
//!
//! Time is paused: debounce, provider latency, and idle timers all run on
//! tokio's test clock, so every interleaving here is deterministic.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use wisp_engine::{
	AcceptScope, Collaborators, CompletionProvider, ContextExtractor, ContextGatherer,
	DocumentEdit, DocumentId, Engine, EngineConfig, GatherParams, Host, LifecycleEvent, ModelInfo,
	Position, PromptData, PromptFormat, ProviderError, RejectReason, RequestId, RequestOutcome,
	Surrounding, TriggerKind,
};

const DOC: DocumentId = DocumentId(7);

#[derive(Debug)]
struct Overlay {
	at: Position,
	text: String,
	selected: usize,
	total: usize,
}

#[derive(Debug)]
struct HostState {
	lines: Vec<String>,
	cursor: Position,
	editable: bool,
	overlay: Option<Overlay>,
}

/// Scripted in-memory editor. Clones share state so tests can inspect and
/// mutate the document the engine is driving.
#[derive(Clone)]
struct SharedHost(Rc<RefCell<HostState>>);

impl SharedHost {
	fn new(lines: &[&str], cursor: Position) -> Self {
		Self(Rc::new(RefCell::new(HostState {
			lines: lines.iter().map(|l| (*l).to_string()).collect(),
			cursor,
			editable: true,
			overlay: None,
		})))
	}

	/// Inserts text at the cursor and advances it, like typing.
	fn type_str(&self, text: &str) {
		let mut state = self.0.borrow_mut();
		let cursor = state.cursor;
		let line = &mut state.lines[cursor.line];
		let byte = line.char_indices().nth(cursor.column).map_or(line.len(), |(i, _)| i);
		line.insert_str(byte, text);
		state.cursor.column += text.chars().count();
	}

	fn set_cursor(&self, cursor: Position) {
		self.0.borrow_mut().cursor = cursor;
	}

	fn set_editable(&self, editable: bool) {
		self.0.borrow_mut().editable = editable;
	}

	fn overlay_text(&self) -> Option<String> {
		self.0.borrow().overlay.as_ref().map(|o| o.text.clone())
	}

	fn overlay_at(&self) -> Option<Position> {
		self.0.borrow().overlay.as_ref().map(|o| o.at)
	}

	fn overlay_cycle(&self) -> Option<(usize, usize)> {
		self.0.borrow().overlay.as_ref().map(|o| (o.selected, o.total))
	}

	fn lines(&self) -> Vec<String> {
		self.0.borrow().lines.clone()
	}

	fn cursor_pos(&self) -> Position {
		self.0.borrow().cursor
	}
}

impl Host for SharedHost {
	fn active_document(&self) -> Option<DocumentId> {
		Some(DOC)
	}

	fn is_editable(&self, _document: DocumentId) -> bool {
		self.0.borrow().editable
	}

	fn cursor(&self) -> Position {
		self.0.borrow().cursor
	}

	fn line_text(&self, _document: DocumentId, line: usize) -> Option<String> {
		self.0.borrow().lines.get(line).cloned()
	}

	fn filetype(&self, _document: DocumentId) -> Option<String> {
		Some("lua".to_string())
	}

	fn apply_edit(&mut self, _document: DocumentId, edit: DocumentEdit) {
		let mut state = self.0.borrow_mut();
		let end = (edit.line + edit.removed).min(state.lines.len());
		let tail = state.lines.split_off(end);
		state.lines.truncate(edit.line);
		state.lines.extend(edit.inserted);
		state.lines.extend(tail);
		state.cursor = edit.caret;
	}

	fn show_overlay(&mut self, _document: DocumentId, at: Position, text: &str, selected: usize, total: usize) {
		self.0.borrow_mut().overlay = Some(Overlay {
			at,
			text: text.to_string(),
			selected,
			total,
		});
	}

	fn clear_overlay(&mut self) {
		self.0.borrow_mut().overlay = None;
	}
}

/// Provider that pops scripted responses in call order, after an optional
/// simulated latency, and records every prompt it was given.
struct ScriptedProvider {
	delay: Duration,
	responses: Mutex<VecDeque<Result<Vec<String>, ProviderError>>>,
	prompts: Mutex<Vec<PromptData>>,
}

impl ScriptedProvider {
	fn new(delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			delay,
			responses: Mutex::new(VecDeque::new()),
			prompts: Mutex::new(Vec::new()),
		})
	}

	fn push(&self, response: Result<Vec<&str>, ProviderError>) {
		let response = response.map(|candidates| candidates.into_iter().map(str::to_string).collect());
		self.responses.lock().unwrap().push_back(response);
	}

	fn calls(&self) -> usize {
		self.prompts.lock().unwrap().len()
	}

	fn last_prompt(&self) -> Option<PromptData> {
		self.prompts.lock().unwrap().last().cloned()
	}
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
	async fn resolve_model(&self) -> Result<ModelInfo, ProviderError> {
		Ok(ModelInfo {
			provider: "scripted".to_string(),
			name: "test".to_string(),
		})
	}

	async fn complete(
		&self,
		prompt: PromptData,
		_model: &ModelInfo,
		_cancel: CancellationToken,
	) -> Result<Vec<String>, ProviderError> {
		// Responses are consumed in call order, before the delay.
		let response = {
			self.prompts.lock().unwrap().push(prompt);
			self.responses.lock().unwrap().pop_front()
		};
		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}
		response.unwrap_or(Ok(Vec::new()))
	}
}

#[derive(Default)]
struct FixedExtractor {
	before: String,
	after: String,
}

#[async_trait]
impl ContextExtractor for FixedExtractor {
	async fn extract(&self, _document: DocumentId, _at: Position) -> Result<Surrounding, ProviderError> {
		Ok(Surrounding {
			before: self.before.clone(),
			after: self.after.clone(),
		})
	}
}

struct StaticGatherer(&'static str);

#[async_trait]
impl ContextGatherer for StaticGatherer {
	fn is_enabled(&self) -> bool {
		true
	}

	async fn gather(&self, _params: GatherParams) -> Option<String> {
		Some(self.0.to_string())
	}
}

struct Fixture {
	engine: Engine<SharedHost>,
	host: SharedHost,
	provider: Arc<ScriptedProvider>,
	events: UnboundedReceiver<LifecycleEvent>,
}

fn build(
	config: EngineConfig,
	lines: &[&str],
	cursor: Position,
	provider: Arc<ScriptedProvider>,
	extractor: FixedExtractor,
	gatherer: Option<Arc<dyn ContextGatherer>>,
) -> Fixture {
	let host = SharedHost::new(lines, cursor);
	let collaborators = Collaborators {
		extractor: Arc::new(extractor),
		provider: Arc::clone(&provider) as Arc<dyn CompletionProvider>,
		gatherer,
		format: PromptFormat::default(),
	};
	let mut engine = Engine::new(host.clone(), config, collaborators);
	let events = engine.subscribe();
	Fixture {
		engine,
		host,
		provider,
		events,
	}
}

fn fixture(config: EngineConfig, lines: &[&str], cursor: Position, delay_ms: u64) -> Fixture {
	build(
		config,
		lines,
		cursor,
		ScriptedProvider::new(Duration::from_millis(delay_ms)),
		FixedExtractor::default(),
		None,
	)
}

fn config(deferred: bool, idle_ms: i64) -> EngineConfig {
	EngineConfig {
		debounce_ms: 80,
		deferred_validation: deferred,
		overlap_spec: "1+1".to_string(),
		idle_ms,
	}
}

/// Awaits the next timer/response message and applies it.
async fn pump_one(engine: &mut Engine<SharedHost>) {
	let msg = engine.recv().await.expect("engine channel closed");
	engine.handle(msg);
}

fn drain(events: &mut UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
	let mut out = Vec::new();
	while let Ok(event) = events.try_recv() {
		out.push(event);
	}
	out
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn auto_trigger_shows_candidate_when_deferred_disabled() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.document_changed();
	pump_one(&mut fx.engine).await; // debounce fires, triggers
	pump_one(&mut fx.engine).await; // response installs
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some("bar()"));
	assert_eq!(fx.host.overlay_at(), Some(Position::new(0, 6)));
	let events = drain(&mut fx.events);
	assert!(matches!(
		events[0],
		LifecycleEvent::RequestStarted {
			kind: TriggerKind::Auto,
			..
		}
	));
	assert!(events.contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Shown,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stale_response_is_never_applied() {
	let mut fx = fixture(config(false, 350), &["x = "], Position::new(0, 4), 50);
	fx.provider.push(Ok(vec!["first"]));
	fx.provider.push(Ok(vec!["second"]));
	fx.engine.trigger(TriggerKind::Manual);
	let stale = fx.engine.recv().await.expect("engine channel closed");
	fx.engine.trigger(TriggerKind::Manual);
	assert_eq!(fx.engine.generation(), 2);
	fx.engine.handle(stale);
	assert!(!fx.engine.is_visible());
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.host.overlay_text().as_deref(), Some("second"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn generations_strictly_increase() {
	let mut fx = fixture(config(false, 350), &["x = "], Position::new(0, 4), 0);
	for _ in 0..3 {
		fx.provider.push(Ok(vec!["y"]));
		fx.engine.trigger(TriggerKind::Manual);
		pump_one(&mut fx.engine).await;
	}
	let generations: Vec<u64> = drain(&mut fx.events)
		.into_iter()
		.filter_map(|event| match event {
			LifecycleEvent::RequestStarted { generation, .. } => Some(generation),
			_ => None,
		})
		.collect();
	assert_eq!(generations, vec![1, 2, 3]);
	// Dismissing live state opens a new epoch too.
	assert_eq!(fx.engine.generation(), 3);
	fx.engine.dismiss();
	assert_eq!(fx.engine.generation(), 4);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn manual_response_requires_exact_cursor_match() {
	let mut fx = fixture(config(true, 350), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	fx.host.type_str("b");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	pump_one(&mut fx.engine).await;
	assert!(!fx.engine.is_visible());
	let events = drain(&mut fx.events);
	assert!(events.contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Discarded,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn typed_ahead_response_promotes_after_idle() {
	let mut fx = fixture(config(true, 150), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.document_changed();
	pump_one(&mut fx.engine).await; // debounce, auto trigger
	fx.host.type_str("b");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	pump_one(&mut fx.engine).await; // response arrives under the threshold
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Deferred,
	}));
	pump_one(&mut fx.engine).await; // keystroke debounce elapses under the validation
	assert_eq!(fx.provider.calls(), 1);
	assert!(!fx.engine.is_visible());
	pump_one(&mut fx.engine).await; // idle fallback promotes what was typed
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some("ar()"));
	assert_eq!(fx.host.overlay_at(), Some(Position::new(0, 7)));
	let events = drain(&mut fx.events);
	assert!(!events.iter().any(|e| matches!(e, LifecycleEvent::Rejected { .. })));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn typed_ahead_response_promotes_at_threshold() {
	// Idle fallback disabled: only the threshold can resolve the validation.
	let mut fx = fixture(config(true, -1), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar() + 1"]));
	fx.engine.document_changed();
	pump_one(&mut fx.engine).await;
	fx.host.type_str("bar(");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	pump_one(&mut fx.engine).await;
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some(") + 1"));
	assert_eq!(fx.host.overlay_at(), Some(Position::new(0, 10)));
	// The keystroke debounce is ignored behind the promoted display.
	pump_one(&mut fx.engine).await;
	assert!(fx.engine.is_visible());
	assert_eq!(fx.provider.calls(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn typed_ahead_mismatch_rejects_and_the_debounce_retriggers() {
	let mut fx = fixture(config(true, 150), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.document_changed();
	pump_one(&mut fx.engine).await;
	fx.host.type_str("x");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	pump_one(&mut fx.engine).await; // response contradicts the typed text
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Rejected {
		reason: RejectReason::Mismatch {
			typed: "x".to_string(),
		},
	}));
	// The keystroke's debounce timer is still armed and fires a fresh
	// request for the new context.
	pump_one(&mut fx.engine).await;
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.provider.calls(), 2);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn idle_zero_promotes_immediately_on_arrival() {
	let mut fx = fixture(config(true, 0), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.document_changed();
	pump_one(&mut fx.engine).await;
	pump_one(&mut fx.engine).await;
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some("bar()"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn auto_response_off_the_trigger_line_is_discarded() {
	let mut fx = fixture(config(true, 350), &["foo = ", ""], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Auto);
	fx.host.set_cursor(Position::new(1, 0));
	pump_one(&mut fx.engine).await;
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Discarded,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn leaving_editable_mode_drops_the_response() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 50);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	fx.host.set_editable(false);
	pump_one(&mut fx.engine).await;
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Discarded,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_and_failed_responses_clear_quietly() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec![]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert!(!fx.engine.is_visible());
	fx.provider.push(Err(ProviderError::Completion("boom".to_string())));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert!(!fx.engine.is_visible());
	let events = drain(&mut fx.events);
	assert!(events.contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(1),
		generation: 1,
		outcome: RequestOutcome::Empty,
	}));
	assert!(events.contains(&LifecycleEvent::RequestComplete {
		request_id: RequestId(2),
		generation: 2,
		outcome: RequestOutcome::Failed,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn raw_candidates_are_postprocessed_before_display() {
	let provider = ScriptedProvider::new(Duration::ZERO);
	provider.push(Ok(vec!["```lua\nprint(x)\nreturn x\n```"]));
	let extractor = FixedExtractor {
		before: String::new(),
		after: "return x\n".to_string(),
	};
	let mut fx = build(config(false, 350), &[""], Position::new(0, 0), provider, extractor, None);
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.host.overlay_text().as_deref(), Some("print(x)"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn gathered_context_reaches_the_prompt() {
	let provider = ScriptedProvider::new(Duration::ZERO);
	provider.push(Ok(vec!["bar()"]));
	let extractor = FixedExtractor {
		before: "local a\n".to_string(),
		after: String::new(),
	};
	let gatherer: Arc<dyn ContextGatherer> = Arc::new(StaticGatherer("-- nearby: fn helper()"));
	let mut fx = build(
		config(false, 350),
		&["foo = "],
		Position::new(0, 6),
		provider,
		extractor,
		Some(gatherer),
	);
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	let prompt = fx.provider.last_prompt().expect("provider was called");
	assert_eq!(prompt.prefix, "-- nearby: fn helper()\nlocal a\n");
	assert_eq!(prompt.language.as_deref(), Some("lua"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cycling_rotates_and_rerenders() {
	let mut fx = fixture(config(false, 350), &["x"], Position::new(0, 1), 0);
	fx.provider.push(Ok(vec!["alpha", "beta", "gamma"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.host.overlay_text().as_deref(), Some("alpha"));
	assert_eq!(fx.host.overlay_cycle(), Some((0, 3)));
	fx.engine.next();
	assert_eq!(fx.host.overlay_text().as_deref(), Some("beta"));
	assert_eq!(fx.host.overlay_cycle(), Some((1, 3)));
	fx.engine.next();
	fx.engine.next();
	assert_eq!(fx.host.overlay_text().as_deref(), Some("alpha"));
	fx.engine.prev();
	assert_eq!(fx.host.overlay_text().as_deref(), Some("gamma"));
	assert_eq!(fx.host.overlay_cycle(), Some((2, 3)));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accept_commits_a_multiline_candidate_atomically() {
	let mut fx = fixture(config(false, 350), &["let v = ;"], Position::new(0, 8), 0);
	fx.provider.push(Ok(vec!["vec![\n\t1,\n]"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert!(fx.engine.is_visible());
	fx.engine.accept();
	assert_eq!(fx.host.lines(), vec!["let v = vec![", "\t1,", "];"]);
	assert_eq!(fx.host.cursor_pos(), Position::new(2, 1));
	assert_eq!(fx.host.overlay_text(), None);
	assert!(!fx.engine.is_visible());
	// The engine's own cursor move is not treated as user input.
	fx.engine.cursor_moved();
	let events = drain(&mut fx.events);
	assert!(events.contains(&LifecycleEvent::Accepted {
		scope: AcceptScope::Full,
	}));
	assert!(!events.iter().any(|e| matches!(e, LifecycleEvent::Rejected { .. })));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accept_lines_keeps_the_remainder_visible() {
	let mut fx = fixture(config(false, 350), &[""], Position::new(0, 0), 0);
	fx.provider.push(Ok(vec!["if a {\n\tb()\n\tc()\n}"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.engine.accept_lines(2);
	assert_eq!(fx.host.lines(), vec!["if a {", "\tb()", "\t"]);
	assert_eq!(fx.host.cursor_pos(), Position::new(2, 1));
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some("c()\n}"));
	assert_eq!(fx.host.overlay_at(), Some(Position::new(2, 1)));
	fx.engine.cursor_moved(); // host reports the self-inflicted move
	assert!(fx.engine.is_visible());
	fx.engine.accept();
	assert_eq!(fx.host.lines(), vec!["if a {", "\tb()", "\tc()", "}"]);
	let events = drain(&mut fx.events);
	assert!(events.contains(&LifecycleEvent::Accepted {
		scope: AcceptScope::Lines(2),
	}));
	assert!(events.contains(&LifecycleEvent::Accepted {
		scope: AcceptScope::Full,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accept_lines_past_the_end_accepts_fully() {
	let mut fx = fixture(config(false, 350), &[""], Position::new(0, 0), 0);
	fx.provider.push(Ok(vec!["a()\nb()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.engine.accept_lines(5);
	assert_eq!(fx.host.lines(), vec!["a()", "b()"]);
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Accepted {
		scope: AcceptScope::Full,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn accept_paragraph_commits_through_the_blank_line() {
	let mut fx = fixture(config(false, 350), &[""], Position::new(0, 0), 0);
	fx.provider.push(Ok(vec!["a()\nb()\n\nrest"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.engine.accept_paragraph();
	assert_eq!(fx.host.lines(), vec!["a()", "b()", "", ""]);
	assert_eq!(fx.host.cursor_pos(), Position::new(3, 0));
	assert_eq!(fx.host.overlay_text().as_deref(), Some("rest"));
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Accepted {
		scope: AcceptScope::Lines(3),
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn regenerate_excludes_the_rejected_candidate() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.provider.push(Ok(vec!["baz()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.engine.regenerate();
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.host.overlay_text().as_deref(), Some("baz()"));
	let prompt = fx.provider.last_prompt().expect("provider was called");
	assert_eq!(prompt.rejected, vec!["bar()".to_string()]);
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Rejected {
		reason: RejectReason::Explicit,
	}));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dismiss_is_idempotent() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	assert!(fx.engine.is_visible());
	fx.engine.dismiss();
	assert!(!fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text(), None);
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Rejected {
		reason: RejectReason::Explicit,
	}));
	fx.engine.dismiss();
	assert!(!fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text(), None);
	assert_eq!(drain(&mut fx.events), vec![]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn displayed_candidate_trims_in_place_on_matching_input() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.host.type_str("b");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	assert!(fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text().as_deref(), Some("ar()"));
	assert_eq!(fx.host.overlay_at(), Some(Position::new(0, 7)));
	// No new round trip for a matching prefix.
	assert_eq!(fx.provider.calls(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn displayed_candidate_mismatch_dismisses_and_retriggers() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.host.type_str("x");
	fx.engine.document_changed();
	fx.engine.cursor_moved();
	assert!(!fx.engine.is_visible());
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Rejected {
		reason: RejectReason::Mismatch {
			typed: "x".to_string(),
		},
	}));
	fx.provider.push(Ok(vec!["y"]));
	pump_one(&mut fx.engine).await; // fresh debounced trigger
	pump_one(&mut fx.engine).await;
	assert_eq!(fx.provider.calls(), 2);
	assert_eq!(fx.host.overlay_text().as_deref(), Some("y"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cursor_retreat_dismisses_the_display() {
	let mut fx = fixture(config(false, 350), &["foo = "], Position::new(0, 6), 0);
	fx.provider.push(Ok(vec!["bar()"]));
	fx.engine.trigger(TriggerKind::Manual);
	pump_one(&mut fx.engine).await;
	fx.host.set_cursor(Position::new(0, 5));
	fx.engine.cursor_moved();
	assert!(!fx.engine.is_visible());
	assert_eq!(fx.host.overlay_text(), None);
	assert!(drain(&mut fx.events).contains(&LifecycleEvent::Rejected {
		reason: RejectReason::CursorMoved,
	}));
}
