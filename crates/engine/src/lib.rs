#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Asynchronous inline-suggestion engine.
//!
//! The engine sits between an editor host and a slow, cancellable completion
//! provider. It debounces trigger events, fires speculative requests, decides
//! whether a response that arrives mid-typing can still be shown (deferred
//! validation), and manages the lifecycle of the displayed candidate set:
//! cycling, full and partial acceptance, regeneration, dismissal.
//!
//! Correctness rests on a single mechanism: every asynchronous continuation
//! (debounce timer, provider round trip, idle timer) carries the identity it
//! was started under and is dropped on receipt if that identity is no longer
//! current. There is no locking; the engine is owned by the host's event loop
//! and all async work reports back through a message channel drained by
//! [`Engine::handle`].

pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod provider;
pub mod request;
pub mod store;
pub mod validator;

pub use config::{EngineConfig, IdleFallback, ResolvedConfig};
pub use engine::{Collaborators, Engine};
pub use error::ProviderError;
pub use events::{AcceptScope, EngineMsg, LifecycleEvent, RejectReason, RequestOutcome};
pub use host::{DocumentEdit, DocumentId, Host, Position};
pub use provider::{
	CompletionProvider, ContextExtractor, ContextGatherer, GatherParams, ModelInfo, PromptData,
	PromptFn, PromptFormat, PromptOptions, Surrounding,
};
pub use request::{PendingRequest, RequestId, TriggerKind};
pub use store::{Candidate, CandidateStore, TrimOutcome};
pub use validator::{PendingValidation, ValidationOutcome};
