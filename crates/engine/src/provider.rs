//! External collaborator interfaces: context extraction, the completion
//! provider, auxiliary context gathering, and prompt formatting.
//!
//! All slow work lives behind these traits. The engine holds them as `Arc`s
//! and calls them from spawned request tasks, so implementations must be
//! `Send + Sync`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::ProviderError;
use crate::host::{DocumentId, Position};

/// Text surrounding the trigger point, produced by the [`ContextExtractor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surrounding {
	/// Document text before the cursor.
	pub before: String,
	/// Document text after the cursor.
	pub after: String,
}

/// Resolved provider/model configuration for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
	pub provider: String,
	pub name: String,
}

/// Parameters handed to the auxiliary context gatherer.
#[derive(Debug, Clone)]
pub struct GatherParams {
	pub document: DocumentId,
	pub at: Position,
	pub filetype: Option<String>,
}

/// Per-request prompt inputs beyond the surrounding text.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
	pub filetype: Option<String>,
	/// Candidate texts the user explicitly rejected for this context.
	pub rejected: Vec<String>,
}

/// Formatted request payload consumed by the [`CompletionProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptData {
	pub prefix: String,
	pub suffix: String,
	pub language: Option<String>,
	/// Completions the provider should not propose again.
	pub rejected: Vec<String>,
}

/// Turns a cursor position into prefix/suffix strings.
#[async_trait]
pub trait ContextExtractor: Send + Sync {
	async fn extract(&self, document: DocumentId, at: Position) -> Result<Surrounding, ProviderError>;
}

/// The slow, cancellable completion backend.
///
/// `complete` receives the cancellation handle for the request; cancelling it
/// is best-effort. The transport may still deliver a late result, which the
/// engine drops by generation on receipt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
	async fn resolve_model(&self) -> Result<ModelInfo, ProviderError>;
	/// Returns the ordered raw candidate strings, possibly empty.
	async fn complete(
		&self,
		prompt: PromptData,
		model: &ModelInfo,
		cancel: CancellationToken,
	) -> Result<Vec<String>, ProviderError>;
}

/// Optional auxiliary context source (symbols, diagnostics, retrieval).
///
/// `gather` enforces its own timeout internally and always resolves; partial
/// provider failure yields `None` rather than an error.
#[async_trait]
pub trait ContextGatherer: Send + Sync {
	fn is_enabled(&self) -> bool;
	async fn gather(&self, params: GatherParams) -> Option<String>;
}

/// Pure prompt-formatting function.
pub type PromptFn = dyn Fn(&Surrounding, &PromptOptions, Option<&str>) -> PromptData + Send + Sync;

/// Prompt formatter configuration: a built-in by name, or a caller-supplied
/// function. Resolved once at engine construction into a single callable.
#[derive(Clone)]
pub enum PromptFormat {
	Named(String),
	Custom(Arc<PromptFn>),
}

impl Default for PromptFormat {
	fn default() -> Self {
		Self::Named("fim".to_string())
	}
}

impl PromptFormat {
	/// Resolves to a callable. Unknown names fall back to the built-in
	/// fill-in-the-middle formatter.
	pub fn resolve(self) -> Arc<PromptFn> {
		match self {
			PromptFormat::Custom(format) => format,
			PromptFormat::Named(name) => {
				if name != "fim" {
					warn!(format = %name, "unknown prompt format, falling back to fim");
				}
				let format: Arc<PromptFn> = Arc::new(fim_prompt);
				format
			}
		}
	}
}

/// Built-in fill-in-the-middle formatter: prefix/suffix pass through, with
/// gathered context prepended to the prefix.
pub fn fim_prompt(surrounding: &Surrounding, options: &PromptOptions, additional: Option<&str>) -> PromptData {
	let prefix = match additional {
		Some(extra) if !extra.is_empty() => format!("{extra}\n{}", surrounding.before),
		_ => surrounding.before.clone(),
	};
	PromptData {
		prefix,
		suffix: surrounding.after.clone(),
		language: options.filetype.clone(),
		rejected: options.rejected.clone(),
	}
}
