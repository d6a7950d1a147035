//! Errors surfaced by the async completion pipeline.

/// Failure of one stage of a completion request.
///
/// None of these are fatal: a failed request clears state, logs, and emits a
/// lifecycle event. The engine never retries; retry policy belongs to the
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	/// The context extractor could not produce surrounding text.
	#[error("context extraction failed: {0}")]
	Extract(String),
	/// Provider/model configuration could not be resolved.
	#[error("model resolution failed: {0}")]
	ResolveModel(String),
	/// The completion call itself failed.
	#[error("completion request failed: {0}")]
	Completion(String),
	/// The request was cancelled while in flight.
	#[error("request cancelled")]
	Cancelled,
}
