//! `model-client`: invoke named external language models.
//!
//! The crate exposes one seam, [`ModelProvider`], and one production
//! implementation, [`HttpProvider`], which speaks the OpenAI-compatible
//! chat-completions protocol.
//!
//! # Architecture
//!
//! ```text
//! ModelRequest  ← system + user messages, token/temperature hints
//!     │
//!     ▼
//! ModelProvider ← async trait; one instance per configured provider
//!     │
//!     ▼
//! ModelResponse ← provider name, model id, text content, usage, latency
//! ```
//!
//! Timeouts and cancellation belong to the caller: wrap `invoke` in
//! `tokio::time::timeout` and drop the future to abandon a call.

pub mod error;
pub mod http;
pub mod provider;
pub mod types;

pub use error::ModelClientError;
pub use http::HttpProvider;
pub use provider::ModelProvider;
pub use types::{ChatMessage, ModelRequest, ModelResponse, Role, TokenUsage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ModelClientError>;
