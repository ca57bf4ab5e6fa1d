//! The completion-service seam and its reqwest-backed implementation.
//!
//! [`CompletionService`] is the boundary the dispatcher calls through. The
//! production implementation is [`HttpChatService`]; tests substitute scripted
//! services behind the same trait.

pub mod http;

pub use http::{HttpChatService, TransportError};

use crate::quota::QuotaHints;
use crate::types::message::Prompt;
use crate::Result;
use async_trait::async_trait;

/// One completed exchange with the inference API: the assistant text plus the
/// rate-limit metadata that rode along on the response.
#[derive(Debug, Clone)]
pub struct ChatExchange {
    pub content: String,
    pub quota: QuotaHints,
}

/// The seam between dispatch and the wire.
///
/// `complete` performs exactly one request/response cycle. Implementations
/// classify remote rejections as [`Error::Api`](crate::Error::Api) and
/// connection-level failures as [`Error::Transport`](crate::Error::Transport);
/// the caller supplies the deadline around the whole call.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatExchange>;
}
