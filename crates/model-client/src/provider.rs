use async_trait::async_trait;

use crate::{ModelRequest, ModelResponse, Result};

/// A named external language model.
///
/// Implementations are treated as black boxes with their own latency and
/// failure modes. Callers own timeouts and cancellation: dropping the
/// returned future must abandon the call.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Stable provider name used in logs, failure notes and analyses.
    fn name(&self) -> &str;

    /// Vendor model identifier this provider targets.
    fn model(&self) -> &str;

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse>;
}
