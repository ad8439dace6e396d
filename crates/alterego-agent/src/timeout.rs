use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::provider::{Completion, CompletionProvider, CompletionRequest, ProviderError};

/// Wraps a provider so every call is bounded by a deadline.
///
/// Expiry surfaces as [`ProviderError::Timeout`] and is handled like any
/// other provider failure.
pub struct TimeoutProvider {
    inner: Box<dyn CompletionProvider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Box<dyn CompletionProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl CompletionProvider for TimeoutProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(req)).await {
            Ok(result) => result,
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(provider = %self.inner.name(), timeout_ms = ms, "completion timed out");
                Err(ProviderError::Timeout { ms })
            }
        }
    }
}
