use super::retry::RetryPolicy;
use crate::core::types::GenerationParams;

#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub params: GenerationParams,
    /// `None` opens the stream exactly once.
    pub retry: Option<RetryPolicy>,
}

impl RelayConfig {
    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}
