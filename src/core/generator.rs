use async_trait::async_trait;

use super::prompt::GenerationRequest;
use super::types::{FragmentStream, GenerationParams};
use crate::providers::error::ProviderError;

/// A hosted text-generation service that streams its answer.
///
/// `open_stream` is one establishment attempt: it either returns a live
/// stream or fails before any fragment is produced. Dropping the returned
/// stream aborts the underlying request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    async fn open_stream(
        &self,
        request: &GenerationRequest,
        params: &GenerationParams,
    ) -> Result<FragmentStream, ProviderError>;
}
