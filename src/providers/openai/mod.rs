mod convert;
mod types;

use async_trait::async_trait;
use futures::StreamExt;

use crate::core::generator::TextGenerator;
use crate::core::prompt::GenerationRequest;
use crate::core::types::{FragmentStream, GenerationParams};
use crate::providers::error::ProviderError;
use crate::providers::http::{AuthStrategy, HttpClient, HttpConfig, SseParser};
use crate::providers::types::{ApiKey, BaseUrl, ModelId};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible `/v1/chat/completions` streaming over server-sent events.
#[derive(Clone)]
pub struct OpenAIProvider {
    http: HttpClient,
    auth: AuthStrategy,
    model: ModelId,
    base_url: BaseUrl,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIProvider {
    pub fn new(api_key: ApiKey) -> Result<Self, ProviderError> {
        Self::with_http_config(api_key, HttpConfig::default())
    }

    /// Fails when the key is missing; callers treat that as fatal.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = ApiKey::from_env(API_KEY_ENV)?;
        Self::new(api_key)
    }

    pub fn with_http_config(
        api_key: ApiKey,
        http_config: HttpConfig,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: HttpClient::with_config(http_config)?,
            auth: AuthStrategy::bearer(api_key),
            model: ModelId::new(DEFAULT_MODEL),
            base_url: BaseUrl::new(DEFAULT_BASE_URL),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<ModelId>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<BaseUrl>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
        ProviderError::from_status(status.as_u16(), body, API_KEY_ENV)
    }
}

#[async_trait]
impl TextGenerator for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        self.model.as_str()
    }

    async fn open_stream(
        &self,
        request: &GenerationRequest,
        params: &GenerationParams,
    ) -> Result<FragmentStream, ProviderError> {
        let api_request = convert::to_api_request(&self.model, request, params);
        let body = serde_json::to_string(&api_request)
            .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
        let url = self.base_url.join("/v1/chat/completions");

        tracing::debug!(model = %api_request.model, "Opening chat completions stream");

        let response = self
            .http
            .post(&url, &self.auth)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &error_body));
        }

        let sse_stream = SseParser::parse_stream(response.bytes_stream());
        let events = sse_stream.flat_map(|result| {
            let items = match result {
                Ok(event) => convert::parse_chunk(&event.data),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(items)
        });

        Ok(events.boxed())
    }
}
