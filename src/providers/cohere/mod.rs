mod convert;
mod types;

use async_trait::async_trait;
use futures::StreamExt;

use crate::core::generator::TextGenerator;
use crate::core::prompt::GenerationRequest;
use crate::core::types::{FragmentStream, GenerationParams};
use crate::providers::error::ProviderError;
use crate::providers::http::{AuthStrategy, HttpClient, HttpConfig, NdjsonParser};
use crate::providers::types::{ApiKey, BaseUrl, ModelId};

pub const API_KEY_ENV: &str = "COHERE_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
const DEFAULT_MODEL: &str = "command-r-08-2024";

/// Cohere chat (`/v1/chat`) with newline-delimited JSON streaming.
#[derive(Clone)]
pub struct CohereProvider {
    http: HttpClient,
    auth: AuthStrategy,
    model: ModelId,
    base_url: BaseUrl,
}

impl std::fmt::Debug for CohereProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CohereProvider {
    pub fn new(api_key: ApiKey) -> Result<Self, ProviderError> {
        Self::with_http_config(api_key, HttpConfig::default())
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
impl TextGenerator for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
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
        let url = self.base_url.join("/v1/chat");

        tracing::debug!(
            model = %api_request.model,
            connectors = api_request.connectors.len(),
            prompt_bytes = api_request.message.len(),
            "Opening Cohere chat stream"
        );

        let response = self
            .http
            .post(&url, &self.auth)
            .header("content-type", "application/json")
            .header("accept", "application/stream+json")
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status, &error_body));
        }

        let lines = NdjsonParser::parse_stream(response.bytes_stream());
        let events = lines.filter_map(|result| async move {
            match result {
                Ok(line) => convert::parse_stream_line(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(events.boxed())
    }
}
