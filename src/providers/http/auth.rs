use crate::providers::types::ApiKey;
use reqwest_middleware::RequestBuilder;

#[derive(Clone, Debug)]
pub enum AuthStrategy {
    Bearer(ApiKey),
}

impl AuthStrategy {
    #[must_use]
    pub const fn bearer(key: ApiKey) -> Self {
        Self::Bearer(key)
    }

    #[must_use]
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(key) => request.bearer_auth(key.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_debug_is_redacted() {
        let auth = AuthStrategy::bearer(ApiKey::new("co-secret-token-value"));
        let debug = format!("{auth:?}");
        assert!(debug.contains("Bearer"));
        assert!(!debug.contains("secret-token-value"));
    }
}
