pub mod error;
pub mod factory;
pub mod http;
pub mod types;

pub mod cohere;
pub mod mock;
pub mod openai;

pub use error::ProviderError;
pub use factory::{ProviderKind, ProviderSettings, create_generator};
pub use types::ApiKey;

pub use cohere::CohereProvider;
pub use mock::{ScriptedGenerator, ScriptedReply};
pub use openai::OpenAIProvider;
