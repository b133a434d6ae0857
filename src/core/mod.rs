pub mod error;
pub mod generator;
pub mod prompt;
pub mod relay;
pub mod types;

pub use error::{RelayError, Result};
pub use generator::TextGenerator;
pub use prompt::{GenerationRequest, PromptBuilder};
pub use relay::{RelayConfig, RetryPolicy, StreamHandle, StreamingRelay};
