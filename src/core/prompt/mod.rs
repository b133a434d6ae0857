mod builder;
pub mod template;

pub use builder::{GenerationRequest, PromptBuilder};
