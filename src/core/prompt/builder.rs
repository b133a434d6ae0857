use chrono::{DateTime, Local};

use super::template::{
    CONTEXT_END, CONTEXT_START, PROMPT_HEADER, RESPONSE_GUIDELINES, SYSTEM_INSTRUCTION,
    TIME_PREFIX, TIMESTAMP_FORMAT,
};

/// A fully rendered prompt. Built once by [`PromptBuilder`] and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    context: String,
    prompt: String,
    timestamp: DateTime<Local>,
    text: String,
}

impl GenerationRequest {
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    /// The request payload sent to the generator.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Renders `(context, prompt)` into the request text.
///
/// Neither input is escaped: a context that contains the literal
/// `END OF CONTEXT BLOCK` marker will confuse the model, and that is
/// accepted.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: String,
    guidelines: String,
}

impl PromptBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            instruction: SYSTEM_INSTRUCTION.to_string(),
            guidelines: RESPONSE_GUIDELINES.to_string(),
        }
    }

    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    #[must_use]
    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.guidelines = guidelines.into();
        self
    }

    #[must_use]
    pub fn build(&self, context: &str, prompt: &str) -> GenerationRequest {
        self.build_at(context, prompt, Local::now())
    }

    #[must_use]
    pub fn build_at(
        &self,
        context: &str,
        prompt: &str,
        timestamp: DateTime<Local>,
    ) -> GenerationRequest {
        let mut text = String::with_capacity(
            self.instruction.len() + self.guidelines.len() + context.len() + prompt.len() + 128,
        );

        text.push_str(&self.instruction);
        text.push_str("\n\n");

        text.push_str(TIME_PREFIX);
        text.push_str(&timestamp.format(TIMESTAMP_FORMAT).to_string());
        text.push_str("\n\n");

        text.push_str(CONTEXT_START);
        text.push('\n');
        text.push_str(context);
        text.push('\n');
        text.push_str(CONTEXT_END);
        text.push_str("\n\n");

        text.push_str(PROMPT_HEADER);
        text.push('\n');
        text.push_str(prompt);

        if !self.guidelines.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.guidelines);
        }

        GenerationRequest {
            context: context.to_string(),
            prompt: prompt.to_string(),
            timestamp,
            text,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
