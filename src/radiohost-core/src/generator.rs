//! Dialogue script generation.
//!
//! Builds the audience-adapted prompt, asks the chat-completion provider for
//! a script, then extracts and validates the JSON reply.

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::extract::{extract_json, validate_script};
use crate::prompt::PromptTemplate;
use crate::provider::{ChatCompletionProvider, CompletionParams};
use crate::request::GenerationRequest;
use crate::script::Script;

/// Turns a [`GenerationRequest`] into a validated [`Script`].
///
/// Performs exactly one completion call per `generate`. Retrying is left to
/// the caller, see [`crate::retry::RetryPolicy`].
pub struct ScriptGenerator {
    provider: Box<dyn ChatCompletionProvider>,
    template: PromptTemplate,
    params: CompletionParams,
}

impl ScriptGenerator {
    pub fn new(provider: Box<dyn ChatCompletionProvider>) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            params: CompletionParams::default(),
        }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Replace the decoding parameters.
    pub fn with_params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Render the prompt that `generate` would send.
    pub fn prompt_for(&self, request: &GenerationRequest) -> String {
        self.template.render(request)
    }

    #[instrument(
        skip(self, request),
        fields(topic = %request.topic, audience = %request.audience, provider = self.provider.name())
    )]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Script> {
        request.validate()?;

        let prompt = self.template.render(request);
        debug!(
            prompt_chars = prompt.len(),
            target_turns = request.target_turns(),
            "rendered prompt"
        );

        let response = self
            .provider
            .complete(&prompt, &self.template.system, &self.params)
            .await?;
        debug!(response_chars = response.len(), "received completion");

        let value = extract_json(&response)?;
        let script = validate_script(value, &request.topic)?;

        info!(
            title = %script.title,
            turns = script.dialogue.len(),
            words = script.word_count(),
            "generated script"
        );
        Ok(script)
    }
}
