use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::errors::AskError;
use crate::models::history::{sanitize_history, HistoryEntry};
use crate::models::message::Message;
use crate::prompt_template::system_prompt;
use crate::providers::base::{Completion, Provider};
use crate::providers::configs::OpenAiProviderConfig;
use crate::providers::openai::OpenAiProvider;
use crate::tools::dispatcher::ToolDispatcher;

/// Reply when no credential is configured
pub const NO_CREDENTIAL_REPLY: &str = "IA desactivada (falta CHARLA_LLM__API_KEY). \
    Podés usar comandos: /calc, /clima, /nota, /notas, /nota-borrar.";

/// Reply when the model answered without usable text
pub const EMPTY_CONTENT_REPLY: &str = "(sin contenido del modelo)";

/// Answers one user message, letting the model call the registered tools
/// once before it writes the final reply
pub struct Agent {
    provider: Option<Arc<dyn Provider>>,
    dispatcher: ToolDispatcher,
    system_prompt: String,
}

impl Agent {
    /// Without a provider the agent only returns the command-mode notice
    pub fn new<S: Into<String>>(
        provider: Option<Arc<dyn Provider>>,
        dispatcher: ToolDispatcher,
        system_prompt: S,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            system_prompt: system_prompt.into(),
        }
    }

    /// Build an agent talking to an OpenAI compatible endpoint, replying in
    /// `language`
    pub fn from_config(
        config: OpenAiProviderConfig,
        dispatcher: ToolDispatcher,
        language: &str,
    ) -> Result<Self> {
        let provider: Option<Arc<dyn Provider>> = if config.has_credential() {
            info!(host = %config.host, model = %config.model, "LLM enabled");
            Some(Arc::new(OpenAiProvider::new(config)?))
        } else {
            warn!("no LLM credential configured, natural language replies are disabled");
            None
        };

        Ok(Self::new(provider, dispatcher, system_prompt(language)?))
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Reply to `user_message` given the prior turns in `history`.
    ///
    /// Always returns text: failures of the completion endpoint come back
    /// as a diagnostic reply and tool failures are shown to the model.
    pub async fn ask(&self, history: &[HistoryEntry], user_message: &str) -> String {
        let Some(provider) = &self.provider else {
            return NO_CREDENTIAL_REPLY.to_string();
        };

        match self.converse(provider.as_ref(), history, user_message).await {
            Ok(reply) => reply,
            Err(AskError::FirstCall(e)) => {
                error!(error = %e, "completion failed");
                format!(
                    "⚠️ Error al llamar al modelo: {}\n\
                     Revisá CHARLA_LLM__API_KEY / CHARLA_LLM__MODEL / CHARLA_LLM__BASE_URL.",
                    e
                )
            }
            Err(AskError::Finalize(e)) => {
                error!(error = %e, "completion after tool calls failed");
                format!("⚠️ Error al finalizar respuesta: {}", e)
            }
        }
    }

    async fn converse(
        &self,
        provider: &dyn Provider,
        history: &[HistoryEntry],
        user_message: &str,
    ) -> Result<String, AskError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(sanitize_history(history));
        messages.push(Message::user(user_message));
        let tools = self.dispatcher.schemas();

        debug!(messages = messages.len(), tools = tools.len(), "requesting completion");
        let first = provider
            .complete(&messages, &tools)
            .await
            .map_err(AskError::FirstCall)?;

        let response = match first.message() {
            Ok(response) if response.has_tool_calls() => response,
            _ => return Ok(extract_reply(&first)),
        };

        let mut results = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            debug!(id = %call.id, tool = %call.name, "dispatching tool call");
            let result = self.dispatcher.invoke(&call.name, &call.arguments).await;
            let name = if call.name.is_empty() {
                "unknown"
            } else {
                call.name.as_str()
            };
            results.push(Message::tool(call.id.as_str(), name, result.to_string()));
        }

        let mut echo = Message::assistant();
        echo.tool_calls = response.tool_calls;
        messages.push(echo);
        messages.extend(results);

        let second = provider
            .complete(&messages, &tools)
            .await
            .map_err(AskError::Finalize)?;

        // Tool calls requested at this point are not run
        Ok(extract_reply(&second))
    }
}

/// The reply text of a completion, or a placeholder when there is none
pub fn extract_reply(completion: &Completion) -> String {
    match completion.message() {
        Ok(message) => match message.text() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => EMPTY_CONTENT_REPLY.to_string(),
        },
        Err(e) => format!("(no se pudo extraer contenido: {})", e),
    }
}
