use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::base::{Completion, Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{messages_to_openai_spec, tools_to_openai_spec, truncate_chars};
use crate::errors::{LlmError, LlmResult};
use crate::models::message::Message;
use crate::models::tool::ToolSchema;

const MAX_ERROR_BODY_CHARS: usize = 500;
const MAX_PAYLOAD_DUMP_CHARS: usize = 200;

/// Outcome of one HTTP attempt, before the retry policy is applied
enum Attempt {
    Success(Value),
    RateLimited {
        retry_after: Option<Duration>,
        body: String,
    },
    Transport(String),
    Fatal(LlmError),
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.host.trim_end_matches('/'))
    }

    async fn attempt(&self, payload: &Value) -> Attempt {
        let mut request = self.client.post(self.url()).json(payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Transport(e.to_string()),
        };

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Transport(e.to_string()),
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited { retry_after, body };
        }
        if !status.is_success() {
            return Attempt::Fatal(LlmError::Http {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let data: Value = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(_) => {
                return Attempt::Fatal(LlmError::Malformed(truncate_chars(
                    &body,
                    MAX_PAYLOAD_DUMP_CHARS,
                )))
            }
        };

        let has_choices = data
            .get("choices")
            .and_then(|choices| choices.as_array())
            .map(|choices| !choices.is_empty())
            .unwrap_or(false);
        if !data.is_object() || !has_choices {
            return Attempt::Fatal(LlmError::Malformed(truncate_chars(
                &data.to_string(),
                MAX_PAYLOAD_DUMP_CHARS,
            )));
        }

        Attempt::Success(data)
    }

    /// Post the payload, retrying rate limits and transport failures until
    /// `max_retries` attempts were spent
    async fn post(&self, payload: Value) -> LlmResult<Value> {
        let max_retries = self.config.max_retries.max(1);

        for attempt in 1..=max_retries {
            debug!(attempt, max_retries, model = %self.config.model, "requesting completion");
            let exhausted = attempt >= max_retries;

            match self.attempt(&payload).await {
                Attempt::Success(data) => return Ok(data),
                Attempt::Fatal(err) => {
                    error!(attempt, "completion failed: {}", err);
                    return Err(err);
                }
                Attempt::RateLimited { body, .. } if exhausted => {
                    error!(attempt, "rate limited, no attempts left");
                    return Err(LlmError::Http {
                        status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                        body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
                    });
                }
                Attempt::RateLimited { retry_after, .. } => {
                    // A server-requested delay never exceeds one attempt's timeout
                    let delay = retry_after
                        .map(|delay| delay.min(self.config.timeout))
                        .unwrap_or(self.config.rate_limit_backoff * attempt);
                    warn!(attempt, ?delay, "rate limited, retrying");
                    tokio::time::sleep(delay).await;
                }
                Attempt::Transport(detail) if exhausted => {
                    error!(attempt, "transport failure, no attempts left: {}", detail);
                    return Err(LlmError::Transport(detail));
                }
                Attempt::Transport(detail) => {
                    let delay = self.config.transport_backoff * attempt;
                    warn!(attempt, ?delay, "transport failure, retrying: {}", detail);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // max_retries is at least one, so the loop always returns
        Err(LlmError::Transport("no attempts were made".to_string()))
    }
}

/// Delay requested by the server, in (possibly fractional) seconds.
/// Zero, negative and unparseable values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> LlmResult<Completion> {
        let tools_spec =
            tools_to_openai_spec(tools).map_err(|e| LlmError::Malformed(e.to_string()))?;

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
        });
        // The endpoint rejects an empty `tools` array and a `tool_choice`
        // without tools, so both are only sent when a tool is registered
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
            payload["tool_choice"] = json!("auto");
        }

        let response = self.post(payload).await?;
        let usage = Self::get_usage(&response);
        debug!(?usage, "completion received");

        Ok(Completion::new(response, usage))
    }
}
