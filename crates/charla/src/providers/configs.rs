use std::fmt;
use std::time::Duration;

pub const OPENAI_HOST: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_TRANSPORT_BACKOFF: Duration = Duration::from_millis(1500);

/// Connection and retry settings for an OpenAI compatible completion endpoint.
///
/// Built once at startup and handed to the provider; nothing in the provider
/// reads the environment.
#[derive(Clone)]
pub struct OpenAiProviderConfig {
    /// Base url, the chat completions path is appended to it
    pub host: String,
    pub model: String,
    /// Bearer credential. Without one the agent runs in command-only mode.
    pub api_key: Option<String>,
    /// Timeout applied to each attempt separately
    pub timeout: Duration,
    /// Total attempts per completion, including the first one
    pub max_retries: u32,
    /// Multiplied by the attempt number when a 429 carries no retry-after
    pub rate_limit_backoff: Duration,
    /// Multiplied by the attempt number after a transport failure
    pub transport_backoff: Duration,
}

impl OpenAiProviderConfig {
    pub fn new<H: Into<String>, M: Into<String>>(host: H, model: M, api_key: Option<String>) -> Self {
        Self {
            host: host.into(),
            model: model.into(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            transport_backoff: DEFAULT_TRANSPORT_BACKOFF,
        }
    }

    /// Whether a non-blank credential is present
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self::new(OPENAI_HOST, OPENAI_MODEL, None)
    }
}

impl fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("rate_limit_backoff", &self.rate_limit_backoff)
            .field("transport_backoff", &self.transport_backoff)
            .finish()
    }
}
