use crate::error::{to_env_var, ConfigError};
use charla::prompt_template::DEFAULT_LANGUAGE;
use charla::providers::configs::{
    OpenAiProviderConfig, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_TIMEOUT,
    DEFAULT_TRANSPORT_BACKOFF, OPENAI_HOST, OPENAI_MODEL,
};
use charla::tools::notes::{NotesConfig, DEFAULT_DB_PATH};
use charla::tools::weather::{WeatherConfig, DEFAULT_WEATHER_TIMEOUT, FORECAST_URL, GEOCODING_URL};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                host: self.host.clone(),
                port: self.port,
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: f64,
    pub max_attempts: u32,
    pub rate_limit_backoff_secs: f64,
    pub transport_backoff_secs: f64,
}

impl LlmSettings {
    // Convert to the charla provider config
    pub fn into_config(self) -> Result<OpenAiProviderConfig, ConfigError> {
        let mut config = OpenAiProviderConfig::new(self.base_url, self.model, self.api_key);
        config.timeout = seconds("llm.timeout_secs", self.timeout_secs)?;
        config.max_retries = self.max_attempts;
        config.rate_limit_backoff =
            seconds("llm.rate_limit_backoff_secs", self.rate_limit_backoff_secs)?;
        config.transport_backoff =
            seconds("llm.transport_backoff_secs", self.transport_backoff_secs)?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherSettings {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout_secs: f64,
}

impl WeatherSettings {
    pub fn into_config(self) -> Result<WeatherConfig, ConfigError> {
        Ok(WeatherConfig {
            geocoding_url: self.geocoding_url,
            forecast_url: self.forecast_url,
            timeout: seconds("weather.timeout_secs", self.timeout_secs)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NotesSettings {
    pub db_path: PathBuf,
}

impl NotesSettings {
    pub fn into_config(self) -> NotesConfig {
        NotesConfig {
            db_path: self.db_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub weather: WeatherSettings,
    pub notes: NotesSettings,
    /// Language the assistant replies in
    pub language: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000_u16)?
            // LLM defaults
            .set_default("llm.base_url", OPENAI_HOST)?
            .set_default("llm.model", OPENAI_MODEL)?
            .set_default("llm.timeout_secs", DEFAULT_TIMEOUT.as_secs_f64())?
            .set_default("llm.max_attempts", i64::from(DEFAULT_MAX_RETRIES))?
            .set_default(
                "llm.rate_limit_backoff_secs",
                DEFAULT_RATE_LIMIT_BACKOFF.as_secs_f64(),
            )?
            .set_default(
                "llm.transport_backoff_secs",
                DEFAULT_TRANSPORT_BACKOFF.as_secs_f64(),
            )?
            // Tool defaults
            .set_default("weather.geocoding_url", GEOCODING_URL)?
            .set_default("weather.forecast_url", FORECAST_URL)?
            .set_default("weather.timeout_secs", DEFAULT_WEATHER_TIMEOUT.as_secs_f64())?
            .set_default("notes.db_path", DEFAULT_DB_PATH)?
            .set_default("language", DEFAULT_LANGUAGE)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("CHARLA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Load(err)
        })?;
        Ok(settings)
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidValue {
        env_var: to_env_var(field),
        detail: format!("{} is not a valid number of seconds", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("CHARLA_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.language, "español");
        assert_eq!(settings.notes.db_path, PathBuf::from("charla.db"));
        assert_eq!(settings.weather.timeout_secs, 20.0);

        let llm = settings.llm.into_config().unwrap();
        assert_eq!(llm.host, "https://api.openai.com/v1");
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.api_key, None);
        assert!(!llm.has_credential());
        assert_eq!(llm.timeout, Duration::from_secs(60));
        assert_eq!(llm.max_retries, 3);
        assert_eq!(llm.rate_limit_backoff, Duration::from_secs(2));
        assert_eq!(llm.transport_backoff, Duration::from_millis(1500));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("CHARLA_SERVER__PORT", "8080");
        env::set_var("CHARLA_LLM__API_KEY", "sk-test");
        env::set_var("CHARLA_LLM__MODEL", "gpt-4o");
        env::set_var("CHARLA_LLM__BASE_URL", "http://localhost:11434/v1");
        env::set_var("CHARLA_LLM__MAX_ATTEMPTS", "5");
        env::set_var("CHARLA_LLM__TIMEOUT_SECS", "12.5");
        env::set_var("CHARLA_NOTES__DB_PATH", "/tmp/notas.db");
        env::set_var("CHARLA_LANGUAGE", "inglés");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.language, "inglés");
        assert_eq!(
            settings.notes.into_config().db_path,
            PathBuf::from("/tmp/notas.db")
        );

        let llm = settings.llm.into_config().unwrap();
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
        assert!(llm.has_credential());
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.host, "http://localhost:11434/v1");
        assert_eq!(llm.max_retries, 5);
        assert_eq!(llm.timeout, Duration::from_millis(12_500));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_weather_settings() {
        clean_env();
        env::set_var("CHARLA_WEATHER__GEOCODING_URL", "http://localhost:9000/search");
        env::set_var("CHARLA_WEATHER__TIMEOUT_SECS", "3");

        let weather = Settings::new().unwrap().weather.into_config().unwrap();
        assert_eq!(weather.geocoding_url, "http://localhost:9000/search");
        assert_eq!(weather.forecast_url, FORECAST_URL);
        assert_eq!(weather.timeout, Duration::from_secs(3));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_reported() {
        clean_env();
        env::set_var("CHARLA_SERVER__PORT", "not-a-port");

        assert!(matches!(Settings::new(), Err(ConfigError::Load(_))));

        clean_env();
    }

    #[test]
    fn test_negative_timeout_is_rejected() {
        let llm = LlmSettings {
            base_url: OPENAI_HOST.to_string(),
            model: OPENAI_MODEL.to_string(),
            api_key: None,
            timeout_secs: -1.0,
            max_attempts: 3,
            rate_limit_backoff_secs: 2.0,
            transport_backoff_secs: 1.5,
        };

        let err = llm.into_config().unwrap_err();
        assert!(err.to_string().contains("CHARLA_LLM__TIMEOUT_SECS"));
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(bad.socket_addr().is_err());
    }
}
