use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid server address {host}:{port}")]
    InvalidAddress { host: String, port: u16 },

    #[error("Invalid value for {env_var}: {detail}")]
    InvalidValue { env_var: String, detail: String },
}

/// Environment variable that sets the dotted settings `field`
pub fn to_env_var(field: &str) -> String {
    format!("CHARLA_{}", field.to_uppercase().replace('.', "__"))
}
