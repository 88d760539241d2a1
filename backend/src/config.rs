use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwen-vl-max";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Connection settings for the chat-completion service.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
}

impl UpstreamConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
            var: "OPENAI_BASE_URL",
            source,
        })?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            model: model.into(),
        })
    }

    /// `<base_url>/chat/completions`, keeping any path prefix of the base URL.
    pub fn completions_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("chat/completions")
            .map_err(|source| ConfigError::InvalidUrl {
                var: "OPENAI_BASE_URL",
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let base_url = get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = get("QWEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let upstream = UpstreamConfig::new(api_key, &base_url, model)?;

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var: "PORT", value })?,
            None => DEFAULT_PORT,
        };
        let max_payload_bytes = match get("MAX_PAYLOAD_BYTES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: "MAX_PAYLOAD_BYTES",
                value,
            })?,
            None => DEFAULT_MAX_PAYLOAD_BYTES,
        };

        Ok(Self {
            upstream,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            max_payload_bytes,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
