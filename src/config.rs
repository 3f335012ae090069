use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Variable holding the store's auth token, read alongside the layered config.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Variable holding the store's base URL.
pub const BASE_URL_ENV: &str = "GITHUB_URL";

/// HTTP listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Remote secret store configuration
#[derive(Deserialize, Clone)]
pub struct StoreConfig {
    /// Base address of the store API, optionally with a path prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every store call
    #[serde(default)]
    pub token: String,
    /// Deadline for each outbound call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent as `X-GitHub-Api-Version`
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("sealbridge/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_version() -> String {
    "2022-11-28".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            api_version: default_api_version(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Root application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(BASE_URL_ENV).ok(),
        )
    }

    /// Load configuration, letting the given token and base URL win over
    /// every other source.
    pub fn load_with(token: Option<String>, base_url: Option<String>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (prefix: SEALBRIDGE_)
            // e.g., SEALBRIDGE_SERVER__PORT, SEALBRIDGE_STORE__TIMEOUT_SECS
            .add_source(
                Environment::with_prefix("SEALBRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.token", token.filter(|t| !t.is_empty()))?
            .set_override_option("store.base_url", base_url.filter(|u| !u.is_empty()))?
            .build()?;

        config.try_deserialize()
    }

    /// Initialize the process-wide config. Later reads see the same value.
    pub fn init() -> Result<&'static Self, ConfigError> {
        let config = Self::load()?;
        Ok(CONFIG.get_or_init(|| config))
    }
}
