use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Environment variables consulted for the store URL, in priority order.
const DATABASE_URL_VARS: [&str; 2] = ["DATABASE_URL", "MONGO_URI"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PitchConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_database_name")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_database_name() -> String {
    "StartUp_History".to_string()
}

fn default_collection() -> String {
    "Idea_History".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            database: default_database_name(),
            collection: default_collection(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Name of the environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout. Unset means the call may block indefinitely.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            timeout_seconds: None,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    /// A missing variable yields an empty key; the provider call reports it.
    pub fn api_key(&self) -> String {
        std::env::var(&self.api_key_env).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated list of allowed origins. Unset allows any origin.
    pub cors_allowed_origins: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_allowed_origins: None,
        }
    }
}

impl PitchConfig {
    /// Load from an optional TOML file layered with `PITCH__*` environment
    /// variables, then apply the well-known store URL variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("PITCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut config: Self = s.try_deserialize()?;
        config.apply_database_url_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_database_url_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.database.url.is_empty() {
            return;
        }
        if let Some(url) = DATABASE_URL_VARS
            .iter()
            .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        {
            self.database.url = url;
        }
    }
}
