use std::env;
use std::sync::Arc;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::template::{HtmlStringifier, PlainStringifier, Stringifier};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Upper bound on request bodies (template sources, environments)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Directory preloaded into the store at startup
    #[serde(default)]
    pub dir: Option<String>,
    /// File extension of templates in `dir`
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub escape: EscapeMode,
}

/// Escaping applied to interpolated values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    #[default]
    Html,
    Plain,
}

impl EscapeMode {
    pub fn stringifier(self) -> Arc<dyn Stringifier> {
        match self {
            EscapeMode::Html => Arc::new(HtmlStringifier),
            EscapeMode::Plain => Arc::new(PlainStringifier),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_extension() -> String {
    "html".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("templates.extension", "html")?
            .set_default("templates.escape", "html")?
            .set_default("log.format", "text")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // MICROTEMPLATE__SERVER__PORT, MICROTEMPLATE__TEMPLATES__DIR, etc.
            .add_source(
                Environment::with_prefix("MICROTEMPLATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: default_extension(),
            escape: EscapeMode::default(),
        }
    }
}
