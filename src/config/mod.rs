mod settings;

pub use settings::{
    EscapeMode, LogConfig, LogFormat, ServerConfig, Settings, TemplatesConfig,
};
