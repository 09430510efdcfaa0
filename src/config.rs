use std::env;
use std::path::PathBuf;

/// Process configuration, read from the environment once at startup and
/// passed down through the router state.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub media_dir: PathBuf,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            bind_addr: env_or("EDUFORGE_BIND_ADDR", "0.0.0.0:3000"),
            database_path: env_or("EDUFORGE_DATABASE_PATH", "eduforge.db").into(),
            media_dir: env_or("EDUFORGE_MEDIA_DIR", "media").into(),
            generation: GenerationConfig {
                api_key: env_or("OPENAI_API_KEY", ""),
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
