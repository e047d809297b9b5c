use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    /// Selects Postgres storage when set; otherwise the JSON file under `storage_dir`.
    pub database_url: Option<String>,
    pub storage_dir: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub public_rps: u32,
    pub cors_origin: Option<String>,
    pub max_upload_mb: usize,
    pub log_format: LogFormat,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            storage_dir: get_env_opt("STORAGE_DIR").unwrap_or_else(|| "./data".to_string()),
            openai_api_key: get_env_opt("OPENAI_API_KEY"),
            openai_model: get_env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            cors_origin: get_env_opt("CORS_ORIGIN"),
            max_upload_mb: get_env_parse_or("MAX_UPLOAD_MB", 10)?,
            log_format: parse_log_format(get_env_opt("LOG_FORMAT").as_deref())?,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Unset and blank are both treated as absent.
fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat> {
    match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
        None | Some("text") | Some("pretty") => Ok(LogFormat::Text),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other))),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
