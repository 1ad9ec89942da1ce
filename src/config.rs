use std::env;

use anyhow::Context;

/// Process configuration, read once at startup. `DATABASE_URL` is required;
/// the bind address defaults to 127.0.0.1:3000.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw.parse::<u16>().context("APP_PORT is not a valid port")?,
            Err(_) => 3000,
        };
        Ok(Self {
            database_url,
            host,
            port,
        })
    }
}
