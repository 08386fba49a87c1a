//! # ql-config
//!
//! Layered settings: built-in defaults, then an optional `quill.toml`, then
//! `QUILL_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `QUILL_SERVER__PORT=9000`). A `.env` file is loaded first when present.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub feed: FeedSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection URL, e.g. `sqlite:quill.db`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Root directory for uploads
    pub root: String,
    /// Public URL prefix the binary serves `root` under
    pub url_prefix: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedSettings {
    pub page_size: u32,
    pub follow_page_size: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            follow_page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheSettings {
    /// Zero disables the index page cache
    pub index_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Salt mixed into stored session digests
    pub secret: SecretString,
    pub session_ttl_hours: i64,
}

impl Settings {
    /// Loads from `quill.toml` in the working directory plus the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("quill")
    }

    /// `file` is a path without extension, as `config::File::with_name` takes.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }

        let settings: Settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:quill.db")?
            .set_default("database.max_connections", 5)?
            .set_default("media.root", "./data/media")?
            .set_default("media.url_prefix", "/media")?
            .set_default("feed.page_size", 10)?
            .set_default("feed.follow_page_size", 10)?
            .set_default("cache.index_ttl_secs", 20)?
            .set_default("auth.secret", "change-me")?
            .set_default("auth.session_ttl_hours", 24 * 14)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size", "must be positive".into()));
        }
        if self.feed.follow_page_size == 0 {
            return Err(ConfigError::Invalid(
                "feed.follow_page_size",
                "must be positive".into(),
            ));
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "auth.session_ttl_hours",
                "must be positive".into(),
            ));
        }
        if !self.media.url_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(
                "media.url_prefix",
                format!("{:?} must start with '/'", self.media.url_prefix),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_load_without_a_file() {
        let settings = Settings::load_from("does-not-exist").expect("defaults should load");
        assert_eq!(settings.feed.page_size, 10);
        assert_eq!(settings.feed.follow_page_size, 10);
        assert_eq!(settings.media.url_prefix, "/media");
        assert!(!settings.auth.secret.expose_secret().is_empty());
    }
}
