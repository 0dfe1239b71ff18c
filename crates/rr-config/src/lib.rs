//! # rr-config
//!
//! Layered settings for the Rusty-Recipes binary. Later layers win:
//! built-in defaults, then an optional TOML file, then `.env`, then
//! `RUSTY_RECIPES_*` environment variables (`__` separates nesting, e.g.
//! `RUSTY_RECIPES_DATABASE__URL`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "rusty-recipes.toml";
const ENV_PREFIX: &str = "RUSTY_RECIPES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// May embed credentials, so it never shows up in `Debug` output.
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub root: PathBuf,
    pub url_prefix: String,
    pub max_upload_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// An `EnvFilter` directive such as `info` or `info,sqlx=warn`.
    pub level: String,
    pub json: bool,
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Loads settings for the process. An explicit `path` must exist; the
    /// default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }

        match path {
            Some(path) => Self::build(path, true, None),
            None => Self::build(Path::new(DEFAULT_CONFIG_FILE), false, None),
        }
    }

    /// `env` replaces the process environment when given.
    fn build(
        file: &Path,
        required: bool,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("database.url", "sqlite://rusty_recipes.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("media.root", "./data/uploads")?
            .set_default("media.url_prefix", "/static/uploads")?
            .set_default("media.max_upload_bytes", 10_i64 * 1024 * 1024)?
            .set_default("media.max_width", 1200_i64)?
            .set_default("media.max_height", 800_i64)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(File::from(file).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1",
            });
        }
        if self.media.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "media.max_upload_bytes",
                reason: "must be positive",
            });
        }
        if self.media.max_width == 0 || self.media.max_height == 0 {
            return Err(ConfigError::Invalid {
                key: "media.max_width",
                reason: "image bounds must be positive",
            });
        }
        Ok(())
    }
}
