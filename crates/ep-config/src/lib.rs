//! # ep-config
//!
//! Layered settings: built-in defaults, then `config/default.toml`, then
//! `config/local.toml`, then `EVENT_POCKET__SECTION__KEY` environment
//! variables. A `.env` file is read first when present.

use chrono::{Duration, FixedOffset};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use ep_core::{ContentRules, UploadPolicy};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const ENV_PREFIX: &str = "EVENT_POCKET";
const DEV_SALT: &str = "event-pocket-dev-salt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub identity: IdentitySettings,
    pub board: BoardSettings,
    pub upload: UploadSettings,
    pub offline: OfflineSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Only needed when the pages are served from another origin
    pub cors_allow_any: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory uploads are written to
    pub root: String,
    /// Prefix of the public URL returned for each upload
    pub public_base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentitySettings {
    #[serde(deserialize_with = "deserialize_secret")]
    pub salt: SecretString,
    /// Use the first `X-Forwarded-For` hop instead of the socket address
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    pub utc_offset_minutes: i32,
    pub edit_window_minutes: i64,
    pub max_content_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub max_files: usize,
    pub max_image_bytes: usize,
    pub max_video_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineSettings {
    /// Bumping this evicts every client's previous asset cache
    pub cache_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .set_default("server.cors_allow_any", false)?
        .set_default("database.url", "sqlite://data/event_pocket.db")?
        .set_default("media.root", "./data/media")?
        .set_default("media.public_base_url", "/media")?
        .set_default("identity.salt", DEV_SALT)?
        .set_default("identity.trust_forwarded_for", false)?
        .set_default("board.utc_offset_minutes", 9_i64 * 60)?
        .set_default("board.edit_window_minutes", ep_core::rules::EDIT_WINDOW_MINUTES)?
        .set_default("board.max_content_chars", ep_core::rules::MAX_CONTENT_CHARS as i64)?
        .set_default("upload.max_files", ep_core::rules::MAX_FILES as i64)?
        .set_default("upload.max_image_bytes", ep_core::rules::MAX_IMAGE_BYTES as i64)?
        .set_default("upload.max_video_bytes", ep_core::rules::MAX_VIDEO_BYTES as i64)?
        .set_default("offline.cache_version", "eventpocket-v1")?
        .set_default("log.level", "info")?
        .set_default("log.format", "pretty")?)
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Invalid(format!(".env: {e}")));
            }
        }

        let settings: Settings = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overlaid with an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.board.offset()?;
        if self.board.max_content_chars == 0 {
            return Err(ConfigError::Invalid("board.max_content_chars must be positive".into()));
        }
        if self.board.edit_window_minutes < 0 {
            return Err(ConfigError::Invalid("board.edit_window_minutes must not be negative".into()));
        }
        if self.upload.max_files == 0 {
            return Err(ConfigError::Invalid("upload.max_files must be positive".into()));
        }
        if self.offline.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid("offline.cache_version must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl IdentitySettings {
    /// True while the built-in development salt is in use.
    pub fn uses_dev_salt(&self) -> bool {
        use secrecy::ExposeSecret;
        self.salt.expose_secret() == DEV_SALT
    }
}

impl BoardSettings {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "board.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    pub fn content_rules(&self, max_media_urls: usize) -> ContentRules {
        ContentRules {
            max_chars: self.max_content_chars,
            edit_window: Duration::minutes(self.edit_window_minutes),
            max_media_urls,
        }
    }
}

impl UploadSettings {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_files: self.max_files,
            max_image_bytes: self.max_image_bytes,
            max_video_bytes: self.max_video_bytes,
        }
    }
}
