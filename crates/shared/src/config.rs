use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_FEED_HOST, DEFAULT_FEED_PATH, DEFAULT_FEED_PORT, DEFAULT_PAGE_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to determine a home directory for settings")]
    NoProjectDirs,
    #[error("Unable to read/write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Unable to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub user_settings: UserSettings,
}

/// Which scheme to use for the status socket. Plain `ws` is only ever used
/// when explicitly configured.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Secure,
    Insecure,
}

impl Transport {
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Secure => "wss",
            Transport::Insecure => "ws",
        }
    }
}

/// Where the backend pushes system status updates.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedEndpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub transport: Transport,
}

impl Default for FeedEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_FEED_HOST.to_string(),
            port: DEFAULT_FEED_PORT,
            path: DEFAULT_FEED_PATH.to_string(),
            transport: Transport::default(),
        }
    }
}

impl FeedEndpoint {
    pub fn new(host: &str, port: u16, path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
            transport: Transport::Secure,
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.transport.scheme(),
            self.host,
            self.port,
            self.path.trim_start_matches('/')
        )
    }
}

impl fmt::Display for FeedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Reconnect the status feed after it drops. Off by default, a dropped
    /// feed simply stays down.
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive failed attempts before giving up.
    pub max_retries: usize,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_retries: 8,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserSettings {
    /// Base URL of the web front end serving the `/api` routes.
    pub base_url: String,
    /// Status socket used when the backend config endpoints are unreachable.
    pub feed: FeedEndpoint,
    /// Number of results requested per search page.
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub reconnect: ReconnectSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            feed: FeedEndpoint::default(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs, ConfigError> {
        ProjectDirs::from("com", "googol", "googol").ok_or(ConfigError::NoProjectDirs)
    }

    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn logs_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::data_dir()?.join("logs"))
    }

    pub fn prefs_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::project_dirs()?.preference_dir().to_path_buf())
    }

    /// User preferences file
    pub fn prefs_file() -> Result<PathBuf, ConfigError> {
        Ok(Self::prefs_dir()?.join("settings.ron"))
    }

    /// Reads settings from `path`, writing out the defaults if the file does
    /// not exist yet.
    pub fn load_user_settings(path: &Path) -> Result<UserSettings, ConfigError> {
        if path.exists() {
            let settings = ron::from_str(&fs::read_to_string(path)?)?;
            Ok(settings)
        } else {
            let settings = UserSettings::default();
            Self::save_user_settings(path, &settings)?;
            Ok(settings)
        }
    }

    pub fn save_user_settings(path: &Path, settings: &UserSettings) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let serialized = ron::ser::to_string_pretty(settings, Default::default())?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load from an explicit settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("loading settings from {}", path.display());
        Ok(Config {
            user_settings: Self::load_user_settings(path)?,
        })
    }

    /// Load from the platform preferences directory.
    pub fn new() -> Result<Self, ConfigError> {
        let logs_dir = Config::logs_dir()?;
        fs::create_dir_all(logs_dir)?;

        Self::from_file(&Self::prefs_file()?)
    }
}
