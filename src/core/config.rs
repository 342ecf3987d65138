use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::core::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::core::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_USER_NAME: &str = "You";
pub const DEFAULT_ASSISTANT_NAME: &str = "Gemini";

/// Keys accepted by `parley set` / `parley unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "model",
    "base-url",
    "user-name",
    "assistant-name",
    "max-attempts",
    "initial-delay-ms",
];

/// Errors that can occur when reading, writing or editing configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file exists but is not valid TOML for [`Config`].
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to serialize or persist the configuration.
    Write {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },

    /// No platform configuration directory could be determined.
    NoConfigDir,

    UnknownKey(String),

    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path_display(path), source)
            }
            ConfigError::NoConfigDir => write!(f, "Failed to determine config directory"),
            ConfigError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of: {})",
                CONFIG_KEYS.join(", ")
            ),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {key}: {value}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Write { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// User settings persisted as TOML. Every field is optional; accessors fall
/// back to built-in defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Display name for the human side of the transcript
    pub user_name: Option<String>,
    /// Display name for the model, also used in the persona prompt
    pub assistant_name: Option<String>,
    /// Total attempts per message, including the first
    pub max_attempts: Option<u32>,
    /// First backoff delay after a rate-limit response; doubles each retry
    pub initial_delay_ms: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Writes through a temp file in the same directory so a crash never
    /// leaves a truncated config behind.
    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: Box<dyn StdError + Send + Sync>| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };

        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|e| write_err(Box::new(e)))?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| write_err(Box::new(e)))?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|e| write_err(Box::new(e)))?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| write_err(Box::new(e)))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|e| write_err(Box::new(e)))?;
        temp_file
            .persist(config_path)
            .map_err(|e| write_err(Box::new(e)))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs =
            ProjectDirs::from("org", "parley", "parley").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Applies `parley set <key> <value>`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        if value.is_empty() {
            return Err(invalid());
        }

        match key {
            "model" => self.model = Some(value.to_string()),
            "base-url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(invalid());
                }
                self.base_url = Some(value.to_string());
            }
            "user-name" => self.user_name = Some(value.to_string()),
            "assistant-name" => self.assistant_name = Some(value.to_string()),
            "max-attempts" => {
                let attempts: u32 = value.parse().map_err(|_| invalid())?;
                if attempts == 0 {
                    return Err(invalid());
                }
                self.max_attempts = Some(attempts);
            }
            "initial-delay-ms" => {
                self.initial_delay_ms = Some(value.parse().map_err(|_| invalid())?);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Applies `parley unset <key>`.
    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "user-name" => self.user_name = None,
            "assistant-name" => self.assistant_name = None,
            "max-attempts" => self.max_attempts = None,
            "initial-delay-ms" => self.initial_delay_ms = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn user_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(DEFAULT_USER_NAME)
    }

    pub fn assistant_name(&self) -> &str {
        self.assistant_name
            .as_deref()
            .unwrap_or(DEFAULT_ASSISTANT_NAME)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            self.initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INITIAL_DELAY),
        )
    }

    pub fn print_all(&self) {
        fn show(value: &Option<impl fmt::Display>, default: impl fmt::Display) -> String {
            match value {
                Some(value) => value.to_string(),
                None => format!("{default} (default)"),
            }
        }

        println!("Current configuration:");
        println!("  model: {}", show(&self.model, DEFAULT_MODEL));
        println!("  base-url: {}", show(&self.base_url, DEFAULT_BASE_URL));
        println!("  user-name: {}", show(&self.user_name, DEFAULT_USER_NAME));
        println!(
            "  assistant-name: {}",
            show(&self.assistant_name, DEFAULT_ASSISTANT_NAME)
        );
        println!(
            "  max-attempts: {}",
            show(&self.max_attempts, DEFAULT_MAX_ATTEMPTS)
        );
        println!(
            "  initial-delay-ms: {}",
            show(&self.initial_delay_ms, DEFAULT_INITIAL_DELAY.as_millis())
        );
    }
}

/// Shortens paths under the home directory to `~/...` for display.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            if let Ok(relative) = path.strip_prefix(PathBuf::from(home)) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
