//! Core configuration.
//!
//! Loaded from TOML. Every field has a default so an empty file is valid.
//!
//! ```toml
//! global_scope_token = "allschool"
//! strict_unit_names = false
//! busy_timeout_ms = 5000
//! frontend_url = "https://calendar.example.org"
//! log_level = "info"
//! log_dir = "/var/log/schoolcal"
//! ```

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_GLOBAL_SCOPE_TOKEN: &str = "allschool";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_global_scope_token() -> String {
    DEFAULT_GLOBAL_SCOPE_TOKEN.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Runtime options for the calendar core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Unit token in uploaded rows that means "every unit".
    /// Matched trimmed and case-insensitively.
    #[serde(default = "default_global_scope_token")]
    pub global_scope_token: String,
    /// Reject registering a unit whose name is already taken.
    #[serde(default)]
    pub strict_unit_names: bool,
    /// Upper bound on waiting for a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Base URL used to build per-unit share links.
    #[serde(default)]
    pub frontend_url: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            global_scope_token: default_global_scope_token(),
            strict_unit_names: false,
            busy_timeout_ms: default_busy_timeout_ms(),
            frontend_url: None,
            log_level: None,
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_scope_token.trim().is_empty() {
            return Err(ConfigError::Invalid("global_scope_token must not be empty"));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid("busy_timeout_ms must be positive"));
        }
        if let Some(url) = self.frontend_url.as_deref() {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid("frontend_url must not be blank"));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Whether an uploaded unit token means the global scope.
    pub fn is_global_token(&self, token: &str) -> bool {
        token
            .trim()
            .eq_ignore_ascii_case(self.global_scope_token.trim())
    }
}
