//! Layered application configuration.
//!
//! Values are merged from the built-in defaults, an optional TOML file and
//! `USSD__SECTION__KEY` environment variables, in that order.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ConfigurationError, Result},
    models::Choice,
};

/// Directory under the user config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "ussd";
/// Directory under [`CONFIG_DIR`] holding file-backed sessions.
pub const SESSION_DIR: &str = "sessions";
/// Characters reserved on every page for the `CON `/`END ` status tag.
pub const STATUS_TAG_RESERVE: usize = 4;

const DEFAULT_CONFIG: &str = r#"# USSD engine configuration.
# Every key may be overridden with USSD__SECTION__KEY environment variables,
# e.g. USSD__SESSION__LIFETIME_SECS=120.

name = "ussd"
# Screen entered when a session starts or the subscriber presses home.
initial_screen = "demo.home"
max_page_length = 182
max_redirects = 8
error_message = "An error occurred. Please try again later."

[session]
name = "ussd_session"
lifetime_secs = 180
# timeout_secs = 180
history_size = 16
io_timeout_ms = 2000
lock_timeout_ms = 5000
clear_on_end = false
# "memory" or "file"
backend = "memory"
# dir = "/var/lib/ussd/sessions"

[cache]
key_prefix = ""

[navigation]
previous = { value = "97", label = "Previous" }
home = { value = "99", label = "Home" }
more = { value = "98", label = "More" }
back = { value = "0", label = "Back" }
"#;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name used in log fields.
    pub name: String,
    /// Screen entered for new sessions and on `home`.
    pub initial_screen: String,
    /// Maximum characters of one response, status tag included.
    pub max_page_length: usize,
    /// Redirect hops allowed within one turn.
    pub max_redirects: usize,
    /// Body of the END page produced for unhandled errors.
    pub error_message: String,
    /// `[session]` section.
    pub session: SessionConfig,
    /// `[cache]` section.
    pub cache: CacheConfig,
    /// `[navigation]` section.
    pub navigation: NavigationConfig,
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session name, part of every backend key.
    pub name: String,
    /// Age after which a stored session is treated as stale.
    pub lifetime_secs: u64,
    /// Backend TTL; falls back to the lifetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Screens kept on the back stack.
    pub history_size: usize,
    /// Per-call bound on backend I/O, in milliseconds.
    pub io_timeout_ms: u64,
    /// Bound on waiting for an identity's lease, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Delete sessions that ended instead of keeping them until expiry.
    pub clear_on_end: bool,
    /// Where sessions are kept.
    pub backend: BackendKind,
    /// Root of the file backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Session backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process memory. Lost on restart.
    Memory,
    /// JSON files under `dir`.
    File,
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prepended to every backend key.
    pub key_prefix: String,
}

/// `[navigation]` section: the four reserved menu codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Returns to the previous screen.
    pub previous: Choice,
    /// Returns to the initial screen.
    pub home: Choice,
    /// Next page.
    pub more: Choice,
    /// Previous page.
    pub back: Choice,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "ussd".to_string(),
            initial_screen: String::new(),
            max_page_length: 182,
            max_redirects: 8,
            error_message: "An error occurred. Please try again later.".to_string(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "ussd_session".to_string(),
            lifetime_secs: 180,
            timeout_secs: None,
            history_size: 16,
            io_timeout_ms: 2_000,
            lock_timeout_ms: 5_000,
            clear_on_end: false,
            backend: BackendKind::Memory,
            dir: None,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            previous: Choice::new("97", "Previous"),
            home: Choice::new("99", "Home"),
            more: Choice::new("98", "More"),
            back: Choice::new("0", "Back"),
        }
    }
}

impl SessionConfig {
    /// How long a stored session stays usable.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// TTL handed to the backend on save.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(self.lifetime_secs))
    }

    /// Per-call backend timeout.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Bound on lease acquisition.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Root used by the file backend when none is configured.
    pub fn dir_or_default(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CONFIG_DIR)
                .join(SESSION_DIR)
        })
    }
}

impl NavigationConfig {
    fn codes(&self) -> [(&'static str, &Choice); 4] {
        [
            ("previous", &self.previous),
            ("home", &self.home),
            ("more", &self.more),
            ("back", &self.back),
        ]
    }
}

impl AppConfig {
    /// Load from the default config file location plus the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_file_path())
    }

    /// Load from an explicit file (which may be missing) plus the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Config::try_from(&AppConfig::default()).map_err(ConfigurationError::from)?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("USSD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(ConfigurationError::from)?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(ConfigurationError::from)?;
        config.validate()?;
        info!(path = %path.display(), app = %config.name, "Loaded configuration");
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without touching the environment.
    pub fn from_toml(source: &str) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default()).map_err(ConfigurationError::from)?;
        let config: AppConfig = Config::builder()
            .add_source(defaults)
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(ConfigurationError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.initial_screen.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "initial_screen must be set".to_string(),
            ));
        }
        if self.max_redirects == 0 {
            return Err(ConfigurationError::Invalid(
                "max_redirects must be at least 1".to_string(),
            ));
        }
        if self.session.history_size == 0 {
            return Err(ConfigurationError::Invalid(
                "session.history_size must be at least 1".to_string(),
            ));
        }

        let codes = self.navigation.codes();
        for (index, (name, choice)) in codes.iter().enumerate() {
            if choice.value.trim().is_empty() {
                return Err(ConfigurationError::Invalid(format!(
                    "navigation.{name} needs a code"
                )));
            }
            if let Some((other, _)) = codes[index + 1..]
                .iter()
                .find(|(_, other)| other.value == choice.value)
            {
                return Err(ConfigurationError::Invalid(format!(
                    "navigation.{name} and navigation.{other} share code '{}'",
                    choice.value
                )));
            }
        }

        let nav = &self.navigation;
        let reserved = nav.previous.len() + nav.home.len() + nav.more.len() + 3;
        let interior = nav.more.len() + nav.back.len() + 2;
        let budget = self.page_budget();
        if budget <= reserved.max(interior) {
            return Err(ConfigurationError::Invalid(format!(
                "max_page_length {} leaves no room for content next to the navigation controls",
                self.max_page_length
            )));
        }
        Ok(())
    }

    /// Characters available to the paginator.
    pub fn page_budget(&self) -> usize {
        self.max_page_length.saturating_sub(STATUS_TAG_RESERVE)
    }
}

/// Default location of `config.toml`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> anyhow::Result<PathBuf> {
    ensure_config_at(config_file_path())
}

fn ensure_config_at(path: PathBuf) -> anyhow::Result<PathBuf> {
    use anyhow::Context;

    if path.exists() {
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_round_trips() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = ensure_config_at(dir.path().join("nested").join("config.toml"))?;
        assert!(path.exists());

        let config = AppConfig::from_toml(&fs::read_to_string(&path)?)?;
        assert_eq!(config.initial_screen, "demo.home");
        assert_eq!(config.max_page_length, 182);
        assert_eq!(config.page_budget(), 178);
        assert_eq!(config.session.history_size, 16);
        assert_eq!(config.session.backend, BackendKind::Memory);
        assert_eq!(config.navigation, NavigationConfig::default());
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> anyhow::Result<()> {
        let config = AppConfig::from_toml(
            r#"
            initial_screen = "bank.home"
            [session]
            lifetime_secs = 60
            timeout_secs = 300
            backend = "file"
            [navigation]
            home = { value = "00", label = "Main menu" }
            "#,
        )?;
        assert_eq!(config.session.lifetime(), Duration::from_secs(60));
        assert_eq!(config.session.timeout(), Duration::from_secs(300));
        assert_eq!(config.session.backend, BackendKind::File);
        assert_eq!(config.navigation.home.to_string(), "00: Main menu");
        assert_eq!(config.navigation.more.value, "98");
        Ok(())
    }

    #[test]
    fn timeout_defaults_to_lifetime() {
        let session = SessionConfig {
            lifetime_secs: 42,
            ..SessionConfig::default()
        };
        assert_eq!(session.timeout(), Duration::from_secs(42));
    }

    #[test]
    fn validation_rejects_inconsistent_values() {
        let base = AppConfig {
            initial_screen: "app.home".into(),
            ..AppConfig::default()
        };
        assert!(base.validate().is_ok());

        assert!(AppConfig::default().validate().is_err());

        let mut clash = base.clone();
        clash.navigation.back.value = "98".into();
        let err = clash.validate().unwrap_err();
        assert!(err.to_string().contains("share code '98'"));

        let mut tiny = base.clone();
        tiny.max_page_length = 30;
        assert!(tiny.validate().is_err());

        let mut no_hops = base;
        no_hops.max_redirects = 0;
        assert!(no_hops.validate().is_err());
    }
}
