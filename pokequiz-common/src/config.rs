//! Bootstrap configuration and root folder resolution
//!
//! Resolution priority for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "POKEQUIZ_ROOT_FOLDER";

/// Directory name used under the OS data/config directories
const APP_DIR_NAME: &str = "pokequiz";

/// Progress database file name inside the root folder
const DATABASE_FILE_NAME: &str = "pokequiz.db";

/// Dataset cache file name inside the root folder
const DATASET_CACHE_FILE_NAME: &str = "pokemon.json";

/// Default localized-name language priority
pub const DEFAULT_LANGUAGES: [&str; 2] = ["ja", "ja-Hrkt"];

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; absent values take compiled defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the progress database and dataset cache
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Secret used to sign and verify user tokens
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Localized-name language priority (first match wins)
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External data provider settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Progress database settings
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            token_secret: None,
            languages: default_languages(),
            logging: LoggingConfig::default(),
            provider: ProviderSettings::default(),
            database: DatabaseSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// External data provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the species data API
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Highest base species id to fetch
    #[serde(default = "default_max_item_id")]
    pub max_item_id: u32,

    /// Number of type ids to localize (1..=type_count)
    #[serde(default = "default_type_count")]
    pub type_count: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            timeout_secs: default_timeout_secs(),
            max_item_id: default_max_item_id(),
            type_count: default_type_count(),
        }
    }
}

/// Progress database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Total time a progress write keeps retrying on "database is locked"
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider_base_url() -> String {
    "https://pokeapi.co/api/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_item_id() -> u32 {
    1025
}

fn default_type_count() -> u32 {
    18
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

/// Load TOML bootstrap configuration
///
/// `explicit_path` comes from the CLI/environment; without it the platform
/// config file (`~/.config/pokequiz/config.toml` on Linux) is tried.
/// A missing file yields defaults; an unreadable or malformed file is an error.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    let config = parse_toml_config(&content)?;
    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Platform config file location
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./pokequiz_data"))
}

/// Root folder resolution: CLI > `POKEQUIZ_ROOT_FOLDER` > TOML > OS default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        get_default_root_folder()
    }
}

/// Creates the root folder and names the files kept inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn dataset_cache_path(&self) -> PathBuf {
        self.root_folder.join(DATASET_CACHE_FILE_NAME)
    }
}

/// Resolve the token signing secret
///
/// `cli_value` already carries the CLI/environment value (clap merges both).
/// A blank or missing secret is a configuration error; callers treat it as fatal.
pub fn resolve_token_secret(cli_value: Option<&str>, config: &TomlConfig) -> Result<String> {
    let candidate = cli_value
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            config
                .token_secret
                .as_deref()
                .filter(|s| !s.trim().is_empty())
        });

    match candidate {
        Some(secret) => Ok(secret.to_string()),
        None => Err(Error::Config(
            "Token secret not configured. Set POKEQUIZ_TOKEN_SECRET, pass --token-secret, \
             or add token_secret to the TOML config"
                .to_string(),
        )),
    }
}
