//! Configuration system for the `crewboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/crewboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crewboard_proto::member::MemberId;
use crewboard_proto::task::MAX_TASK_TITLE_LENGTH;

use crate::board::BoardSettings;
use crate::store::{DEFAULT_MEMBER_PAGE, DEFAULT_TASK_PAGE};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The store URL is not a WebSocket URL.
    #[error("invalid store url {url}: {reason}")]
    InvalidStoreUrl {
        /// The offending value.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `author_id` is not a member id.
    #[error("invalid author_id {0}")]
    InvalidAuthor(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    board: BoardFileConfig,
    ui: UiFileConfig,
    auth: AuthFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    url: Option<String>,
    connect_timeout_secs: Option<u64>,
    member_page: Option<u32>,
    task_page: Option<u32>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    max_title_len: Option<usize>,
    author_id: Option<String>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
}

/// `[auth]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    admin_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Store --
    /// Store WebSocket URL.
    pub store_url: String,
    /// Timeout for connecting to the store.
    pub connect_timeout: Duration,
    /// Member listing cap.
    pub member_page: u32,
    /// Task listing cap.
    pub task_page: u32,
    /// Run against the seeded in-process store instead of `store_url`.
    pub offline: bool,

    // -- Board --
    /// Maximum task title length in characters.
    pub max_title_len: usize,
    /// Member recorded as creator of new tasks.
    pub author_id: Option<MemberId>,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,

    // -- Auth --
    /// Shared admin password; `None` keeps the gate closed.
    pub admin_password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_url: "ws://127.0.0.1:9400/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            member_page: DEFAULT_MEMBER_PAGE,
            task_page: DEFAULT_TASK_PAGE,
            offline: false,
            max_title_len: MAX_TASK_TITLE_LENGTH,
            author_id: None,
            poll_timeout: Duration::from_millis(50),
            admin_password: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if a resolved value is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_url = cli
            .store_url
            .clone()
            .or_else(|| file.store.url.clone())
            .unwrap_or(defaults.store_url);
        validate_store_url(&store_url)?;

        let author_id = file
            .board
            .author_id
            .as_deref()
            .map(|raw| {
                raw.parse::<MemberId>()
                    .map_err(|_| ConfigError::InvalidAuthor(raw.to_string()))
            })
            .transpose()?;

        Ok(Self {
            store_url,
            connect_timeout: file
                .store
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            member_page: file.store.member_page.unwrap_or(defaults.member_page),
            task_page: file.store.task_page.unwrap_or(defaults.task_page),
            offline: cli.offline,
            max_title_len: file
                .board
                .max_title_len
                .unwrap_or(defaults.max_title_len),
            author_id,
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            admin_password: cli
                .admin_password
                .clone()
                .or_else(|| file.auth.admin_password.clone()),
        })
    }

    /// Controller settings derived from this configuration.
    #[must_use]
    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            member_page: self.member_page,
            task_page: self.task_page,
            max_title_len: self.max_title_len,
            author: self.author_id.clone(),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Committee task board for event staff")]
pub struct CliArgs {
    /// WebSocket URL of the task store.
    #[arg(long, env = "CREWBOARD_STORE_URL")]
    pub store_url: Option<String>,

    /// Path to config file (default: `~/.config/crewboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Shared admin password (prefer the environment over the command line).
    #[arg(long, env = "CREWBOARD_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Use a seeded in-memory store instead of connecting.
    #[arg(long)]
    pub offline: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CREWBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/crewboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_store_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidStoreUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => {}
        other => return Err(invalid(format!("scheme must be ws or wss, not {other}"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("crewboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.store_url, "ws://127.0.0.1:9400/ws");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.member_page, 100);
        assert_eq!(config.task_page, 200);
        assert_eq!(config.max_title_len, 256);
        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn toml_parsing_full() {
        let toml_str = r#"
[store]
url = "wss://board.example.org/ws"
connect_timeout_secs = 3
member_page = 50
task_page = 500

[board]
max_title_len = 80
author_id = "0190f6a4-3c1e-7c3a-9d2b-6f1e2a3b4c5d"

[ui]
poll_timeout_ms = 100

[auth]
admin_password = "hunter2"
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = ClientConfig::resolve(&CliArgs::default(), &file).unwrap();

        assert_eq!(config.store_url, "wss://board.example.org/ws");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.member_page, 50);
        assert_eq!(config.task_page, 500);
        assert_eq!(config.max_title_len, 80);
        assert_eq!(
            config.author_id.map(|id| id.to_string()).as_deref(),
            Some("0190f6a4-3c1e-7c3a-9d2b-6f1e2a3b4c5d")
        );
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
        assert_eq!(config.admin_password.as_deref(), Some("hunter2"));

        let settings = ClientConfig::resolve(&CliArgs::default(), &file)
            .unwrap()
            .board_settings();
        assert_eq!(settings.task_page, 500);
        assert_eq!(settings.max_title_len, 80);
    }

    #[test]
    fn toml_parsing_partial() {
        let toml_str = r"
[store]
task_page = 20
";
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = ClientConfig::resolve(&CliArgs::default(), &file).unwrap();

        assert_eq!(config.task_page, 20);
        // Everything else should be default.
        assert_eq!(config.member_page, 100);
        assert_eq!(config.store_url, "ws://127.0.0.1:9400/ws");
    }

    #[test]
    fn cli_overrides_file() {
        let toml_str = r#"
[store]
url = "ws://file:9400/ws"
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let cli = CliArgs {
            store_url: Some("ws://cli:9400/ws".to_string()),
            offline: true,
            ..Default::default()
        };
        let config = ClientConfig::resolve(&cli, &file).unwrap();

        assert_eq!(config.store_url, "ws://cli:9400/ws");
        assert!(config.offline);
    }

    #[test]
    fn env_password_overrides_file() {
        let file: ConfigFile = toml::from_str("[auth]\nadmin_password = \"file\"\n").unwrap();
        let cli = CliArgs {
            admin_password: Some("env".to_string()),
            ..Default::default()
        };
        let config = ClientConfig::resolve(&cli, &file).unwrap();
        assert_eq!(config.admin_password.as_deref(), Some("env"));
    }

    #[test]
    fn non_websocket_url_is_rejected() {
        let cli = CliArgs {
            store_url: Some("http://localhost:9400/ws".to_string()),
            ..Default::default()
        };
        let result = ClientConfig::resolve(&cli, &ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::InvalidStoreUrl { .. })));

        let cli = CliArgs {
            store_url: Some("not a url".to_string()),
            ..Default::default()
        };
        let result = ClientConfig::resolve(&cli, &ConfigFile::default());
        assert!(matches!(result, Err(ConfigError::InvalidStoreUrl { .. })));
    }

    #[test]
    fn bad_author_is_rejected() {
        let file: ConfigFile = toml::from_str("[board]\nauthor_id = \"ana\"\n").unwrap();
        let result = ClientConfig::resolve(&CliArgs::default(), &file);
        assert!(matches!(result, Err(ConfigError::InvalidAuthor(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        assert!(load_config_file(None).is_ok());
    }

    #[test]
    fn explicit_missing_config_file_returns_error() {
        let result = load_config_file(Some(std::path::Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
