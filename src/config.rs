use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CodeBlue";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key under which the local store keeps the whole queue blob.
pub const QUEUE_STORAGE_KEY: &str = "codeblue_queue_v1";

/// Demo PIN for the nurse lock screen. Cosmetic only.
pub const DEFAULT_NURSE_PIN: &str = "2468";

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);
pub const DEFAULT_POLL_SECS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,codeblue_lib=debug"
}

/// Get the application data directory (~/CodeBlue/).
///
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the local queue database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("queue.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which queue repository backs the kiosk and nurse views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    /// Single keyed blob in a local SQLite file.
    Local,
    /// HTTP backend (`/api/submit`, `/api/queue`, `/api/complete/{id}`).
    Remote,
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidValue {
                var: "CODEBLUE_STORE",
                value: s.to_string(),
            }),
        }
    }
}

/// Runtime configuration, read from `CODEBLUE_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreKind,
    pub api_url: String,
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub poll_interval: Duration,
    pub nurse_pin: String,
    /// Hosts a stream URL may point at. Empty means any http(s) host.
    pub stream_hosts: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Local,
            api_url: DEFAULT_API_URL.to_string(),
            db_path: default_db_path(),
            bind_addr: DEFAULT_BIND_ADDR,
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            nurse_pin: DEFAULT_NURSE_PIN.to_string(),
            stream_hosts: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(store) = lookup("CODEBLUE_STORE") {
            config.store = store.parse()?;
        }
        if let Some(url) = lookup("CODEBLUE_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("CODEBLUE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup("CODEBLUE_BIND") {
            config.bind_addr = bind.parse().map_err(|_| ConfigError::InvalidValue {
                var: "CODEBLUE_BIND",
                value: bind.clone(),
            })?;
        }
        if let Some(secs) = lookup("CODEBLUE_POLL_SECS") {
            let parsed: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                var: "CODEBLUE_POLL_SECS",
                value: secs.clone(),
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "CODEBLUE_POLL_SECS",
                    value: secs,
                });
            }
            config.poll_interval = Duration::from_secs(parsed);
        }
        if let Some(pin) = lookup("CODEBLUE_NURSE_PIN") {
            config.nurse_pin = pin.trim().to_string();
        }
        if let Some(hosts) = lookup("CODEBLUE_STREAM_HOSTS") {
            config.stream_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }

        Ok(config)
    }
}
