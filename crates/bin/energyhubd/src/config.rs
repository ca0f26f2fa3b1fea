//! Daemon configuration.
//!
//! Read from `energyhub.toml` (or the file named by `ENERGYHUB_CONFIG`),
//! then overridden from the environment. The file is optional: a controller
//! with no configuration at all serves HTTP on port 3000 and keeps its
//! database and `energy.conf` in the working directory.
//!
//! Environment overrides are injected as a lookup function so precedence
//! rules stay testable without touching process globals.

use std::path::Path;

use serde::Deserialize;

/// Default config file next to the working directory.
const CONFIG_FILE: &str = "energyhub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Filesystem locations for persistent state.
    pub paths: PathsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulated-household settings.
    pub simulation: SimulationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Where the energy core keeps its durable state.
///
/// `storage` holds `energylogs.sqlite`; `settings` holds `energy.conf`
/// (the chosen root meter). They are distinct on purpose: the archive can
/// live on bulk storage while the settings stay with the controller
/// configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the energy log database.
    pub storage: String,
    /// Directory holding `energy.conf`.
    pub settings: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Simulated household driving the registry when no real devices exist.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Enable the simulated household.
    pub enabled: bool,
    /// Seconds between simulated readings.
    pub interval_secs: u64,
}

impl Config {
    /// Load the configuration file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed, or when the resulting configuration is unusable.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("ENERGYHUB_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
        let mut config = Self::read(Path::new(&file))?;
        config.override_from(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`, falling back to defaults when the file does not exist.
    fn read(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Malformed),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Unreadable {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Apply environment overrides through `var`.
    ///
    /// `ENERGYHUB_BIND` replaces host and port together; a bind value with
    /// an unparsable port is ignored entirely rather than half-applied.
    /// `ENERGYHUB_LOG` wins over `RUST_LOG`.
    fn override_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = var("ENERGYHUB_BIND") {
            if let Some((host, port)) = bind.rsplit_once(':') {
                if let Ok(port) = port.parse() {
                    self.server.host = host.to_string();
                    self.server.port = port;
                }
            }
        }
        if let Some(path) = var("ENERGYHUB_STORAGE_PATH") {
            self.paths.storage = path;
        }
        if let Some(path) = var("ENERGYHUB_SETTINGS_PATH") {
            self.paths.settings = path;
        }
        if let Some(filter) = var("ENERGYHUB_LOG").or_else(|| var("RUST_LOG")) {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0"));
        }
        if self.paths.storage.is_empty() {
            return Err(ConfigError::Invalid("paths.storage must not be empty"));
        }
        if self.paths.settings.is_empty() {
            return Err(ConfigError::Invalid("paths.settings must not be empty"));
        }
        if self.simulation.enabled && self.simulation.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "simulation.interval_secs must not be 0",
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            storage: ".".to_string(),
            settings: ".".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "energyhubd=info,energyhub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read config file {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML.
    #[error("malformed config file")]
    Malformed(#[source] toml::de::Error),
    /// The configuration parsed but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
