//! Configuration loading for livekml-server.
//!
//! Configuration is loaded from a TOML file (default: `livekml.toml`).
//! Every section and every field is optional.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use livekml_core::{CoordinatorConfig, DEFAULT_OP_LIMIT};
use livekml_kml::LinkControl;
use serde::Deserialize;
use uuid::Uuid;

/// Root configuration for livekml-server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener and public address.
    pub server: ServerConfig,
    /// Synchronization engine settings.
    pub sync: SyncConfig,
    /// The root Container of the served scene.
    pub scene: SceneConfig,
    /// HTTP endpoint behaviour.
    pub http: HttpConfig,
    /// Extra `<NetworkLinkControl>` elements sent with every update.
    pub link: LinkControl,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (default: 127.0.0.1:5000).
    pub bind_address: String,
    /// Base URL viewers use to reach this server (default:
    /// http://localhost:5000). Written into the loader and every update.
    pub public_url: String,
}

/// Synchronization engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum operations per update (default: 100, 0 = unbounded).
    pub op_limit: usize,
    /// Check the tree for duplicate ids before every cycle (default: false).
    pub validate_structure: bool,
}

/// Root Container settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// `<name>` of the root Container (default: Root).
    pub name: String,
    /// Element tag of the root Container (default: Document).
    pub container_tag: String,
    /// Fixed id for the root Container. With a fixed id a viewer can keep
    /// its loaded scene across server restarts.
    pub root_id: Option<Uuid>,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Seconds between viewer polls, written into the loader (default: 0.5).
    pub refresh_interval_secs: f64,
    /// Enable metrics endpoint (default: true).
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            public_url: "http://localhost:5000".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            op_limit: DEFAULT_OP_LIMIT,
            validate_structure: false,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "Root".to_string(),
            container_tag: "Document".to_string(),
            root_id: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0.5,
            metrics_enabled: true,
        }
    }
}

impl SyncConfig {
    /// Engine settings for the coordinator.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            op_limit: NonZeroUsize::new(self.op_limit),
            validate_structure: self.validate_structure,
        }
    }
}

impl ServerConfig {
    fn href(&self, file: &str) -> String {
        format!("{}/{file}", self.public_url.trim_end_matches('/'))
    }

    /// Public URL of the loader document.
    pub fn loader_href(&self) -> String {
        self.href("loader.kml")
    }

    /// Public URL of the elements document.
    pub fn elements_href(&self) -> String {
        self.href("elements.kml")
    }

    /// Public URL of the update document.
    pub fn update_href(&self) -> String {
        self.href("update.kml")
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
