//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database and the archive directory of
//! uploaded network files. Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "NETARCHIVE_ROOT";

/// Environment variable naming the listen address
pub const BIND_ENV: &str = "NETARCHIVE_BIND";

/// Listen address used when nothing else is configured
pub const DEFAULT_BIND: &str = "127.0.0.1:5740";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "netarchive.db";

/// Archive directory name inside the root folder
pub const ARCHIVE_DIR: &str = "networks";

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
}

impl TomlConfig {
    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load the platform config file, if one exists and parses
    pub fn load() -> Option<Self> {
        let path = config_file_path().ok()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match Self::parse(&content) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring config file: {}", e);
                None
            }
        }
    }
}

/// Resolve the root folder from CLI argument, environment and config file
pub fn resolve_root_folder(cli_arg: Option<&Path>) -> PathBuf {
    let env_value = std::env::var(ROOT_FOLDER_ENV).ok();
    let toml = TomlConfig::load();
    root_folder_from(cli_arg, env_value.as_deref(), toml.as_ref())
}

/// Resolve the listen address from CLI argument, environment and config file
pub fn resolve_bind_address(cli_arg: Option<&str>) -> String {
    let env_value = std::env::var(BIND_ENV).ok();
    let toml = TomlConfig::load();
    bind_address_from(cli_arg, env_value.as_deref(), toml.as_ref())
}

fn root_folder_from(
    cli_arg: Option<&Path>,
    env_value: Option<&str>,
    toml: Option<&TomlConfig>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Some(path) = env_value.filter(|v| !v.is_empty()) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = toml.and_then(|c| c.root_folder.clone()) {
        return path;
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

fn bind_address_from(
    cli_arg: Option<&str>,
    env_value: Option<&str>,
    toml: Option<&TomlConfig>,
) -> String {
    cli_arg
        .map(str::to_string)
        .or_else(|| env_value.filter(|v| !v.is_empty()).map(str::to_string))
        .or_else(|| toml.and_then(|c| c.bind.clone()))
        .unwrap_or_else(|| DEFAULT_BIND.to_string())
}

/// Get configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/netarchive/config.toml first, then /etc/netarchive/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("netarchive").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/netarchive/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("netarchive").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("netarchive"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/netarchive"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("netarchive"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\netarchive"))
    } else {
        dirs::data_dir()
            .map(|d| d.join("netarchive"))
            .unwrap_or_else(|| PathBuf::from("./netarchive_data"))
    }
}

/// Creates the root folder layout and names the paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder and archive directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(self.archive_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }
}
