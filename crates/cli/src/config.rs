//! Tool configuration loaded from environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tree_sync::DEFAULT_DEBOUNCE_WINDOW;

/// Directory inside the vault for tool-owned state (logs, backups).
/// Leading dot keeps it out of scans, trees, and watch events.
const STATE_DIR: &str = ".para";

#[derive(Debug, Clone)]
pub struct Config {
    /// Vault root directory
    pub vault_path: PathBuf,
    /// Rendered tree document
    pub tree_path: PathBuf,
    /// Activity log directory
    pub log_dir: PathBuf,
    /// Backup destination directory
    pub backup_dir: PathBuf,
    /// Debounce quiet window for the watch
    pub debounce: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PARA_VAULT_PATH`: vault root (supports `~` for home directory)
    ///
    /// Optional:
    /// - `PARA_VAULT_TREE_FILE`: tree document path (relative paths are
    ///   resolved under the vault; default `vault-tree.md`)
    /// - `PARA_VAULT_LOG_DIR`, `PARA_VAULT_BACKUP_DIR`: default
    ///   `<vault>/.para/{logs,backups}`
    /// - `PARA_VAULT_DEBOUNCE_MS`: quiet window in milliseconds
    pub fn from_env() -> Result<Self, ConfigError> {
        let vault = std::env::var("PARA_VAULT_PATH").map_err(|_| ConfigError::MissingVaultPath)?;
        let vault_path = expand_tilde(&vault);
        if !vault_path.is_dir() {
            return Err(ConfigError::VaultNotFound(vault_path));
        }

        let tree_path = resolve_under(
            &vault_path,
            std::env::var("PARA_VAULT_TREE_FILE").as_deref().unwrap_or("vault-tree.md"),
        );
        let log_dir = match std::env::var("PARA_VAULT_LOG_DIR") {
            Ok(dir) => expand_tilde(&dir),
            Err(_) => vault_path.join(STATE_DIR).join("logs"),
        };
        let backup_dir = match std::env::var("PARA_VAULT_BACKUP_DIR") {
            Ok(dir) => expand_tilde(&dir),
            Err(_) => vault_path.join(STATE_DIR).join("backups"),
        };

        let debounce = match std::env::var("PARA_VAULT_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .map_err(|_| ConfigError::InvalidDebounce(raw.clone()))?,
            ),
            Err(_) => DEFAULT_DEBOUNCE_WINDOW,
        };

        Ok(Self {
            vault_path,
            tree_path,
            log_dir,
            backup_dir,
            debounce,
        })
    }
}

/// Expand a leading `~` or `~/` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Resolve a possibly-relative path under the vault root.
fn resolve_under(vault: &Path, value: &str) -> PathBuf {
    let expanded = expand_tilde(value);
    if expanded.is_absolute() {
        expanded
    } else {
        vault.join(expanded)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PARA_VAULT_PATH environment variable not set")]
    MissingVaultPath,

    #[error("vault path does not exist or is not a directory: {0}")]
    VaultNotFound(PathBuf),

    #[error("PARA_VAULT_DEBOUNCE_MS is not a number: {0}")]
    InvalidDebounce(String),
}
