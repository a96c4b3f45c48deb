//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Number of events the history view shows by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 300;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Events shown by `history` when no `--limit` is given.
    pub history_limit: usize,

    /// Directory for exports without an explicit `--output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("babylog.db"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            export_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default locations, then `config_path` if
    /// given, then `BABYLOG_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BABYLOG_*)
        figment = figment.merge(Env::prefixed("BABYLOG_"));

        figment.extract()
    }

    /// Where an export lands when no output path is given.
    pub fn export_path(&self, file_name: &str) -> PathBuf {
        self.export_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(file_name)
    }
}

/// Returns the platform-specific config directory for babylog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("babylog"))
}

/// Returns the platform-specific data directory for babylog.
///
/// On Linux: `~/.local/share/babylog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("babylog"))
}
