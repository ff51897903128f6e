//! Workspace configuration shared by every binary that opens the store.
//!
//! Lookup order for `config.json`: `<root>/.certdash/` first, then
//! `~/.certdash/`. The data directory is `CERTDASH_HOME` when set, else the
//! configured `dataDir` (relative paths hang off the root), else
//! `<root>/.certdash`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".certdash";
pub const CONFIG_FILE: &str = "config.json";
pub const HOME_ENV: &str = "CERTDASH_HOME";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertdashConfig {
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub certification_types: Option<Vec<String>>,
    pub default_workflow: Option<String>,
}

/// Project config, falling back to the one in the user's home directory.
pub fn load_config(root: &Path) -> CertdashConfig {
    load_config_from(root, dirs::home_dir().as_deref())
}

pub fn load_config_from(root: &Path, home: Option<&Path>) -> CertdashConfig {
    let project = root.join(CONFIG_DIR).join(CONFIG_FILE);
    let path = if project.exists() {
        Some(project)
    } else {
        home.map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    };
    path.and_then(|path| read_config(&path)).unwrap_or_default()
}

pub fn read_config(path: &Path) -> Option<CertdashConfig> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<CertdashConfig>(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable config");
            None
        }
    }
}

/// Data directory for this process, honouring `CERTDASH_HOME`.
pub fn resolve_data_dir(root: &Path, config: &CertdashConfig) -> PathBuf {
    let home = std::env::var(HOME_ENV).ok();
    resolve_data_dir_with(root, config, home.as_deref())
}

pub fn resolve_data_dir_with(
    root: &Path,
    config: &CertdashConfig,
    home_override: Option<&str>,
) -> PathBuf {
    if let Some(home) = home_override.filter(|home| !home.trim().is_empty()) {
        return PathBuf::from(home);
    }
    match &config.data_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => root.join(dir),
        None => root.join(CONFIG_DIR),
    }
}
