//! Reads `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table and the `[workflow]` table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{LoadError, WorkflowTable};

/// `$XDG_CONFIG_HOME` when set, else the platform config dir from `dirs`.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into()))
}

/// Path of the app's `config.toml`, or `None` when the file does not exist.
pub fn config_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let path = config_home()?.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    workflow: WorkflowTable,
}

fn read_file(path: &Path) -> Result<ConfigFile, LoadError> {
    let content = std::fs::read_to_string(path).map_err(LoadError::XdgRead)?;
    Ok(toml::from_str(&content)?)
}

/// `[env]` pairs from the given file.
pub fn env_map_from(path: &Path) -> Result<HashMap<String, String>, LoadError> {
    read_file(path).map(|f| f.env)
}

/// `[workflow]` table from the given file; a missing table yields all-`None`.
pub fn workflow_table_from(path: &Path) -> Result<WorkflowTable, LoadError> {
    read_file(path).map(|f| f.workflow)
}

/// `[env]` pairs for `app_name`. Missing file or section returns an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    match config_path(app_name)? {
        Some(path) => env_map_from(&path),
        None => Ok(HashMap::new()),
    }
}
