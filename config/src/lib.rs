//! Configuration loading for Provida.
//!
//! Two sources feed the process: the `[env]` table of
//! `$XDG_CONFIG_HOME/<app>/config.toml` and a project `.env`. They are applied
//! with priority **existing env > .env > XDG**. The same file may carry a
//! `[workflow]` table with tuning knobs, returned as a [`WorkflowTable`].

mod dotenv;
mod xdg_toml;

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

pub use xdg_toml::config_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// `[workflow]` table. Every key is optional; absent keys keep the caller's defaults.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct WorkflowTable {
    pub semantic_similarity_threshold: Option<f32>,
    pub max_replans: Option<usize>,
    pub fan_out_concurrency: Option<usize>,
    pub default_search_limit: Option<usize>,
    pub evidence_top_k: Option<usize>,
    pub llm_timeout_secs: Option<u64>,
    pub search_timeout_secs: Option<u64>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub embedding_model: Option<String>,
}

/// Sets env vars from `.env` and the XDG `[env]` table for keys not already set.
///
/// * `app_name`: XDG directory name, e.g. `"provida"`.
/// * `override_dir`: directory holding `.env`; the current directory when `None`.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let keys: HashSet<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }
    Ok(())
}

/// Reads the `[workflow]` table for `app_name`. Missing file yields the empty table.
pub fn load_workflow_table(app_name: &str) -> Result<WorkflowTable, LoadError> {
    match xdg_toml::config_path(app_name)? {
        Some(path) => xdg_toml::workflow_table_from(&path),
        None => Ok(WorkflowTable::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn existing_env_wins_over_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PROVIDA_CFG_TEST_EXISTING=from_dotenv\n").unwrap();
        env::set_var("PROVIDA_CFG_TEST_EXISTING", "from_env");
        load_and_apply("provida-config-test-none", Some(dir.path())).unwrap();
        assert_eq!(env::var("PROVIDA_CFG_TEST_EXISTING").as_deref(), Ok("from_env"));
        env::remove_var("PROVIDA_CFG_TEST_EXISTING");
    }

    #[test]
    fn dotenv_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PROVIDA_CFG_TEST_DOTENV=from_dotenv\n").unwrap();
        env::remove_var("PROVIDA_CFG_TEST_DOTENV");
        load_and_apply("provida-config-test-none", Some(dir.path())).unwrap();
        assert_eq!(env::var("PROVIDA_CFG_TEST_DOTENV").as_deref(), Ok("from_dotenv"));
        env::remove_var("PROVIDA_CFG_TEST_DOTENV");
    }

    #[test]
    fn missing_config_gives_empty_workflow_table() {
        let table = load_workflow_table("provida-config-test-none").unwrap();
        assert_eq!(table, WorkflowTable::default());
    }
}
