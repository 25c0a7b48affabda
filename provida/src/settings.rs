//! Workflow tuning knobs.
//!
//! Resolution order, later wins: built-in defaults, the `[workflow]` table of
//! `$XDG_CONFIG_HOME/<app>/config.toml`, then `PROVIDA_*` environment
//! variables (e.g. `PROVIDA_MAX_REPLANS=5`).

use std::sync::Arc;
use std::time::Duration;

use env_config::WorkflowTable;

use crate::knowledge::DEFAULT_SIMILARITY_THRESHOLD;
use crate::vector::{Embedder, HashEmbedder, OpenAIEmbedder};

/// Settings shared by both workflows.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub semantic_similarity_threshold: f32,
    /// Replanning loops allowed before the therapeutic workflow gives up.
    pub max_replans: usize,
    pub fan_out_concurrency: usize,
    /// Research questions searched when the caller gives no limit.
    pub default_search_limit: usize,
    /// Knowledge-base passages cited by the planning node.
    pub evidence_top_k: usize,
    pub llm_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// OpenAI embedding model for the vector store; the offline hash embedder when `None`.
    pub embedding_model: Option<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            semantic_similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_replans: 3,
            fan_out_concurrency: 4,
            default_search_limit: 5,
            evidence_top_k: 3,
            llm_timeout_secs: 60,
            search_timeout_secs: 30,
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(vars: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = vars(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

impl WorkflowSettings {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// `OpenAIEmbedder` for the configured model, else `HashEmbedder`.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        match &self.embedding_model {
            Some(model) => Arc::new(OpenAIEmbedder::new(model.clone())),
            None => Arc::new(HashEmbedder::default()),
        }
    }

    /// Overlays every key present in `table`.
    pub fn apply_table(mut self, table: &WorkflowTable) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(v) = table.$field { self.$field = v; })*
            };
        }
        overlay!(
            semantic_similarity_threshold,
            max_replans,
            fan_out_concurrency,
            default_search_limit,
            evidence_top_k,
            llm_timeout_secs,
            search_timeout_secs,
            chunk_size,
            chunk_overlap
        );
        if let Some(model) = &table.embedding_model {
            self.embedding_model = Some(model.clone());
        }
        self
    }

    /// Overlays `PROVIDA_<FIELD>` values returned by `vars`; unparsable values are ignored.
    pub fn apply_env_with(mut self, vars: impl Fn(&str) -> Option<String>) -> Self {
        macro_rules! overlay {
            ($($field:ident => $key:literal),*) => {
                $(if let Some(v) = env_parse(&vars, $key) { self.$field = v; })*
            };
        }
        overlay!(
            semantic_similarity_threshold => "PROVIDA_SEMANTIC_SIMILARITY_THRESHOLD",
            max_replans => "PROVIDA_MAX_REPLANS",
            fan_out_concurrency => "PROVIDA_FAN_OUT_CONCURRENCY",
            default_search_limit => "PROVIDA_DEFAULT_SEARCH_LIMIT",
            evidence_top_k => "PROVIDA_EVIDENCE_TOP_K",
            llm_timeout_secs => "PROVIDA_LLM_TIMEOUT_SECS",
            search_timeout_secs => "PROVIDA_SEARCH_TIMEOUT_SECS",
            chunk_size => "PROVIDA_CHUNK_SIZE",
            chunk_overlap => "PROVIDA_CHUNK_OVERLAP"
        );
        if let Some(model) = vars("PROVIDA_EMBEDDING_MODEL").filter(|m| !m.trim().is_empty()) {
            self.embedding_model = Some(model.trim().to_string());
        }
        self
    }

    /// Defaults, then the app's `[workflow]` table, then the process env.
    pub fn load(app_name: &str) -> Result<Self, env_config::LoadError> {
        let table = env_config::load_workflow_table(app_name)?;
        Ok(Self::default()
            .apply_table(&table)
            .apply_env_with(|key| std::env::var(key).ok()))
    }
}
