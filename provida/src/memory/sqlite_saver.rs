//! SQLite-backed checkpointer (SqliteSaver). Survives process restarts, so a
//! crashed run can be resumed from its last completed node.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource,
};
use crate::memory::checkpointer::{keep_newest, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn millis(t: &Option<SystemTime>) -> Option<i64> {
    t.as_ref()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
}

fn from_millis(v: Option<i64>) -> Option<SystemTime> {
    v.and_then(|ms| UNIX_EPOCH.checked_add(Duration::from_millis(ms as u64)))
}

/// Metadata columns shared by `get_tuple` and `list`, in this order.
const METADATA_COLUMNS: &str =
    "checkpoint_id, metadata_source, metadata_step, completed_node, next_node, metadata_created_at";

fn metadata_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, CheckpointMetadata)> {
    Ok((
        row.get(0)?,
        CheckpointMetadata {
            source: CheckpointSource::parse(&row.get::<_, String>(1)?),
            step: row.get::<_, i64>(2)? as u64,
            completed_node: row.get(3)?,
            next_node: row.get(4)?,
            created_at: from_millis(row.get(5)?),
        },
    ))
}

/// SQLite-backed checkpointer. Key: (thread_id, checkpoint_ns, checkpoint_id);
/// insertion order (`seq`) defines "latest".
///
/// Each call opens its own connection inside `spawn_blocking`.
///
/// **Interaction**: used as `Arc<dyn Checkpointer<S>>` in `StateGraph::compile_with_checkpointer`.
pub struct SqliteSaver<S> {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer<S>>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                payload BLOB NOT NULL,
                metadata_source TEXT NOT NULL,
                metadata_step INTEGER NOT NULL,
                completed_node TEXT,
                next_node TEXT,
                metadata_created_at INTEGER,
                UNIQUE (thread_id, checkpoint_ns, checkpoint_id)
            )
            "#,
            [],
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            serializer,
        })
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let payload = self.serializer.serialize(&checkpoint.state)?;
        let meta = checkpoint.metadata.clone();
        let id = checkpoint.id.clone();
        let ts = checkpoint.ts.clone();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            conn.execute(
                r#"
                INSERT OR REPLACE INTO checkpoints
                (thread_id, checkpoint_ns, checkpoint_id, ts, payload, metadata_source,
                 metadata_step, completed_node, next_node, metadata_created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    thread_id,
                    checkpoint_ns,
                    id,
                    ts,
                    payload,
                    meta.source.as_str(),
                    meta.step as i64,
                    meta.completed_node,
                    meta.next_node,
                    millis(&meta.created_at),
                ],
            )
            .map_err(storage)?;
            Ok::<String, CheckpointError>(id)
        })
        .await
        .map_err(storage)?
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let want_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        type Row = (String, CheckpointMetadata, String, Vec<u8>);
        let row: Option<Row> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
                let (id, metadata) = metadata_from_row(row)?;
                Ok((id, metadata, row.get(6)?, row.get(7)?))
            };
            let row = match want_id {
                Some(cid) => conn
                    .query_row(
                        &format!(
                            "SELECT {METADATA_COLUMNS}, ts, payload FROM checkpoints
                             WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3"
                        ),
                        params![thread_id, checkpoint_ns, cid],
                        map_row,
                    )
                    .optional(),
                None => conn
                    .query_row(
                        &format!(
                            "SELECT {METADATA_COLUMNS}, ts, payload FROM checkpoints
                             WHERE thread_id = ?1 AND checkpoint_ns = ?2
                             ORDER BY seq DESC LIMIT 1"
                        ),
                        params![thread_id, checkpoint_ns],
                        map_row,
                    )
                    .optional(),
            };
            row.map_err(storage)
        })
        .await
        .map_err(storage)??;

        let Some((id, metadata, ts, payload)) = row else {
            return Ok(None);
        };
        Ok(Some(Checkpoint {
            id,
            ts,
            state: self.serializer.deserialize(&payload)?,
            metadata,
        }))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();

        let items = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {METADATA_COLUMNS} FROM checkpoints
                     WHERE thread_id = ?1 AND checkpoint_ns = ?2 ORDER BY seq ASC"
                ))
                .map_err(storage)?;
            let rows = stmt
                .query_map(params![thread_id, checkpoint_ns], |row| {
                    metadata_from_row(row).map(|(checkpoint_id, metadata)| CheckpointListItem {
                        checkpoint_id,
                        metadata,
                    })
                })
                .map_err(storage)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage)
        })
        .await
        .map_err(storage)??;

        Ok(keep_newest(items, limit))
    }
}
