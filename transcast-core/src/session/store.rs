use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

use crate::job::JobId;
use crate::sqlite::configure_connection;

const SESSION_SCHEMA: &str = include_str!("../../../sql/session.sql");
const CURRENT_JOB_KEY: &str = "current_job_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to open database at {path}: {source}")]
    OpenDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store path not configured")]
    MissingStore,
    #[error("stored job id `{0}` is invalid")]
    CorruptJobId(String),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The single persisted "current job" slot.
pub trait JobStateStore: Send + Sync {
    fn load(&self) -> StoreResult<Option<JobId>>;
    fn save(&self, job_id: &JobId) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    slot: Mutex<Option<JobId>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(job_id: JobId) -> Self {
        Self {
            slot: Mutex::new(Some(job_id)),
        }
    }
}

impl JobStateStore for MemoryJobStore {
    fn load(&self) -> StoreResult<Option<JobId>> {
        Ok(self.slot.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save(&self, job_id: &JobId) -> StoreResult<()> {
        *self.slot.lock().map_err(|_| StoreError::Poisoned)? = Some(job_id.clone());
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        *self.slot.lock().map_err(|_| StoreError::Poisoned)? = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteJobStoreBuilder {
    path: Option<PathBuf>,
    create_if_missing: bool,
}

impl Default for SqliteJobStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            create_if_missing: true,
        }
    }
}

impl SqliteJobStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> StoreResult<SqliteJobStore> {
        let path = self.path.ok_or(StoreError::MissingStore)?;
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let store = SqliteJobStore { path, flags };
        store.initialize()?;
        Ok(store)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    path: PathBuf,
    flags: OpenFlags,
}

impl SqliteJobStore {
    pub fn builder() -> SqliteJobStoreBuilder {
        SqliteJobStoreBuilder::new()
    }

    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        SqliteJobStoreBuilder::new().path(path).build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
            StoreError::OpenDatabase {
                path: self.path.clone(),
                source,
            }
        })?;
        configure_connection(&conn).map_err(|source| StoreError::OpenDatabase {
            path: self.path.clone(),
            source,
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute_batch(SESSION_SCHEMA)?;
        Ok(())
    }
}

impl JobStateStore for SqliteJobStore {
    fn load(&self) -> StoreResult<Option<JobId>> {
        let conn = self.open()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![CURRENT_JOB_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|raw| JobId::parse(&raw).map_err(|_| StoreError::CorruptJobId(raw)))
            .transpose()
    }

    fn save(&self, job_id: &JobId) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO session_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![CURRENT_JOB_KEY, job_id.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute(
            "DELETE FROM session_state WHERE key = ?1",
            params![CURRENT_JOB_KEY],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sqlite_slot_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteJobStore::new(dir.path().join("state/session.sqlite")).unwrap();
        assert_eq!(store.load().unwrap(), None);

        let first = JobId::parse("job_1_aaaaaaaaa").unwrap();
        let second = JobId::parse("job_2_bbbbbbbbb").unwrap();
        store.save(&first).unwrap();
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap(), Some(second));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn slot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.sqlite");
        let id = JobId::parse("job_3_ccccccccc").unwrap();
        SqliteJobStore::new(&path).unwrap().save(&id).unwrap();

        let reopened = SqliteJobStore::builder()
            .path(&path)
            .create_if_missing(false)
            .build()
            .unwrap();
        assert_eq!(reopened.load().unwrap(), Some(id));
    }

    #[test]
    fn missing_database_is_not_created_on_request() {
        let dir = tempdir().unwrap();
        let result = SqliteJobStore::builder()
            .path(dir.path().join("absent.sqlite"))
            .create_if_missing(false)
            .build();
        assert!(matches!(result, Err(StoreError::OpenDatabase { .. })));
    }

    #[test]
    fn builder_requires_path() {
        assert!(matches!(
            SqliteJobStoreBuilder::new().build(),
            Err(StoreError::MissingStore)
        ));
    }

    #[test]
    fn memory_store_holds_one_job() {
        let store = MemoryJobStore::new();
        let id = JobId::parse("job_4_ddddddddd").unwrap();
        store.save(&id).unwrap();
        assert_eq!(store.load().unwrap(), Some(id));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
