// Task store: SQLite cache over the JSONL journal

use crate::clock::{Clock, SystemClock};
use crate::journal;
use crate::preferences::Preferences;
use crate::query::TaskFilter;
use crate::task::{Importance, NO_ID, Task};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;
const JOURNAL_FILE: &str = "tasks.jsonl";
const PREFERENCES_FILE: &str = "preferences.yaml";

/// Persistence gateway for task records.
///
/// The journal is the source of truth; the SQLite database is a queryable
/// cache rebuilt from the journal whenever it goes stale.
pub struct Store {
    base_path: PathBuf,
    db: Connection,
    clock: Arc<dyn Clock>,
    preferences: Preferences,
}

impl Store {
    /// Open or create a store at the given path, reading time from the
    /// system clock.
    ///
    /// The store lives in a `.todostore` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open or create a store with an injected clock. Tests pass a
    /// `FixedClock` here to pin creation/modification stamps.
    pub fn open_with_clock<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let base_path = path.as_ref().join(".todostore");

        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("todostore.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let preferences = Preferences::load(base_path.join(PREFERENCES_FILE))?;

        let mut store = Self {
            base_path,
            db,
            clock,
            preferences,
        };

        store.create_schema()?;
        store.create_gitignore()?;
        store.write_version()?;

        if store.is_stale()? {
            info!("Database is stale, syncing from journal");
            store.sync()?;
        }

        Ok(store)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Defaults currently applied to unset fields on save
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Replace the defaults and persist them next to the database
    pub fn set_preferences(&mut self, preferences: Preferences) -> Result<()> {
        preferences.save(self.base_path.join(PREFERENCES_FILE))?;
        self.preferences = preferences;
        Ok(())
    }

    fn journal_path(&self) -> PathBuf {
        self.base_path.join(JOURNAL_FILE)
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT NOT NULL,
                title TEXT NOT NULL,
                importance INTEGER NOT NULL,
                due_date INTEGER NOT NULL,
                hide_until INTEGER NOT NULL,
                creation_date INTEGER NOT NULL,
                completion_date INTEGER NOT NULL,
                modification_date INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_completion ON tasks(completion_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_modified ON tasks(modification_date);

            -- Sync metadata for staleness detection
            CREATE TABLE IF NOT EXISTS sync_metadata (
                journal TEXT PRIMARY KEY,
                last_sync_time INTEGER NOT NULL,
                file_mtime INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Create .gitignore file
    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(
                gitignore_path,
                "todostore.db\ntodostore.db-shm\ntodostore.db-wal\n",
            )?;
        }
        Ok(())
    }

    /// Write version file
    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    /// Check if the database needs syncing from the journal.
    ///
    /// Returns true if the journal has been modified since the last sync,
    /// or exists but has never been synced.
    pub fn is_stale(&self) -> Result<bool> {
        let journal_path = self.journal_path();
        if !journal_path.exists() {
            return Ok(false);
        }

        let metadata = fs::metadata(&journal_path)?;
        let file_mtime = metadata
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let stored_mtime: Option<i64> = self
            .db
            .query_row(
                "SELECT file_mtime FROM sync_metadata WHERE journal = ?1",
                [JOURNAL_FILE],
                |row| row.get(0),
            )
            .optional()?;

        match stored_mtime {
            None => Ok(true),
            Some(mtime) => Ok(file_mtime > mtime),
        }
    }

    // ========================================================================
    // Save / fetch
    // ========================================================================

    /// Save a task, mutating it in place.
    ///
    /// Assigns an id if the task has never been saved, stamps the creation
    /// date from the clock if unset (exactly once; later saves never touch
    /// it), populates every remaining unset field from the default-value
    /// mapping, and persists all fields. Returns the task's id.
    pub fn save(&mut self, task: &mut Task) -> Result<i64> {
        let now = self.clock.now_ms();
        task.modification_date = now;

        if task.creation_date.is_none() {
            task.creation_date = Some(now);
        }
        if task.uuid.is_empty() {
            task.uuid = uuid::Uuid::now_v7().to_string();
        }

        let defaults = Task::default_values(&self.preferences);
        task.apply_defaults(&defaults);

        let tx = self.db.transaction()?;

        if task.id == NO_ID {
            tx.execute(
                "INSERT INTO tasks (uuid, title, importance, due_date, hide_until,
                                    creation_date, completion_date, modification_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    task.uuid,
                    task.title.as_deref().unwrap_or(""),
                    task.importance.unwrap_or(Importance::None).as_i64(),
                    task.due_date.unwrap_or(0),
                    task.hide_until.unwrap_or(0),
                    task.creation_date.unwrap_or(0),
                    task.completion_date.unwrap_or(0),
                    task.modification_date,
                ],
            )?;
            task.id = tx.last_insert_rowid();
            debug!(id = task.id, "Assigned id to new task");
        } else {
            tx.execute(
                "INSERT OR REPLACE INTO tasks (id, uuid, title, importance, due_date,
                                               hide_until, creation_date, completion_date,
                                               modification_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    task.id,
                    task.uuid,
                    task.title.as_deref().unwrap_or(""),
                    task.importance.unwrap_or(Importance::None).as_i64(),
                    task.due_date.unwrap_or(0),
                    task.hide_until.unwrap_or(0),
                    task.creation_date.unwrap_or(0),
                    task.completion_date.unwrap_or(0),
                    task.modification_date,
                ],
            )?;
        }

        tx.commit()?;

        journal::append_task(&self.journal_path(), task)?;
        self.record_sync_time()?;

        Ok(task.id)
    }

    /// Fetch a task by id. An unknown id yields `Ok(None)`.
    pub fn fetch(&self, id: i64) -> Result<Option<Task>> {
        let mut stmt = self.db.prepare(
            "SELECT id, uuid, title, importance, due_date, hide_until,
                    creation_date, completion_date, modification_date
             FROM tasks WHERE id = ?1",
        )?;

        let task = stmt
            .query_row([id], Self::row_to_task)
            .optional()
            .context("Failed to fetch task")?;

        Ok(task)
    }

    /// Mark a task completed, stamping the completion date from the clock.
    /// Returns the updated task, or `None` for an unknown id.
    pub fn complete(&mut self, id: i64) -> Result<Option<Task>> {
        let Some(mut task) = self.fetch(id)? else {
            return Ok(None);
        };
        task.completion_date = Some(self.clock.now_ms());
        self.save(&mut task)?;
        Ok(Some(task))
    }

    /// Clear a task's completion date. Returns the updated task, or `None`
    /// for an unknown id.
    pub fn reopen(&mut self, id: i64) -> Result<Option<Task>> {
        let Some(mut task) = self.fetch(id)? else {
            return Ok(None);
        };
        task.completion_date = Some(0);
        self.save(&mut task)?;
        Ok(Some(task))
    }

    /// Delete a task: tombstone in the journal, row removed from the cache
    pub fn delete(&mut self, id: i64) -> Result<()> {
        journal::append_tombstone(&self.journal_path(), id, self.clock.now_ms())?;

        self.db.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        self.record_sync_time()?;

        Ok(())
    }

    /// List tasks matching every given filter, most recently modified first
    pub fn list(&self, filters: &[TaskFilter]) -> Result<Vec<Task>> {
        let mut query = String::from(
            "SELECT id, uuid, title, importance, due_date, hide_until,
                    creation_date, completion_date, modification_date
             FROM tasks",
        );

        let mut params: Vec<i64> = Vec::new();
        for (i, filter) in filters.iter().enumerate() {
            query.push_str(if i == 0 { " WHERE " } else { " AND " });
            let (clause, mut clause_params) = filter.to_sql();
            query.push_str(clause);
            params.append(&mut clause_params);
        }

        query.push_str(" ORDER BY modification_date DESC");

        let mut stmt = self.db.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), Self::row_to_task)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            uuid: row.get(1)?,
            title: Some(row.get(2)?),
            importance: Some(Importance::from_i64(row.get(3)?)),
            due_date: Some(row.get(4)?),
            hide_until: Some(row.get(5)?),
            creation_date: Some(row.get(6)?),
            completion_date: Some(row.get(7)?),
            modification_date: row.get(8)?,
        })
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Rebuild the SQLite cache from the journal.
    ///
    /// Tombstoned ids are dropped; entries that no longer parse as tasks are
    /// skipped with a warning.
    pub fn sync(&mut self) -> Result<()> {
        info!("Syncing database from journal");

        let entries = journal::read_latest(&self.journal_path())?;

        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;

        for (id, entry) in entries {
            if journal::is_tombstone(&entry) {
                continue;
            }

            let task: Task = match serde_json::from_value(entry) {
                Ok(t) => t,
                Err(e) => {
                    warn!(id, error = ?e, "Skipping journal entry that doesn't parse as a task");
                    continue;
                }
            };

            tx.execute(
                "INSERT OR REPLACE INTO tasks (id, uuid, title, importance, due_date,
                                               hide_until, creation_date, completion_date,
                                               modification_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    task.id,
                    task.uuid,
                    task.title.as_deref().unwrap_or(""),
                    task.importance.unwrap_or(Importance::None).as_i64(),
                    task.due_date.unwrap_or(0),
                    task.hide_until.unwrap_or(0),
                    task.creation_date.unwrap_or(0),
                    task.completion_date.unwrap_or(0),
                    task.modification_date,
                ],
            )?;
        }

        tx.commit()?;
        self.record_sync_time()?;

        info!("Sync complete");
        Ok(())
    }

    /// Record the journal's current mtime so `is_stale` stays quiet until
    /// some other process appends to it.
    fn record_sync_time(&self) -> Result<()> {
        let journal_path = self.journal_path();
        if !journal_path.exists() {
            return Ok(());
        }

        let file_mtime = fs::metadata(&journal_path)?
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        self.db.execute(
            "INSERT OR REPLACE INTO sync_metadata (journal, last_sync_time, file_mtime)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![JOURNAL_FILE, self.clock.now_ms(), file_mtime],
        )?;

        Ok(())
    }
}
