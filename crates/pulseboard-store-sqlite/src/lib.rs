//! SQLite persistence for the dashboard stores: activities, scheduled tasks,
//! and the content index. Each store gets a base table plus an
//! external-content FTS5 table kept in sync by triggers.

use std::path::Path;

use pulseboard_core::{
    Activity, ActivityId, ActivityMetadata, ActivityPage, ActivityStatus, ContentId, ContentPatch,
    DashboardError, IndexedContent, ScheduledTask, TaskId, TaskMetadata, TaskPatch, TaskStatus,
    now_epoch_ms, DEFAULT_PAGE_LIMIT,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS activities (
  id TEXT PRIMARY KEY,
  timestamp INTEGER NOT NULL,
  action_type TEXT NOT NULL,
  description TEXT NOT NULL,
  status TEXT NOT NULL CHECK (status IN ('success','failed','pending')),
  metadata_json TEXT
);

CREATE TABLE IF NOT EXISTS scheduled_tasks (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT,
  start_time INTEGER NOT NULL,
  end_time INTEGER,
  task_type TEXT NOT NULL,
  status TEXT NOT NULL CHECK (status IN ('scheduled','completed','cancelled')),
  color TEXT,
  metadata_json TEXT
);

CREATE TABLE IF NOT EXISTS content_index (
  id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  content TEXT NOT NULL,
  content_type TEXT NOT NULL,
  source_path TEXT,
  timestamp INTEGER NOT NULL,
  preview TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activities_timestamp ON activities(timestamp DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_activities_action_type ON activities(action_type, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_start_time ON scheduled_tasks(start_time, id);
CREATE INDEX IF NOT EXISTS idx_tasks_task_type ON scheduled_tasks(task_type);
CREATE INDEX IF NOT EXISTS idx_content_content_type ON content_index(content_type);
CREATE INDEX IF NOT EXISTS idx_content_timestamp ON content_index(timestamp DESC);

CREATE VIRTUAL TABLE IF NOT EXISTS activities_fts USING fts5(
  description,
  content='activities',
  tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS activities_fts_ai AFTER INSERT ON activities BEGIN
  INSERT INTO activities_fts(rowid, description) VALUES (new.rowid, new.description);
END;
CREATE TRIGGER IF NOT EXISTS activities_fts_ad AFTER DELETE ON activities BEGIN
  INSERT INTO activities_fts(activities_fts, rowid, description)
  VALUES ('delete', old.rowid, old.description);
END;
CREATE TRIGGER IF NOT EXISTS activities_fts_au AFTER UPDATE ON activities BEGIN
  INSERT INTO activities_fts(activities_fts, rowid, description)
  VALUES ('delete', old.rowid, old.description);
  INSERT INTO activities_fts(rowid, description) VALUES (new.rowid, new.description);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS tasks_fts USING fts5(
  title,
  content='scheduled_tasks',
  tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS tasks_fts_ai AFTER INSERT ON scheduled_tasks BEGIN
  INSERT INTO tasks_fts(rowid, title) VALUES (new.rowid, new.title);
END;
CREATE TRIGGER IF NOT EXISTS tasks_fts_ad AFTER DELETE ON scheduled_tasks BEGIN
  INSERT INTO tasks_fts(tasks_fts, rowid, title) VALUES ('delete', old.rowid, old.title);
END;
CREATE TRIGGER IF NOT EXISTS tasks_fts_au AFTER UPDATE ON scheduled_tasks BEGIN
  INSERT INTO tasks_fts(tasks_fts, rowid, title) VALUES ('delete', old.rowid, old.title);
  INSERT INTO tasks_fts(rowid, title) VALUES (new.rowid, new.title);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS content_fts USING fts5(
  content,
  content='content_index',
  tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS content_fts_ai AFTER INSERT ON content_index BEGIN
  INSERT INTO content_fts(rowid, content) VALUES (new.rowid, new.content);
END;
CREATE TRIGGER IF NOT EXISTS content_fts_ad AFTER DELETE ON content_index BEGIN
  INSERT INTO content_fts(content_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
END;
CREATE TRIGGER IF NOT EXISTS content_fts_au AFTER UPDATE ON content_index BEGIN
  INSERT INTO content_fts(content_fts, rowid, content) VALUES ('delete', old.rowid, old.content);
  INSERT INTO content_fts(rowid, content) VALUES (new.rowid, new.content);
END;
";

/// Current and target schema versions plus the migrations still to run.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

/// Row counts removed by [`SqliteStore::clear_all`].
#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq)]
pub struct ClearCounts {
    pub activities: usize,
    pub tasks: usize,
    pub documents: usize,
}

/// Filters shared by the activity list and search queries.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilters {
    pub action_type: Option<String>,
    pub status: Option<ActivityStatus>,
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and configure connection
    /// pragmas. Does not run migrations.
    ///
    /// # Errors
    /// Returns [`DashboardError::Unavailable`] when the file cannot be opened
    /// and [`DashboardError::Storage`] for other sqlite failures.
    pub fn open(path: &Path) -> Result<Self, DashboardError> {
        let conn = Connection::open(path)
            .map_err(|err| classify(&format!("open database at {}", path.display()), &err))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|err| classify("configure sqlite pragmas", &err))?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus, DashboardError> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .map_err(|err| classify("apply schema_migrations table", &err))?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest schema version.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or a migration step fails.
    pub fn migrate(&mut self) -> Result<(), DashboardError> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .map_err(|err| classify("apply schema_migrations table", &err))?;

        let version = current_schema_version(&self.conn)?;

        if version < 1 {
            let tx = self
                .conn
                .transaction()
                .map_err(|err| classify("start migration v1 transaction", &err))?;
            tx.execute_batch(MIGRATION_001_SQL)
                .map_err(|err| classify("apply migration v1", &err))?;
            record_schema_version(&tx, 1)?;
            tx.commit().map_err(|err| classify("commit migration v1", &err))?;
        } else if version > LATEST_SCHEMA_VERSION {
            return Err(DashboardError::Storage(format!(
                "unsupported schema version {version}; expected at most {LATEST_SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    // --- activities ---

    /// # Errors
    /// Returns [`DashboardError::Storage`] when the insert fails.
    pub fn insert_activity(&self, activity: &Activity) -> Result<(), DashboardError> {
        let metadata_json = encode_json(activity.metadata.as_ref())?;
        self.conn
            .execute(
                "INSERT INTO activities (id, timestamp, action_type, description, status, metadata_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    activity.id.to_string(),
                    activity.timestamp,
                    activity.action_type,
                    activity.description,
                    activity.status.as_str(),
                    metadata_json,
                ],
            )
            .map_err(|err| classify("insert activity", &err))?;
        tracing::debug!(id = %activity.id, action_type = %activity.action_type, "activity inserted");
        Ok(())
    }

    /// Page through activities newest-first, with both filters combined.
    ///
    /// Fetches `limit + 1` rows: `has_more` is set when the extra row exists
    /// and `next_cursor` is the id of the last returned activity. A supplied
    /// cursor resumes strictly after that row.
    ///
    /// # Errors
    /// Returns [`DashboardError::InvalidArgument`] for a zero limit or an
    /// unknown cursor id, and a storage error kind otherwise.
    pub fn list_activities(
        &self,
        filters: &ActivityFilters,
        cursor: Option<&ActivityId>,
        limit: Option<usize>,
    ) -> Result<ActivityPage, DashboardError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 {
            return Err(DashboardError::InvalidArgument("limit must be at least 1".to_string()));
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(action_type) = &filters.action_type {
            clauses.push("action_type = ?".to_string());
            values.push(Value::Text(action_type.clone()));
        }
        if let Some(status) = filters.status {
            clauses.push("status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(cursor) = cursor {
            let anchor: Option<i64> = self
                .conn
                .query_row(
                    "SELECT timestamp FROM activities WHERE id = ?1",
                    params![cursor.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| classify("resolve list cursor", &err))?;
            let Some(anchor_ts) = anchor else {
                return Err(DashboardError::InvalidArgument(format!("unknown cursor {cursor}")));
            };
            clauses.push("(timestamp < ? OR (timestamp = ? AND id < ?))".to_string());
            values.push(Value::Integer(anchor_ts));
            values.push(Value::Integer(anchor_ts));
            values.push(Value::Text(cursor.to_string()));
        }

        let mut sql = String::from(
            "SELECT id, timestamp, action_type, description, status, metadata_json FROM activities",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX)));

        let mut activities = self.query_activities(&sql, values)?;
        let has_more = activities.len() > limit;
        activities.truncate(limit);
        let next_cursor = if has_more { activities.last().map(|activity| activity.id) } else { None };

        Ok(ActivityPage { activities, has_more, next_cursor })
    }

    /// Full-text search over activity descriptions, bm25-ranked, with both
    /// filters combined. The caller supplies an already-normalized MATCH
    /// expression.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn search_activities(
        &self,
        match_expr: &str,
        filters: &ActivityFilters,
        limit: usize,
    ) -> Result<Vec<Activity>, DashboardError> {
        let mut sql = String::from(
            "SELECT activities.id, activities.timestamp, activities.action_type,
                    activities.description, activities.status, activities.metadata_json
             FROM activities
             JOIN activities_fts ON activities_fts.rowid = activities.rowid
             WHERE activities_fts MATCH ?",
        );
        let mut values: Vec<Value> = vec![Value::Text(match_expr.to_string())];

        if let Some(action_type) = &filters.action_type {
            sql.push_str(" AND activities.action_type = ?");
            values.push(Value::Text(action_type.clone()));
        }
        if let Some(status) = filters.status {
            sql.push_str(" AND activities.status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY bm25(activities_fts) LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        self.query_activities(&sql, values)
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn distinct_action_types(&self) -> Result<Vec<String>, DashboardError> {
        distinct_strings(&self.conn, "SELECT DISTINCT action_type FROM activities ORDER BY action_type ASC")
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn get_activity(&self, id: &ActivityId) -> Result<Option<Activity>, DashboardError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, timestamp, action_type, description, status, metadata_json
                 FROM activities WHERE id = ?1",
                params![id.to_string()],
                activity_row,
            )
            .optional()
            .map_err(|err| classify("get activity", &err))?;
        row.map(decode_activity).transpose()
    }

    /// Patch an activity's status in place and return the updated record.
    ///
    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn update_activity_status(
        &self,
        id: &ActivityId,
        status: ActivityStatus,
    ) -> Result<Activity, DashboardError> {
        let changed = self
            .conn
            .execute(
                "UPDATE activities SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(|err| classify("update activity status", &err))?;
        if changed == 0 {
            return Err(DashboardError::NotFound(format!("activity {id}")));
        }
        self.get_activity(id)?
            .ok_or_else(|| DashboardError::Storage(format!("activity {id} missing after update")))
    }

    // --- scheduled tasks ---

    /// # Errors
    /// Returns [`DashboardError::Storage`] when the insert fails.
    pub fn insert_task(&self, task: &ScheduledTask) -> Result<(), DashboardError> {
        let metadata_json = encode_json(task.metadata.as_ref())?;
        self.conn
            .execute(
                "INSERT INTO scheduled_tasks
                   (id, title, description, start_time, end_time, task_type, status, color, metadata_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.id.to_string(),
                    task.title,
                    task.description,
                    task.start_time,
                    task.end_time,
                    task.task_type,
                    task.status.as_str(),
                    task.color,
                    metadata_json,
                ],
            )
            .map_err(|err| classify("insert task", &err))?;
        tracing::debug!(id = %task.id, task_type = %task.task_type, "task inserted");
        Ok(())
    }

    /// All tasks whose `start_time` lies in the inclusive range, ordered by
    /// start time then id. Uncapped.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn tasks_in_range(&self, start: i64, end: i64) -> Result<Vec<ScheduledTask>, DashboardError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, description, start_time, end_time, task_type, status, color, metadata_json
                 FROM scheduled_tasks
                 WHERE start_time >= ?1 AND start_time <= ?2
                 ORDER BY start_time ASC, id ASC",
            )
            .map_err(|err| classify("prepare task range query", &err))?;
        let rows = stmt
            .query_map(params![start, end], task_row)
            .map_err(|err| classify("query tasks in range", &err))?;
        collect_tasks(rows)
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn get_task(&self, id: &TaskId) -> Result<Option<ScheduledTask>, DashboardError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, description, start_time, end_time, task_type, status, color, metadata_json
                 FROM scheduled_tasks WHERE id = ?1",
                params![id.to_string()],
                task_row,
            )
            .optional()
            .map_err(|err| classify("get task", &err))?;
        row.map(decode_task).transpose()
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn distinct_task_types(&self) -> Result<Vec<String>, DashboardError> {
        distinct_strings(&self.conn, "SELECT DISTINCT task_type FROM scheduled_tasks ORDER BY task_type ASC")
    }

    /// Full-text search over task titles, bm25-ranked, optionally filtered by
    /// task type.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn search_tasks(
        &self,
        match_expr: &str,
        task_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScheduledTask>, DashboardError> {
        let mut sql = String::from(
            "SELECT scheduled_tasks.id, scheduled_tasks.title, scheduled_tasks.description,
                    scheduled_tasks.start_time, scheduled_tasks.end_time, scheduled_tasks.task_type,
                    scheduled_tasks.status, scheduled_tasks.color, scheduled_tasks.metadata_json
             FROM scheduled_tasks
             JOIN tasks_fts ON tasks_fts.rowid = scheduled_tasks.rowid
             WHERE tasks_fts MATCH ?",
        );
        let mut values: Vec<Value> = vec![Value::Text(match_expr.to_string())];
        if let Some(task_type) = task_type {
            sql.push_str(" AND scheduled_tasks.task_type = ?");
            values.push(Value::Text(task_type.to_string()));
        }
        sql.push_str(" ORDER BY bm25(tasks_fts) LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare(&sql).map_err(|err| classify("prepare task search", &err))?;
        let rows = stmt
            .query_map(params_from_iter(values), task_row)
            .map_err(|err| classify("search tasks", &err))?;
        collect_tasks(rows)
    }

    /// Apply a partial update. Only provided fields are written; an all-empty
    /// patch degrades to an existence check. Returns the task as stored after
    /// the update.
    ///
    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<ScheduledTask, DashboardError> {
        if patch.is_empty() {
            return self
                .get_task(id)?
                .ok_or_else(|| DashboardError::NotFound(format!("task {id}")));
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            values.push(Value::Text(description.clone()));
        }
        if let Some(start_time) = patch.start_time {
            sets.push("start_time = ?");
            values.push(Value::Integer(start_time));
        }
        if let Some(end_time) = patch.end_time {
            sets.push("end_time = ?");
            values.push(Value::Integer(end_time));
        }
        if let Some(task_type) = &patch.task_type {
            sets.push("task_type = ?");
            values.push(Value::Text(task_type.clone()));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(color) = &patch.color {
            sets.push("color = ?");
            values.push(Value::Text(color.clone()));
        }
        if let Some(metadata) = &patch.metadata {
            sets.push("metadata_json = ?");
            let json = serde_json::to_string(metadata)
                .map_err(|err| DashboardError::Storage(format!("encode task metadata: {err}")))?;
            values.push(Value::Text(json));
        }

        let sql = format!("UPDATE scheduled_tasks SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| classify("update task", &err))?;
        if changed == 0 {
            return Err(DashboardError::NotFound(format!("task {id}")));
        }
        self.get_task(id)?
            .ok_or_else(|| DashboardError::Storage(format!("task {id} missing after update")))
    }

    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn delete_task(&self, id: &TaskId) -> Result<(), DashboardError> {
        let changed = self
            .conn
            .execute("DELETE FROM scheduled_tasks WHERE id = ?1", params![id.to_string()])
            .map_err(|err| classify("delete task", &err))?;
        if changed == 0 {
            return Err(DashboardError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    // --- content index ---

    /// # Errors
    /// Returns [`DashboardError::Storage`] when the insert fails.
    pub fn insert_content(&self, content: &IndexedContent) -> Result<(), DashboardError> {
        self.conn
            .execute(
                "INSERT INTO content_index (id, title, content, content_type, source_path, timestamp, preview)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    content.id.to_string(),
                    content.title,
                    content.content,
                    content.content_type,
                    content.source_path,
                    content.timestamp,
                    content.preview,
                ],
            )
            .map_err(|err| classify("insert content", &err))?;
        tracing::debug!(id = %content.id, content_type = %content.content_type, "content indexed");
        Ok(())
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn get_content(&self, id: &ContentId) -> Result<Option<IndexedContent>, DashboardError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, content, content_type, source_path, timestamp, preview
                 FROM content_index WHERE id = ?1",
                params![id.to_string()],
                content_row,
            )
            .optional()
            .map_err(|err| classify("get content", &err))?;
        row.map(decode_content).transpose()
    }

    /// Apply a non-empty patch and refresh `timestamp` to now. Callers handle
    /// the empty-patch no-op before reaching the store.
    ///
    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn update_content(
        &self,
        id: &ContentId,
        patch: &ContentPatch,
    ) -> Result<IndexedContent, DashboardError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(content) = &patch.content {
            sets.push("content = ?");
            values.push(Value::Text(content.clone()));
        }
        if let Some(preview) = &patch.preview {
            sets.push("preview = ?");
            values.push(Value::Text(preview.clone()));
        }
        sets.push("timestamp = ?");
        values.push(Value::Integer(now_epoch_ms()));

        let sql = format!("UPDATE content_index SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| classify("update content", &err))?;
        if changed == 0 {
            return Err(DashboardError::NotFound(format!("content {id}")));
        }
        self.get_content(id)?
            .ok_or_else(|| DashboardError::Storage(format!("content {id} missing after update")))
    }

    /// # Errors
    /// Returns [`DashboardError::NotFound`] when the id does not exist.
    pub fn delete_content(&self, id: &ContentId) -> Result<(), DashboardError> {
        let changed = self
            .conn
            .execute("DELETE FROM content_index WHERE id = ?1", params![id.to_string()])
            .map_err(|err| classify("delete content", &err))?;
        if changed == 0 {
            return Err(DashboardError::NotFound(format!("content {id}")));
        }
        Ok(())
    }

    /// Full-text search over document bodies, bm25-ranked, optionally
    /// filtered by content type.
    ///
    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn search_content(
        &self,
        match_expr: &str,
        content_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<IndexedContent>, DashboardError> {
        let mut sql = String::from(
            "SELECT content_index.id, content_index.title, content_index.content,
                    content_index.content_type, content_index.source_path,
                    content_index.timestamp, content_index.preview
             FROM content_index
             JOIN content_fts ON content_fts.rowid = content_index.rowid
             WHERE content_fts MATCH ?",
        );
        let mut values: Vec<Value> = vec![Value::Text(match_expr.to_string())];
        if let Some(content_type) = content_type {
            sql.push_str(" AND content_index.content_type = ?");
            values.push(Value::Text(content_type.to_string()));
        }
        sql.push_str(" ORDER BY bm25(content_fts) LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare(&sql).map_err(|err| classify("prepare content search", &err))?;
        let rows = stmt
            .query_map(params_from_iter(values), content_row)
            .map_err(|err| classify("search content", &err))?;
        let mut documents = Vec::new();
        for row in rows {
            let row = row.map_err(|err| classify("read content row", &err))?;
            documents.push(decode_content(row)?);
        }
        Ok(documents)
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn distinct_content_types(&self) -> Result<Vec<String>, DashboardError> {
        distinct_strings(&self.conn, "SELECT DISTINCT content_type FROM content_index ORDER BY content_type ASC")
    }

    // --- maintenance ---

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn count_activities(&self) -> Result<usize, DashboardError> {
        count_rows(&self.conn, "SELECT COUNT(*) FROM activities")
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn count_tasks(&self) -> Result<usize, DashboardError> {
        count_rows(&self.conn, "SELECT COUNT(*) FROM scheduled_tasks")
    }

    /// # Errors
    /// Returns a storage error kind when the query fails.
    pub fn count_content(&self) -> Result<usize, DashboardError> {
        count_rows(&self.conn, "SELECT COUNT(*) FROM content_index")
    }

    /// Delete every row in all three stores, returning removed counts. The
    /// FTS delete triggers keep the virtual tables in sync.
    ///
    /// # Errors
    /// Returns a storage error kind when any delete fails.
    pub fn clear_all(&mut self) -> Result<ClearCounts, DashboardError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|err| classify("start clear transaction", &err))?;
        let activities = tx
            .execute("DELETE FROM activities", [])
            .map_err(|err| classify("clear activities", &err))?;
        let tasks = tx
            .execute("DELETE FROM scheduled_tasks", [])
            .map_err(|err| classify("clear tasks", &err))?;
        let documents = tx
            .execute("DELETE FROM content_index", [])
            .map_err(|err| classify("clear content", &err))?;
        tx.commit().map_err(|err| classify("commit clear transaction", &err))?;
        tracing::info!(activities, tasks, documents, "stores cleared");
        Ok(ClearCounts { activities, tasks, documents })
    }

    fn query_activities(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Activity>, DashboardError> {
        let mut stmt = self.conn.prepare(sql).map_err(|err| classify("prepare activity query", &err))?;
        let rows = stmt
            .query_map(params_from_iter(values), activity_row)
            .map_err(|err| classify("query activities", &err))?;
        let mut activities = Vec::new();
        for row in rows {
            let row = row.map_err(|err| classify("read activity row", &err))?;
            activities.push(decode_activity(row)?);
        }
        Ok(activities)
    }
}

fn classify(context: &str, err: &rusqlite::Error) -> DashboardError {
    if let rusqlite::Error::SqliteFailure(code, _) = err {
        if matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::CannotOpen
        ) {
            return DashboardError::Unavailable(format!("{context}: {err}"));
        }
    }
    DashboardError::Storage(format!("{context}: {err}"))
}

fn current_schema_version(conn: &Connection) -> Result<i64, DashboardError> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .map_err(|err| classify("read schema version", &err))
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<(), DashboardError> {
    let applied_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| DashboardError::Storage(format!("format migration timestamp: {err}")))?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, applied_at],
    )
    .map_err(|err| classify("record schema version", &err))?;
    Ok(())
}

fn distinct_strings(conn: &Connection, sql: &str) -> Result<Vec<String>, DashboardError> {
    let mut stmt = conn.prepare(sql).map_err(|err| classify("prepare distinct query", &err))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|err| classify("query distinct values", &err))?;
    let mut values = Vec::new();
    for row in rows {
        values.push(row.map_err(|err| classify("read distinct value", &err))?);
    }
    Ok(values)
}

fn count_rows(conn: &Connection, sql: &str) -> Result<usize, DashboardError> {
    let count: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(|err| classify("count rows", &err))?;
    usize::try_from(count).map_err(|err| DashboardError::Storage(format!("row count overflow: {err}")))
}

fn encode_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>, DashboardError> {
    value
        .map(|value| {
            serde_json::to_string(value)
                .map_err(|err| DashboardError::Storage(format!("encode metadata: {err}")))
        })
        .transpose()
}

struct ActivityRow {
    id: String,
    timestamp: i64,
    action_type: String,
    description: String,
    status: String,
    metadata_json: Option<String>,
}

fn activity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        action_type: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        metadata_json: row.get(5)?,
    })
}

fn decode_activity(row: ActivityRow) -> Result<Activity, DashboardError> {
    let id = ActivityId::parse(&row.id)
        .map_err(|_| DashboardError::Storage(format!("corrupt activity id {}", row.id)))?;
    let status = ActivityStatus::parse(&row.status)
        .ok_or_else(|| DashboardError::Storage(format!("corrupt activity status {}", row.status)))?;
    let metadata: Option<ActivityMetadata> = row
        .metadata_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|err| DashboardError::Storage(format!("corrupt activity metadata: {err}")))?;

    Ok(Activity {
        id,
        timestamp: row.timestamp,
        action_type: row.action_type,
        description: row.description,
        status,
        metadata,
    })
}

struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    start_time: i64,
    end_time: Option<i64>,
    task_type: String,
    status: String,
    color: Option<String>,
    metadata_json: Option<String>,
}

fn task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        task_type: row.get(5)?,
        status: row.get(6)?,
        color: row.get(7)?,
        metadata_json: row.get(8)?,
    })
}

fn decode_task(row: TaskRow) -> Result<ScheduledTask, DashboardError> {
    let id = TaskId::parse(&row.id)
        .map_err(|_| DashboardError::Storage(format!("corrupt task id {}", row.id)))?;
    let status = TaskStatus::parse(&row.status)
        .ok_or_else(|| DashboardError::Storage(format!("corrupt task status {}", row.status)))?;
    let metadata: Option<TaskMetadata> = row
        .metadata_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|err| DashboardError::Storage(format!("corrupt task metadata: {err}")))?;

    Ok(ScheduledTask {
        id,
        title: row.title,
        description: row.description,
        start_time: row.start_time,
        end_time: row.end_time,
        task_type: row.task_type,
        status,
        color: row.color,
        metadata,
    })
}

fn collect_tasks(
    rows: impl Iterator<Item = rusqlite::Result<TaskRow>>,
) -> Result<Vec<ScheduledTask>, DashboardError> {
    let mut tasks = Vec::new();
    for row in rows {
        let row = row.map_err(|err| classify("read task row", &err))?;
        tasks.push(decode_task(row)?);
    }
    Ok(tasks)
}

struct ContentRow {
    id: String,
    title: String,
    content: String,
    content_type: String,
    source_path: Option<String>,
    timestamp: i64,
    preview: String,
}

fn content_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok(ContentRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        content_type: row.get(3)?,
        source_path: row.get(4)?,
        timestamp: row.get(5)?,
        preview: row.get(6)?,
    })
}

fn decode_content(row: ContentRow) -> Result<IndexedContent, DashboardError> {
    let id = ContentId::parse(&row.id)
        .map_err(|_| DashboardError::Storage(format!("corrupt content id {}", row.id)))?;
    Ok(IndexedContent {
        id,
        title: row.title,
        content: row.content,
        content_type: row.content_type,
        source_path: row.source_path,
        timestamp: row.timestamp,
        preview: row.preview,
    })
}
