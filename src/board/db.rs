use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use board_common::{JitterSource, KeyGenerator, OrderKey};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use super::models::*;
use super::store::{CommitError, ItemOrderStore, PositionedItem};

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&BoardDb) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| E::from(anyhow::anyhow!("DB lock poisoned: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(|e| E::from(anyhow::Error::new(e).context("DB task panicked")))?
    }
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        // order_key uses the default BINARY collation: the key alphabet is
        // ASCII 0-9a-z, so byte order is key order.
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    column_name TEXT NOT NULL DEFAULT 'backlog',
                    order_key TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE UNIQUE INDEX IF NOT EXISTS idx_issues_order
                    ON issues(project_id, column_name, order_key);
                CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn create_project(&self, name: &str) -> Result<Project> {
        self.conn
            .execute("INSERT INTO projects (name) VALUES (?1)", params![name])
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM projects ORDER BY id")
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM projects WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query project")
    }

    // ── Issue CRUD ────────────────────────────────────────────────────

    /// Insert an issue at the end of `column`. The first issue of an empty
    /// column gets the seed key.
    pub fn create_issue<J: JitterSource>(
        &self,
        project_id: i64,
        title: &str,
        description: &str,
        column: IssueColumn,
        keys: &mut KeyGenerator<J>,
    ) -> Result<Issue> {
        let max_key = self.max_key_in_column(project_id, column, None)?;
        let order_key = keys
            .generate(max_key.as_ref(), None)
            .context("Failed to generate order key for new issue")?;

        self.conn
            .execute(
                "INSERT INTO issues (project_id, title, description, column_name, order_key) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![project_id, title, description, column.as_str(), order_key.as_str()],
            )
            .context("Failed to insert issue")?;
        let id = self.conn.last_insert_rowid();
        debug!(issue_id = id, project_id, column = %column, order_key = %order_key, "issue created");
        self.get_issue(id)?.context("Issue not found after insert")
    }

    pub fn list_issues(&self, project_id: i64) -> Result<Vec<Issue>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, title, description, column_name, order_key, created_at, updated_at
                 FROM issues WHERE project_id = ?1 ORDER BY column_name, order_key",
            )
            .context("Failed to prepare list_issues")?;
        let rows = stmt
            .query_map(params![project_id], IssueRow::from_row)
            .context("Failed to query issues")?;
        collect_issues(rows)
    }

    /// Issues of one column in display order.
    pub fn list_column(&self, project_id: i64, column: IssueColumn) -> Result<Vec<Issue>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, title, description, column_name, order_key, created_at, updated_at
                 FROM issues WHERE project_id = ?1 AND column_name = ?2 ORDER BY order_key",
            )
            .context("Failed to prepare list_column")?;
        let rows = stmt
            .query_map(params![project_id, column.as_str()], IssueRow::from_row)
            .context("Failed to query column")?;
        collect_issues(rows)
    }

    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, title, description, column_name, order_key, created_at, updated_at
                 FROM issues WHERE id = ?1",
                params![id],
                IssueRow::from_row,
            )
            .optional()
            .context("Failed to query issue")?;
        row.map(IssueRow::into_issue).transpose()
    }

    /// Delete an issue. Its siblings keep their keys.
    pub fn delete_issue(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .context("Failed to delete issue")?;
        Ok(count > 0)
    }

    // ── Board view ────────────────────────────────────────────────────

    pub fn get_board(&self, project_id: i64) -> Result<Option<BoardView>> {
        let Some(project) = self.get_project(project_id)? else {
            return Ok(None);
        };

        let mut columns = Vec::with_capacity(IssueColumn::ALL.len());
        for col in IssueColumn::ALL {
            columns.push(ColumnView {
                name: col,
                issues: self.list_column(project_id, col)?,
            });
        }
        Ok(Some(BoardView { project, columns }))
    }

    // ── Rebalance ─────────────────────────────────────────────────────

    /// Reassign evenly spaced keys to every issue of a column, keeping their
    /// order. Recovers a column whose keys have grown to the length limit.
    pub fn rebalance_column<J: JitterSource>(
        &self,
        project_id: i64,
        column: IssueColumn,
        keys: &KeyGenerator<J>,
    ) -> Result<Vec<Issue>> {
        // Take the write lock before reading so no other connection can change
        // the column between the read and the rewrite.
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin rebalance")?;

        let issues = self.list_column(project_id, column)?;
        let fresh = keys
            .spread(issues.len())
            .context("Failed to compute rebalanced keys")?;

        // '~' sorts after the alphabet and never appears in real keys, so the
        // parking keys cannot collide with either old or new ones.
        for issue in &issues {
            tx.execute(
                "UPDATE issues SET order_key = '~' || id WHERE id = ?1",
                params![issue.id],
            )
            .context("Failed to park order key")?;
        }
        for (issue, key) in issues.iter().zip(&fresh) {
            tx.execute(
                "UPDATE issues SET order_key = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![key.as_str(), issue.id],
            )
            .context("Failed to write rebalanced order key")?;
        }

        tx.commit().context("Failed to commit rebalance")?;
        info!(project_id, column = %column, issues = issues.len(), "column rebalanced");
        self.list_column(project_id, column)
    }

    fn max_key_in_column(
        &self,
        project_id: i64,
        column: IssueColumn,
        excluding: Option<i64>,
    ) -> Result<Option<OrderKey>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(order_key) FROM issues
                 WHERE project_id = ?1 AND column_name = ?2 AND (?3 IS NULL OR id != ?3)",
                params![project_id, column.as_str(), excluding],
                |row| row.get(0),
            )
            .context("Failed to get max order key")?;
        raw.map(parse_stored_key).transpose()
    }
}

// ── ItemOrderStore ────────────────────────────────────────────────────

impl ItemOrderStore for BoardDb {
    fn resolve_item(&self, id: i64) -> Result<Option<PositionedItem>> {
        Ok(self.get_issue(id)?.map(|issue| PositionedItem {
            id: issue.id,
            project_id: issue.project_id,
            column: issue.column,
            order_key: issue.order_key,
        }))
    }

    fn find_max_key(
        &self,
        project_id: i64,
        column: IssueColumn,
        excluding: i64,
    ) -> Result<Option<OrderKey>> {
        self.max_key_in_column(project_id, column, Some(excluding))
    }

    fn find_predecessor_key(
        &self,
        project_id: i64,
        column: IssueColumn,
        before_key: &OrderKey,
        excluding: i64,
    ) -> Result<Option<OrderKey>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(order_key) FROM issues
                 WHERE project_id = ?1 AND column_name = ?2 AND order_key < ?3 AND id != ?4",
                params![project_id, column.as_str(), before_key.as_str(), excluding],
                |row| row.get(0),
            )
            .context("Failed to get predecessor order key")?;
        raw.map(parse_stored_key).transpose()
    }

    fn commit(&self, id: i64, column: IssueColumn, key: &OrderKey) -> Result<(), CommitError> {
        let result = self.conn.execute(
            "UPDATE issues SET column_name = ?1, order_key = ?2, updated_at = datetime('now') WHERE id = ?3",
            params![column.as_str(), key.as_str(), id],
        );
        match result {
            Ok(0) => Err(CommitError::Store(anyhow::anyhow!(
                "Issue {} disappeared before its move was committed",
                id
            ))),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CommitError::UniquenessViolation {
                column,
                key: key.to_string(),
            }),
            Err(e) => Err(CommitError::Store(
                anyhow::Error::new(e).context("Failed to commit order key"),
            )),
        }
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

struct IssueRow {
    id: i64,
    project_id: i64,
    title: String,
    description: String,
    column_name: String,
    order_key: String,
    created_at: String,
    updated_at: String,
}

impl IssueRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            column_name: row.get(4)?,
            order_key: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_issue(self) -> Result<Issue> {
        let column = self
            .column_name
            .parse::<IssueColumn>()
            .map_err(|e| anyhow::anyhow!("invalid column in database: {}", e))?;
        Ok(Issue {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            column,
            order_key: parse_stored_key(self.order_key)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn collect_issues(
    rows: impl Iterator<Item = rusqlite::Result<IssueRow>>,
) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    for row in rows {
        let r = row.context("Failed to read issue row")?;
        issues.push(r.into_issue()?);
    }
    Ok(issues)
}

fn parse_stored_key(raw: String) -> Result<OrderKey> {
    OrderKey::new(raw).context("invalid order key in database")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
