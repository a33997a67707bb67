//! Purpose: Storage connection seam plus the SQLite backend behind it.
//! Exports: `Storage`, `ResultSet`, `SqliteStorage`.
//! Role: The only module that talks to the database engine.
//! Invariants: The first `execute` after open/commit begins a transaction implicitly.
//! Invariants: Closing or dropping with an open transaction discards pending rows.
//! Invariants: Engine errors are wrapped, never swallowed.
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::{debug, info};

use crate::core::error::{Error, ErrorKind};
use crate::core::types::Cell;

/// Column names from result metadata plus the fetched rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Statement execution surface used by the ingestion and query pipelines.
pub trait Storage {
    /// Run a statement that returns no rows.
    fn execute(&mut self, statement: &str) -> Result<usize, Error>;

    /// Run a statement and fetch every row.
    fn query(&mut self, statement: &str) -> Result<ResultSet, Error>;

    fn commit(&mut self) -> Result<(), Error>;

    fn close(self) -> Result<(), Error>
    where
        Self: Sized;
}

pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
    created: bool,
    in_transaction: bool,
}

impl SqliteStorage {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let created = !path.exists();
        let conn = Connection::open(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open database")
                .with_path(path)
                .with_source(err)
        })?;
        if created {
            info!(database = %path.display(), "created database");
        }
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            created,
            in_transaction: false,
        })
    }

    /// Open an existing database file; a missing file is `NotFound`.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("database file not found")
                .with_path(path)
                .with_hint("Check the --database path; `query` never creates databases."));
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to open in-memory database")
                .with_source(err)
        })?;
        Ok(Self {
            conn,
            path: None,
            created: true,
            in_transaction: false,
        })
    }

    /// Whether `open` created the database file.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn begin_if_needed(&mut self) -> Result<(), Error> {
        if self.in_transaction {
            return Ok(());
        }
        self.conn
            .execute_batch("BEGIN")
            .map_err(|err| self.engine_error(ErrorKind::Statement, "failed to begin transaction", err))?;
        self.in_transaction = true;
        Ok(())
    }

    fn engine_error(&self, kind: ErrorKind, message: &str, err: rusqlite::Error) -> Error {
        let mut error = Error::new(kind).with_message(message).with_source(err);
        if let Some(path) = &self.path {
            error = error.with_path(path);
        }
        error
    }
}

impl Storage for SqliteStorage {
    fn execute(&mut self, statement: &str) -> Result<usize, Error> {
        self.begin_if_needed()?;
        debug!(statement, "execute");
        self.conn.execute(statement, []).map_err(|err| {
            let kind = if is_duplicate_table(&err) {
                ErrorKind::TableAlreadyExists
            } else {
                ErrorKind::Statement
            };
            self.engine_error(kind, "statement rejected by database", err)
                .with_statement(statement)
        })
    }

    fn query(&mut self, statement: &str) -> Result<ResultSet, Error> {
        debug!(statement, "query");
        let query_error = |err| {
            self.engine_error(ErrorKind::Query, "query rejected by database", err)
                .with_statement(statement)
        };
        let mut stmt = self.conn.prepare(statement).map_err(query_error)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(query_error)?;
        while let Some(row) = cursor.next().map_err(query_error)? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let value = row.get_ref(idx).map_err(query_error)?;
                cells.push(cell_from_ref(value));
            }
            rows.push(cells);
        }
        Ok(ResultSet { columns, rows })
    }

    fn commit(&mut self) -> Result<(), Error> {
        if !self.in_transaction {
            return Ok(());
        }
        self.conn
            .execute_batch("COMMIT")
            .map_err(|err| self.engine_error(ErrorKind::Statement, "commit failed", err))?;
        self.in_transaction = false;
        Ok(())
    }

    fn close(self) -> Result<(), Error> {
        let path = self.path.clone();
        if self.in_transaction {
            debug!("rolling back uncommitted statements");
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|err| self.engine_error(ErrorKind::Statement, "rollback failed", err))?;
        }
        self.conn.close().map_err(|(_, err)| {
            let mut error = Error::new(ErrorKind::Io)
                .with_message("failed to close database")
                .with_source(err);
            if let Some(path) = path {
                error = error.with_path(path);
            }
            error
        })
    }
}

fn is_duplicate_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.contains("already exists"),
        _ => false,
    }
}

fn cell_from_ref(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(text) => Cell::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
    }
}
