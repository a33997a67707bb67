//! Purpose: Read query text and run it against a storage connection.
//! Exports: `QueryResult`, `run_query`, `query_database`, `read_query_file`, `clean_query_text`.
//! Role: Query half of the tool; rendering lives in `core::render`.
//! Invariants: Query text is executed verbatim; cleaning happens once, upstream.
//! Invariants: Results carry the query text as executed for title extraction.
use std::path::Path;

use bstr::ByteSlice;
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::storage::{SqliteStorage, Storage};
use crate::core::types::Cell;

#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub query_text: String,
    /// Names reported by the engine's result metadata.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn run_query<S: Storage>(storage: &mut S, query_text: &str) -> Result<QueryResult, Error> {
    let result = storage.query(query_text)?;
    debug!(
        columns = result.columns.len(),
        rows = result.rows.len(),
        "query finished"
    );
    Ok(QueryResult {
        query_text: query_text.to_string(),
        columns: result.columns,
        rows: result.rows,
    })
}

/// Open an existing database, run one query, and release the connection.
pub fn query_database(db_path: &Path, query_text: &str) -> Result<QueryResult, Error> {
    let mut storage = SqliteStorage::open_existing(db_path)?;
    match run_query(&mut storage, query_text) {
        Ok(result) => {
            storage.close()?;
            Ok(result)
        }
        Err(err) => {
            if let Err(close_err) = storage.close() {
                warn!(error = %close_err, "failed to close database after error");
            }
            Err(err.with_path(db_path))
        }
    }
}

/// Read a query file: semicolons removed, lines joined by single spaces, trimmed.
pub fn read_query_file(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };
        Error::new(kind)
            .with_message("failed to read query file")
            .with_path(path)
            .with_source(err)
    })?;
    Ok(clean_query_bytes(&bytes))
}

/// Apply the query-file cleaning rules to inline query text.
pub fn clean_query_text(text: &str) -> String {
    clean_query_bytes(text.as_bytes())
}

fn clean_query_bytes(bytes: &[u8]) -> String {
    let mut query = String::new();
    for line in bytes.lines() {
        query.push(' ');
        query.push_str(&line.to_str_lossy().replace(';', ""));
    }
    query.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{clean_query_text, query_database, read_query_file, run_query};
    use crate::core::error::ErrorKind;
    use crate::core::storage::{SqliteStorage, Storage};
    use crate::core::types::Cell;

    #[test]
    fn query_file_is_joined_and_stripped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("test_query.txt");
        std::fs::write(&path, "SELECT AVG(float) FROM test_tb WHERE float > 1.0;\n")
            .expect("write");
        assert_eq!(
            read_query_file(&path).expect("read"),
            "SELECT AVG(float) FROM test_tb WHERE float > 1.0"
        );
    }

    #[test]
    fn multi_line_queries_keep_inner_spacing() {
        assert_eq!(
            clean_query_text("SELECT a,\r\n  b\nFROM t;\n"),
            "SELECT a,   b FROM t"
        );
        assert_eq!(clean_query_text(";;\n"), "");
    }

    #[test]
    fn missing_query_file_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = read_query_file(&temp.path().join("nope.sql")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn run_returns_rows_and_query_text() {
        let mut storage = SqliteStorage::open_in_memory().expect("open");
        storage
            .execute("CREATE TABLE family (name TEXT, height REAL)")
            .expect("create");
        storage
            .execute("INSERT INTO family (name, height) VALUES(\"Jonathan\", 1.8)")
            .expect("insert");
        storage.commit().expect("commit");

        let query = "SELECT name, height FROM family";
        let result = run_query(&mut storage, query).expect("run");
        assert_eq!(result.query_text, query);
        assert_eq!(result.columns, vec!["name", "height"]);
        assert_eq!(
            result.rows,
            vec![vec![Cell::Text("Jonathan".to_string()), Cell::Real(1.8)]]
        );
    }

    #[test]
    fn query_database_requires_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("absent.sq3");
        let err = query_database(&path, "SELECT a FROM t").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn engine_failures_are_query_errors() {
        let mut storage = SqliteStorage::open_in_memory().expect("open");
        let err = run_query(&mut storage, "SELEC nonsense").expect_err("syntax");
        assert_eq!(err.kind(), ErrorKind::Query);
    }
}
