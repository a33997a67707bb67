//! Purpose: Orchestrate CSV-to-table ingestion against a storage connection.
//! Exports: `ingest`, `ingest_file`, `IngestSummary`, `FileIngestOptions`, `FileIngestReport`.
//! Role: Component group 1: schema creation, row insertion, single commit.
//! Invariants: CREATE and every INSERT use the table name with spaces turned into `_`.
//! Invariants: Rows are inserted in dataset order and committed once, after the last row.
//! Invariants: `ingest_file` releases its connection on every exit path.
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::core::dataset::{Dataset, load_csv};
use crate::core::error::{Error, ErrorKind};
use crate::core::ident::normalize_table_name;
use crate::core::insert::RowInserter;
use crate::core::schema::build_create_statement;
use crate::core::storage::{SqliteStorage, Storage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub table: String,
    pub rows_inserted: u64,
    pub table_created: bool,
}

pub fn ingest<S: Storage>(
    dataset: &Dataset,
    table_name: &str,
    create_new: bool,
    storage: &mut S,
) -> Result<IngestSummary, Error> {
    let table = normalize_table_name(table_name);
    let specs = dataset.column_specs();

    if create_new {
        let statement = build_create_statement(&specs, &table);
        storage.execute(&statement).map_err(|err| {
            if err.kind() == ErrorKind::TableAlreadyExists {
                err.with_message(format!("table '{table}' already exists"))
                    .with_hint("Drop --new to append rows to the existing table.")
            } else {
                err
            }
        })?;
        info!(table = %table, "created table");
    }

    let names = specs
        .iter()
        .map(|spec| (spec.raw_name.as_str(), spec.storage_type()))
        .collect::<Vec<_>>();
    let inserter = RowInserter::new(table.clone(), names);

    let mut rows_inserted = 0u64;
    for (row_index, row) in dataset.rows().enumerate() {
        inserter.insert_row(storage, row_index, &row)?;
        rows_inserted += 1;
    }
    storage.commit()?;

    Ok(IngestSummary {
        table,
        rows_inserted,
        table_created: create_new,
    })
}

#[derive(Clone, Debug, Default)]
pub struct FileIngestOptions {
    pub create_new: bool,
    /// Encoding label; `None` tries utf-8, latin-1 and utf-16 in turn.
    pub encoding: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileIngestReport {
    pub database: PathBuf,
    pub file: PathBuf,
    pub encoding: String,
    pub database_created: bool,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

/// Load `csv_path` and ingest it into `table_name` in the database at `db_path`.
pub fn ingest_file(
    db_path: &Path,
    csv_path: &Path,
    table_name: &str,
    options: &FileIngestOptions,
) -> Result<FileIngestReport, Error> {
    let loaded = load_csv(csv_path, options.encoding.as_deref())?;

    let mut storage = SqliteStorage::open(db_path)?;
    let database_created = storage.created();
    let outcome = ingest(&loaded.dataset, table_name, options.create_new, &mut storage);
    let summary = match outcome {
        Ok(summary) => {
            storage.close()?;
            summary
        }
        Err(err) => {
            if let Err(close_err) = storage.close() {
                warn!(error = %close_err, "failed to close database after error");
            }
            return Err(err);
        }
    };

    info!(
        file = %csv_path.display(),
        table = %summary.table,
        database = %db_path.display(),
        rows = summary.rows_inserted,
        "file inserted"
    );
    Ok(FileIngestReport {
        database: db_path.to_path_buf(),
        file: csv_path.to_path_buf(),
        encoding: loaded.encoding,
        database_created,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::{FileIngestOptions, ingest, ingest_file};
    use crate::core::dataset::parse_csv;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::storage::{ResultSet, SqliteStorage, Storage};

    /// Records statements and fails the Nth execute.
    #[derive(Default)]
    struct RecordingStorage {
        statements: Vec<String>,
        commits: usize,
        fail_at: Option<usize>,
    }

    impl Storage for RecordingStorage {
        fn execute(&mut self, statement: &str) -> Result<usize, Error> {
            if self.fail_at == Some(self.statements.len()) {
                return Err(Error::new(ErrorKind::Statement).with_message("boom"));
            }
            self.statements.push(statement.to_string());
            Ok(1)
        }

        fn query(&mut self, _statement: &str) -> Result<ResultSet, Error> {
            Ok(ResultSet::default())
        }

        fn commit(&mut self) -> Result<(), Error> {
            self.commits += 1;
            Ok(())
        }

        fn close(self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn creates_then_inserts_in_order_and_commits_once() {
        let dataset = parse_csv("first name,score\nAda,1.5\nGrace,\n").expect("parse");
        let mut storage = RecordingStorage::default();
        let summary = ingest(&dataset, "my scores", true, &mut storage).expect("ingest");

        assert_eq!(summary.table, "my_scores");
        assert_eq!(summary.rows_inserted, 2);
        assert!(summary.table_created);
        assert_eq!(storage.commits, 1);
        assert_eq!(
            storage.statements,
            vec![
                "CREATE TABLE my_scores (first_name TEXT, score REAL)".to_string(),
                "INSERT INTO my_scores (first_name, score) VALUES(\"Ada\", 1.5)".to_string(),
                "INSERT INTO my_scores (first_name, score) VALUES(\"Grace\", NULL)".to_string(),
            ]
        );
    }

    #[test]
    fn table_names_keep_dashes() {
        let dataset = parse_csv("a\n1\n").expect("parse");
        let mut storage = RecordingStorage::default();
        ingest(&dataset, "raw-data v2", false, &mut storage).expect("ingest");
        assert_eq!(
            storage.statements,
            vec!["INSERT INTO raw-data_v2 (a) VALUES(1)".to_string()]
        );
    }

    #[test]
    fn failing_row_stops_before_commit() {
        let dataset = parse_csv("a\n1\n2\n3\n").expect("parse");
        let mut storage = RecordingStorage {
            fail_at: Some(2),
            ..RecordingStorage::default()
        };
        let err = ingest(&dataset, "t", false, &mut storage).expect_err("fail");
        assert_eq!(err.kind(), ErrorKind::Statement);
        assert_eq!(err.row(), Some(2));
        assert_eq!(storage.statements.len(), 2);
        assert_eq!(storage.commits, 0);
    }

    #[test]
    fn duplicate_table_with_create_new_is_reported() {
        let dataset = parse_csv("a\n1\n").expect("parse");
        let mut storage = SqliteStorage::open_in_memory().expect("open");
        ingest(&dataset, "t", true, &mut storage).expect("first");
        let err = ingest(&dataset, "t", true, &mut storage).expect_err("second");
        assert_eq!(err.kind(), ErrorKind::TableAlreadyExists);
        assert!(err.hint().is_some());
    }

    #[test]
    fn ingest_file_round_trips_through_sqlite() {
        let temp = tempfile::tempdir().expect("tempdir");
        let csv_path = temp.path().join("people.csv");
        std::fs::write(&csv_path, "name,age,member\nAda,36,True\nGrace,45,False\n")
            .expect("write csv");
        let db_path = temp.path().join("people.sq3");

        let options = FileIngestOptions {
            create_new: true,
            encoding: None,
        };
        let report = ingest_file(&db_path, &csv_path, "people", &options).expect("ingest");
        assert!(report.database_created);
        assert_eq!(report.encoding, "utf-8");
        assert_eq!(report.summary.rows_inserted, 2);

        let mut storage = SqliteStorage::open_existing(&db_path).expect("reopen");
        let result = storage
            .query("SELECT name, age, member FROM people ORDER BY age")
            .expect("query");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][2].to_string(), "1");
        assert_eq!(result.rows[1][2].to_string(), "0");
    }

    #[test]
    fn ingest_file_failure_leaves_no_rows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let csv_path = temp.path().join("data.csv");
        std::fs::write(&csv_path, "a\n1\n").expect("write csv");
        let db_path = temp.path().join("data.sq3");

        // No table and no --new: the first insert fails.
        let err = ingest_file(&db_path, &csv_path, "data", &FileIngestOptions::default())
            .expect_err("missing table");
        assert_eq!(err.kind(), ErrorKind::Statement);
        assert!(db_path.exists());
    }
}
