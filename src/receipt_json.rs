//! Purpose: JSON receipts emitted on stdout for `load` and `query`.
//! Exports: `load_receipt_json`, `query_receipt_json`.
//! Role: Keep receipt envelope shapes in one place for the CLI and its tests.
//! Invariants: Key names are stable; fields are additive-only.

use std::path::Path;

use serde_json::{Map, Value, json};
use sqlitetools::api::{FileIngestReport, QueryResult};

pub(crate) fn load_receipt_json(report: &FileIngestReport) -> Value {
    let body = serde_json::to_value(report).unwrap_or_else(|_| {
        json!({
            "table": report.summary.table,
            "rows_inserted": report.summary.rows_inserted,
        })
    });
    let mut outer = Map::new();
    outer.insert("load".to_string(), body);
    Value::Object(outer)
}

pub(crate) fn query_receipt_json(output: &Path, result: &QueryResult) -> Value {
    json!({
        "query": {
            "output": output.display().to_string(),
            "columns": result.columns,
            "rows": result.row_count(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{load_receipt_json, query_receipt_json};
    use sqlitetools::api::{Cell, FileIngestReport, IngestSummary, QueryResult};
    use std::path::{Path, PathBuf};

    #[test]
    fn load_receipt_flattens_summary() {
        let report = FileIngestReport {
            database: PathBuf::from("/tmp/db.sq3"),
            file: PathBuf::from("/tmp/people.csv"),
            encoding: "utf-8".to_string(),
            database_created: true,
            summary: IngestSummary {
                table: "people".to_string(),
                rows_inserted: 2,
                table_created: true,
            },
        };
        let value = load_receipt_json(&report);
        let load = value.get("load").expect("load");
        assert_eq!(load["table"], "people");
        assert_eq!(load["rows_inserted"], 2);
        assert_eq!(load["table_created"], true);
        assert_eq!(load["database"], "/tmp/db.sq3");
        assert_eq!(load["encoding"], "utf-8");
    }

    #[test]
    fn query_receipt_counts_rows() {
        let result = QueryResult {
            query_text: "SELECT a FROM t".to_string(),
            columns: vec!["a".to_string()],
            rows: vec![vec![Cell::Integer(1)], vec![Cell::Null]],
        };
        let value = query_receipt_json(Path::new("results_q.sql"), &result);
        assert_eq!(value["query"]["rows"], 2);
        assert_eq!(value["query"]["columns"][0], "a");
        assert_eq!(value["query"]["output"], "results_q.sql");
    }
}
