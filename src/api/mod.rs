//! Purpose: Define the public Rust API boundary for sqlitetools.
//! Exports: Dataset loading, ingestion, query execution, rendering and error types.
//! Role: Public, additive-only surface; hides the internal module layout.
//! Invariants: This module is the only public path to core primitives.

pub use crate::core::dataset::{
    Dataset, DatasetColumn, LoadedCsv, MISSING_TOKENS, decode_csv_bytes, load_csv, parse_csv,
};
pub use crate::core::encode::{encode_value, quote_text};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::ident::{field_list, normalize_table_name, sanitize_identifier};
pub use crate::core::ingest::{
    FileIngestOptions, FileIngestReport, IngestSummary, ingest, ingest_file,
};
pub use crate::core::insert::{RowInserter, build_insert_statement};
pub use crate::core::query::{
    QueryResult, clean_query_text, query_database, read_query_file, run_query,
};
pub use crate::core::render::{
    ParsedTable, RenderedTable, TitleSource, extract_titles, render, render_result,
    results_path_for,
};
pub use crate::core::schema::{ColumnSpec, build_create_statement};
pub use crate::core::storage::{ResultSet, SqliteStorage, Storage};
pub use crate::core::types::{
    Cell, NativeType, StorageColumnType, Value, format_float, storage_type_for,
    storage_type_for_dtype,
};
