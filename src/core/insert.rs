//! Purpose: Turn dataset rows into INSERT statements and execute them one by one.
//! Exports: `build_insert_statement`, `RowInserter`.
//! Role: Row-level half of ingestion; drives `encode_value` across each row.
//! Invariants: One statement per row, executed immediately; no batching.
//! Invariants: Shape is `INSERT INTO <table> (<fields>) VALUES(<v1>, <v2>, ...)`.
//! Invariants: The first failing row aborts; earlier rows stay pending in the open transaction.
use tracing::debug;

use crate::core::encode::encode_value;
use crate::core::error::{Error, ErrorKind};
use crate::core::ident::field_list;
use crate::core::storage::Storage;
use crate::core::types::{StorageColumnType, Value};

pub fn build_insert_statement(
    row_values: &[&Value],
    storage_types: &[StorageColumnType],
    table_name: &str,
    fields: &str,
) -> String {
    let values = row_values
        .iter()
        .zip(storage_types)
        .map(|(value, storage_type)| encode_value(value, *storage_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table_name} ({fields}) VALUES({values})")
}

/// Precomputed table name, field list and column types for one ingestion.
#[derive(Clone, Debug)]
pub struct RowInserter {
    table_name: String,
    fields: String,
    storage_types: Vec<StorageColumnType>,
}

impl RowInserter {
    /// `table_name` is used verbatim; normalize it before calling.
    pub fn new<'a, I>(table_name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, StorageColumnType)>,
    {
        let (names, storage_types): (Vec<&str>, Vec<StorageColumnType>) =
            columns.into_iter().unzip();
        Self {
            table_name: table_name.into(),
            fields: field_list(names),
            storage_types,
        }
    }

    pub fn fields(&self) -> &str {
        &self.fields
    }

    pub fn statement(&self, row_values: &[&Value]) -> String {
        build_insert_statement(
            row_values,
            &self.storage_types,
            &self.table_name,
            &self.fields,
        )
    }

    /// Build and execute the statement for one row; returns the statement text.
    pub fn insert_row<S: Storage>(
        &self,
        storage: &mut S,
        row_index: usize,
        row_values: &[&Value],
    ) -> Result<String, Error> {
        if row_values.len() != self.storage_types.len() {
            return Err(Error::new(ErrorKind::Internal)
                .with_message(format!(
                    "row has {} values for {} columns",
                    row_values.len(),
                    self.storage_types.len()
                ))
                .with_row(row_index as u64));
        }
        let statement = self.statement(row_values);
        debug!(row = row_index, "insert row");
        storage
            .execute(&statement)
            .map_err(|err| err.with_row(row_index as u64))?;
        Ok(statement)
    }
}
