//! Purpose: Build the CREATE TABLE statement for a dataset's columns.
//! Exports: `ColumnSpec`, `build_create_statement`.
//! Role: Combines identifier sanitization with native-to-storage type mapping.
//! Invariants: Column order is preserved exactly; names are sanitized but never quoted.
//! Invariants: Output shape is `CREATE TABLE <table> (<col> <TYPE>, ...)`.
use crate::core::ident::{normalize_table_name, sanitize_identifier};
use crate::core::types::{NativeType, StorageColumnType, storage_type_for};

/// Raw column name paired with its inferred native type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub raw_name: String,
    pub native_type: NativeType,
}

impl ColumnSpec {
    pub fn new(raw_name: impl Into<String>, native_type: NativeType) -> Self {
        Self {
            raw_name: raw_name.into(),
            native_type,
        }
    }

    pub fn sanitized_name(&self) -> String {
        sanitize_identifier(&self.raw_name)
    }

    pub fn storage_type(&self) -> StorageColumnType {
        storage_type_for(self.native_type)
    }
}

pub fn build_create_statement(columns: &[ColumnSpec], table_name: &str) -> String {
    let fields = columns
        .iter()
        .map(|column| format!("{} {}", column.sanitized_name(), column.storage_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE {} ({fields})",
        normalize_table_name(table_name)
    )
}

#[cfg(test)]
mod tests {
    use super::{ColumnSpec, build_create_statement};
    use crate::core::types::NativeType;

    #[test]
    fn create_statement_matches_fixture() {
        let columns = vec![
            ColumnSpec::new("text", NativeType::Text),
            ColumnSpec::new("integer", NativeType::Int),
            ColumnSpec::new("float", NativeType::Float),
            ColumnSpec::new("bool", NativeType::Bool),
        ];
        assert_eq!(
            build_create_statement(&columns, "test_tb"),
            "CREATE TABLE test_tb (text TEXT, integer INTEGER, float REAL, bool INTEGER)"
        );
    }

    #[test]
    fn names_are_sanitized_asymmetrically() {
        let columns = vec![
            ColumnSpec::new("first name", NativeType::Text),
            ColumnSpec::new("time:stamp", NativeType::Float),
            ColumnSpec::new("a.b-c", NativeType::Int),
        ];
        assert_eq!(
            build_create_statement(&columns, "raw data-2024"),
            "CREATE TABLE raw_data-2024 (first_name TEXT, time_stamp REAL, a_b_c INTEGER)"
        );
    }
}
