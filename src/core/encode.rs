//! Purpose: Encode one dataset cell as literal text for an INSERT statement.
//! Exports: `encode_value`, `quote_text`.
//! Role: Value-level half of row insertion; pure and infallible.
//! Invariants: Missing markers and NaN become bare `NULL` in every column type.
//! Invariants: Text is stripped of `"`, `'` and `;` and wrapped in double quotes.
//! Invariants: Booleans keep their native `True`/`False` token; only the schema maps them.
//!
//! Stripping characters is a best-effort guard against statement injection and
//! is lossy: it is not a substitute for bound parameters.
use crate::core::types::{StorageColumnType, Value, format_float};

const STRIPPED: [char; 3] = ['"', '\'', ';'];

pub fn encode_value(value: &Value, storage_type: StorageColumnType) -> String {
    if value.is_missing() {
        return "NULL".to_string();
    }
    match (value, storage_type) {
        // A string in a numeric column only happens with a hand-built dataset;
        // it still goes through the same stripping.
        (Value::Text(text), _) => quote_text(text),
        (Value::Int(number), StorageColumnType::Real) => format_float(*number as f64),
        (other, _) => other.to_string(),
    }
}

pub fn quote_text(text: &str) -> String {
    let cleaned: String = text.chars().filter(|ch| !STRIPPED.contains(ch)).collect();
    format!("\"{cleaned}\"")
}
