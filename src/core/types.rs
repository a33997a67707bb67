//! Purpose: Scalar type model for datasets, storage columns and query cells.
//! Exports: `NativeType`, `StorageColumnType`, `storage_type_for`, `Value`, `Cell`, `format_float`.
//! Role: Leaf module; every other core module speaks these types.
//! Invariants: Bool maps to INTEGER storage, but `Value::Bool` keeps its native token.
//! Invariants: Float text is repr-style (`5.0`, `1.8`, `1e+16`), matching existing result files.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

/// Scalar type a column has before storage mapping.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NativeType {
    Int,
    Float,
    Text,
    Bool,
}

impl NativeType {
    /// Parse a dtype name as produced by dataframe-style loaders.
    ///
    /// Accepts `int64`, `float64`, `object`, `bool` and the variant names
    /// themselves (case-insensitive). Anything else is `UnsupportedType`.
    pub fn from_dtype(name: &str) -> Result<Self, Error> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" => Ok(NativeType::Int),
            "float" | "float64" => Ok(NativeType::Float),
            "text" | "object" | "str" => Ok(NativeType::Text),
            "bool" => Ok(NativeType::Bool),
            _ => Err(Error::new(ErrorKind::UnsupportedType)
                .with_message(format!("unsupported column type '{name}'"))
                .with_hint("Supported native types are int64, float64, object and bool.")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NativeType::Int => "int64",
            NativeType::Float => "float64",
            NativeType::Text => "object",
            NativeType::Bool => "bool",
        }
    }
}

impl FromStr for NativeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NativeType::from_dtype(s)
    }
}

/// Column type declared in the backing relational store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StorageColumnType {
    Integer,
    Real,
    Text,
}

impl StorageColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            StorageColumnType::Integer => "INTEGER",
            StorageColumnType::Real => "REAL",
            StorageColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for StorageColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl From<NativeType> for StorageColumnType {
    fn from(native: NativeType) -> Self {
        storage_type_for(native)
    }
}

pub fn storage_type_for(native: NativeType) -> StorageColumnType {
    match native {
        NativeType::Int => StorageColumnType::Integer,
        NativeType::Float => StorageColumnType::Real,
        NativeType::Text => StorageColumnType::Text,
        NativeType::Bool => StorageColumnType::Integer,
    }
}

/// Map a dtype name straight to its storage column type.
pub fn storage_type_for_dtype(name: &str) -> Result<StorageColumnType, Error> {
    NativeType::from_dtype(name).map(storage_type_for)
}

/// One dataset cell.
///
/// `Missing` is the loader's missing-value marker; a `Float(NaN)` is treated
/// the same way by the encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Float(value) => value.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => f.write_str(&format_float(*value)),
            Value::Text(value) => f.write_str(value),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Missing => f.write_str("nan"),
        }
    }
}

/// One query result cell as returned by the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Integer(value) => write!(f, "{value}"),
            Cell::Real(value) => f.write_str(&format_float(*value)),
            Cell::Text(value) => f.write_str(value),
            Cell::Blob(bytes) => {
                f.write_str("x'")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
        }
    }
}

/// Shortest round-trip float text, always with a decimal point or exponent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let mut text = format!("{value}");
        if !text.contains('.') {
            text.push_str(".0");
        }
        return text;
    }

    // Rust renders `1e16`/`1.5e-5`; the driver renders `1e+16`/`1.5e-05`.
    let text = format!("{value:e}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(rest) => ('-', rest),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
