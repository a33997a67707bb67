//! Purpose: In-memory tabular dataset plus the CSV loader that produces it.
//! Exports: `Dataset`, `DatasetColumn`, `LoadedCsv`, `load_csv`, `parse_csv`, `decode_csv_bytes`.
//! Role: Dataset-loading collaborator for ingestion; resolves encodings and infers native types.
//! Invariants: All columns have the same row count.
//! Invariants: Column values are homogeneous apart from the missing-value marker.
//! Invariants: A utf-16 byte order mark wins; otherwise utf-8, latin-1, utf-16 are tried in turn.
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, UTF_16LE, WINDOWS_1252};
use tracing::{debug, info, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::ColumnSpec;
use crate::core::types::{NativeType, Value};

/// Tokens read as the missing-value marker.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn fallback_encodings() -> [(&'static str, &'static Encoding); 3] {
    [
        ("utf-8", UTF_8),
        ("latin-1", WINDOWS_1252),
        ("utf-16", UTF_16LE),
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatasetColumn {
    pub name: String,
    pub native_type: NativeType,
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<DatasetColumn>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<DatasetColumn>) -> Result<Self, Error> {
        let row_count = columns.first().map(|column| column.values.len()).unwrap_or(0);
        if let Some(column) = columns.iter().find(|column| column.values.len() != row_count) {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "column '{}' has {} values, expected {row_count}",
                column.name,
                column.values.len()
            )));
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[DatasetColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Recomputed on every call; the dataset owns names and types.
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.columns
            .iter()
            .map(|column| ColumnSpec::new(column.name.clone(), column.native_type))
            .collect()
    }

    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|column| &column.values[index])
                .collect(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count).filter_map(|index| self.row(index))
    }
}

/// A decoded dataset and the encoding label that decoded it.
#[derive(Clone, Debug)]
pub struct LoadedCsv {
    pub dataset: Dataset,
    pub encoding: String,
}

pub fn load_csv(path: &Path, encoding: Option<&str>) -> Result<LoadedCsv, Error> {
    let bytes = std::fs::read(path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };
        Error::new(kind)
            .with_message("failed to read csv file")
            .with_path(path)
            .with_source(err)
    })?;
    let (text, label) = decode_csv_bytes(&bytes, encoding).map_err(|err| err.with_path(path))?;
    let dataset = parse_csv(&text).map_err(|err| err.with_path(path))?;
    info!(
        file = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "loaded csv"
    );
    Ok(LoadedCsv {
        dataset,
        encoding: label,
    })
}

/// Decode raw file bytes, either with the named encoding or by fallback.
pub fn decode_csv_bytes(bytes: &[u8], encoding: Option<&str>) -> Result<(String, String), Error> {
    if let Some(label) = encoding {
        let resolved = resolve_encoding(label).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("unknown encoding '{label}'"))
                .with_hint("Use a label such as utf-8, latin-1 or utf-16.")
        })?;
        return decode_strict(bytes, resolved)
            .map(|text| (text.into_owned(), label.to_string()))
            .ok_or_else(|| {
                Error::new(ErrorKind::Decode)
                    .with_message(format!("could not decode the file with '{label}'"))
                    .with_hint("Specify the right encoding with --encoding.")
            });
    }

    if let Some((bom_encoding, _)) = Encoding::for_bom(bytes) {
        if is_utf16(bom_encoding) {
            info!("found a utf-16 byte order mark");
            return decode_strict(bytes, bom_encoding)
                .map(|text| (text.into_owned(), "utf-16".to_string()))
                .ok_or_else(|| {
                    Error::new(ErrorKind::Decode)
                        .with_message("could not decode the file as utf-16")
                        .with_hint("Specify the right encoding with --encoding.")
                });
        }
    }

    for (label, resolved) in fallback_encodings() {
        match decode_strict(bytes, resolved) {
            Some(text) => {
                info!("used '{label}' to decode the file");
                return Ok((text.into_owned(), label.to_string()));
            }
            None => warn!("failed to use '{label}' to decode the file"),
        }
    }
    Err(Error::new(ErrorKind::Decode)
        .with_message("could not decode the file")
        .with_hint("Select the encoding with --encoding."))
}

fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    let normalized = label.trim().to_ascii_lowercase();
    let alias = match normalized.as_str() {
        "latin-1" | "latin_1" => "latin1",
        "utf16" | "utf_16" => "utf-16",
        "utf8" | "utf_8" => "utf-8",
        other => other,
    };
    Encoding::for_label(alias.as_bytes())
}

fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if same_family(bom_encoding, encoding) => {
            (bom_encoding, &bytes[bom_len..])
        }
        _ => (encoding, bytes),
    };
    encoding.decode_without_bom_handling_and_without_replacement(body)
}

fn same_family(bom: &'static Encoding, requested: &'static Encoding) -> bool {
    bom == requested || (is_utf16(bom) && is_utf16(requested))
}

fn is_utf16(encoding: &'static Encoding) -> bool {
    encoding == UTF_16LE || encoding == encoding_rs::UTF_16BE
}

/// Parse decoded CSV text (header row required) and infer column types.
pub fn parse_csv(text: &str) -> Result<Dataset, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let headers = dedupe_headers(headers);

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (idx, field) in record.iter().enumerate() {
            raw_columns[idx].push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| infer_column(name, raw))
        .collect::<Vec<_>>();
    Dataset::new(columns)
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map(|position| position.line());
    let mut error = Error::new(ErrorKind::Decode).with_message(match line {
        Some(line) => format!("malformed csv at line {line}"),
        None => "malformed csv".to_string(),
    });
    if let csv::ErrorKind::UnequalLengths { .. } = err.kind() {
        error = error.with_hint("Every record must have as many fields as the header row.");
    }
    error.with_source(err)
}

/// Blank headers become `Unnamed: <idx>`; repeats get `.1`, `.2`, ... suffixes.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };
        let mut name = base.clone();
        if seen.contains_key(&name) {
            loop {
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                let candidate = format!("{base}.{count}");
                if !seen.contains_key(&candidate) {
                    name = candidate;
                    break;
                }
            }
        }
        seen.insert(name.clone(), 0);
        out.push(name);
    }
    out
}

fn is_missing_token(field: &str) -> bool {
    MISSING_TOKENS.contains(&field)
}

fn parse_bool(field: &str) -> Option<bool> {
    let field = field.trim();
    if field.eq_ignore_ascii_case("true") {
        Some(true)
    } else if field.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn infer_column(name: String, raw: Vec<String>) -> DatasetColumn {
    let present = raw
        .iter()
        .filter(|field| !is_missing_token(field))
        .collect::<Vec<_>>();
    let has_missing = present.len() != raw.len();

    let all_int = !present.is_empty() && present.iter().all(|f| f.trim().parse::<i64>().is_ok());
    // A header-only column has no values to go on and stays text.
    let all_float = !raw.is_empty() && present.iter().all(|f| f.trim().parse::<f64>().is_ok());
    let all_bool = !present.is_empty() && present.iter().all(|f| parse_bool(f).is_some());

    let (native_type, values) = if all_int && !has_missing {
        let values = raw
            .iter()
            .map(|f| f.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Missing))
            .collect();
        (NativeType::Int, values)
    } else if all_float {
        // Integers with gaps widen to float, and an all-missing column is float NaN.
        let values = raw
            .iter()
            .map(|f| {
                if is_missing_token(f) {
                    Value::Missing
                } else {
                    f.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Missing)
                }
            })
            .collect();
        (NativeType::Float, values)
    } else if all_bool {
        let values = raw
            .iter()
            .map(|f| parse_bool(f).map(Value::Bool).unwrap_or(Value::Missing))
            .collect();
        if has_missing {
            (NativeType::Text, values)
        } else {
            (NativeType::Bool, values)
        }
    } else {
        let values = raw
            .into_iter()
            .map(|f| {
                if is_missing_token(&f) {
                    Value::Missing
                } else {
                    Value::Text(f)
                }
            })
            .collect();
        (NativeType::Text, values)
    };

    debug!(column = %name, dtype = native_type.as_str(), "inferred column type");
    DatasetColumn {
        name,
        native_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column<'a>(dataset: &'a Dataset, name: &str) -> &'a DatasetColumn {
        dataset
            .columns()
            .iter()
            .find(|column| column.name == name)
            .expect("column")
    }

    #[test]
    fn infers_the_four_native_types() {
        let dataset = parse_csv("text,integer,float,bool\nrow1,1,5.0,True\nrow2,2,0.5,False\n")
            .expect("parse");
        let specs = dataset.column_specs();
        assert_eq!(
            specs,
            vec![
                ColumnSpec::new("text", NativeType::Text),
                ColumnSpec::new("integer", NativeType::Int),
                ColumnSpec::new("float", NativeType::Float),
                ColumnSpec::new("bool", NativeType::Bool),
            ]
        );
        assert_eq!(
            dataset.row(0).expect("row"),
            vec![
                &Value::Text("row1".to_string()),
                &Value::Int(1),
                &Value::Float(5.0),
                &Value::Bool(true),
            ]
        );
        assert_eq!(dataset.row_count(), 2);
        assert!(dataset.row(2).is_none());
    }

    #[test]
    fn missing_values_widen_or_fall_back() {
        let dataset = parse_csv("i,t,b,empty\n1,a,True,\n,,,\n3,c,False,\n").expect("parse");
        let ints = column(&dataset, "i");
        assert_eq!(ints.native_type, NativeType::Float);
        assert_eq!(ints.values[0], Value::Float(1.0));
        assert!(ints.values[1].is_missing());

        let texts = column(&dataset, "t");
        assert_eq!(texts.native_type, NativeType::Text);
        assert_eq!(texts.values[1], Value::Missing);

        let bools = column(&dataset, "b");
        assert_eq!(bools.native_type, NativeType::Text);
        assert_eq!(bools.values[0], Value::Bool(true));
        assert_eq!(bools.values[1], Value::Missing);

        let empty = column(&dataset, "empty");
        assert_eq!(empty.native_type, NativeType::Float);
        assert!(empty.values.iter().all(Value::is_missing));
    }

    #[test]
    fn headers_are_deduplicated() {
        let dataset = parse_csv("a,a,,a\n1,2,3,4\n").expect("parse");
        let names = dataset
            .columns()
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "a.1", "Unnamed: 2", "a.2"]);
    }

    #[test]
    fn ragged_rows_are_decode_errors() {
        let err = parse_csv("a,b\n1,2\n3\n").expect_err("ragged");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = Dataset::new(vec![
            DatasetColumn {
                name: "a".to_string(),
                native_type: NativeType::Int,
                values: vec![Value::Int(1)],
            },
            DatasetColumn {
                name: "b".to_string(),
                native_type: NativeType::Int,
                values: vec![],
            },
        ])
        .expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn latin1_bytes_fall_back() {
        let bytes = b"name\ncaf\xe9\n";
        let (text, label) = decode_csv_bytes(bytes, None).expect("decode");
        assert_eq!(label, "latin-1");
        assert_eq!(text, "name\ncaf\u{e9}\n");
    }

    #[test]
    fn utf8_bom_is_removed() {
        let bytes = b"\xef\xbb\xbfname\nx\n";
        let (text, label) = decode_csv_bytes(bytes, None).expect("decode");
        assert_eq!(label, "utf-8");
        assert_eq!(text, "name\nx\n");
    }

    #[test]
    fn explicit_encoding_is_strict() {
        let err = decode_csv_bytes(b"caf\xe9", Some("utf-8")).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = decode_csv_bytes(b"x", Some("klingon")).expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let (text, _) = decode_csv_bytes(b"caf\xe9", Some("latin-1")).expect("latin");
        assert_eq!(text, "caf\u{e9}");
    }

    #[test]
    fn utf16_bom_is_detected_without_a_label() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "name\ncaf\u{e9}\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, label) = decode_csv_bytes(&bytes, None).expect("decode");
        assert_eq!(label, "utf-16");
        assert_eq!(text, "name\ncaf\u{e9}\n");

        let mut big_endian = vec![0xfe, 0xff];
        for unit in "a\n1\n".encode_utf16() {
            big_endian.extend_from_slice(&unit.to_be_bytes());
        }
        let (text, label) = decode_csv_bytes(&big_endian, None).expect("decode");
        assert_eq!(label, "utf-16");
        assert_eq!(text, "a\n1\n");
    }

    #[test]
    fn header_only_file_has_text_columns() {
        let dataset = parse_csv("a,b\n").expect("parse");
        assert_eq!(dataset.row_count(), 0);
        assert_eq!(
            dataset.column_specs(),
            vec![
                ColumnSpec::new("a", NativeType::Text),
                ColumnSpec::new("b", NativeType::Text),
            ]
        );
    }

    #[test]
    fn utf16_with_bom_decodes() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "a\n1\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, _) = decode_csv_bytes(&bytes, Some("utf-16")).expect("decode");
        assert_eq!(text, "a\n1\n");
    }
}
