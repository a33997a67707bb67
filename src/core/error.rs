//! Purpose: Error taxonomy shared by the ingestion and query pipelines.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Single error type carried through core, API and CLI layers.
//! Invariants: Every failure is surfaced with a kind; no silent recovery in core.
//! Invariants: Exit codes are stable once published.
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    /// A native type outside {Int, Float, Text, Bool}.
    UnsupportedType,
    /// `--new` was requested but the table name is taken.
    TableAlreadyExists,
    /// The engine rejected a CREATE or INSERT statement.
    Statement,
    /// The engine rejected a query.
    Query,
    /// No SELECT ... FROM span could be located in the query text.
    TitleParse,
    Decode,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    row: Option<u64>,
    statement: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            row: None,
            statement: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Zero-based dataset row the failure belongs to, when known.
    pub fn row(&self) -> Option<u64> {
        self.row
    }

    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(row) = self.row {
            write!(f, " (row: {row})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::TableAlreadyExists => 4,
        ErrorKind::UnsupportedType => 5,
        ErrorKind::Statement => 6,
        ErrorKind::Query => 7,
        ErrorKind::TitleParse => 8,
        ErrorKind::Decode => 9,
        ErrorKind::Io => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as StdError;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::TableAlreadyExists, 4),
            (ErrorKind::UnsupportedType, 5),
            (ErrorKind::Statement, 6),
            (ErrorKind::Query, 7),
            (ErrorKind::TitleParse, 8),
            (ErrorKind::Decode, 9),
            (ErrorKind::Io, 10),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_message_path_and_row() {
        let err = Error::new(ErrorKind::Statement)
            .with_message("insert failed")
            .with_path("/tmp/db.sq3")
            .with_row(4);
        assert_eq!(
            err.to_string(),
            "Statement: insert failed (path: /tmp/db.sq3) (row: 4)"
        );
    }

    #[test]
    fn source_chain_is_exposed() {
        let io = std::io::Error::other("disk gone");
        let err = Error::new(ErrorKind::Io).with_source(io);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "disk gone");
    }
}
