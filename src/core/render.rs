//! Purpose: Render query results as a fixed-width, right-justified text table.
//! Exports: `TitleSource`, `RenderedTable`, `ParsedTable`, `extract_titles`, `render`, `render_result`, `results_path_for`.
//! Role: Component group 2 output stage; the results file is a thin wrapper over `to_text`.
//! Invariants: Every cell is right-justified to its column's max width + 3; no other separator.
//! Invariants: Separator is `sum(widths) + 3 * columns` dashes.
//! Invariants: NULL cells render as `NULL`; empty results still yield title and separator.
//! Invariants: One physical line per row; line breaks inside cells render as `\n`/`\r`.
//!
//! Legacy titles come from the text between SELECT and FROM split on `, `.
//! That is a heuristic, not a parser: `SELECT *`, sub-selects and aliases
//! containing those keywords produce wrong titles or a `TitleParse` error.
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::query::QueryResult;
use crate::core::types::Cell;

const COLUMN_PADDING: usize = 3;

/// Where display titles come from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TitleSource {
    /// Text between SELECT and FROM, split on `, ` (bit-exact legacy output).
    #[default]
    QueryText,
    /// Column names from the engine's result metadata.
    ResultColumns,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTable {
    pub title_line: String,
    pub separator_line: String,
    pub row_lines: Vec<String>,
}

impl RenderedTable {
    /// All lines, each newline-terminated.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.lines() {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title_line.as_str())
            .chain(std::iter::once(self.separator_line.as_str()))
            .chain(self.row_lines.iter().map(String::as_str))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_text()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write results file")
                .with_path(path)
                .with_source(err)
        })
    }
}

/// `results_<basename>` next to the query file.
pub fn results_path_for(query_path: &Path) -> PathBuf {
    let name = query_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "query.txt".to_string());
    let file_name = format!("results_{name}");
    match query_path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

pub fn extract_titles(query_text: &str) -> Result<Vec<String>, Error> {
    let lowered = query_text.to_ascii_lowercase();
    let span = find_keyword(&lowered, "select", 0).and_then(|(_, select_end)| {
        find_keyword(&lowered, "from", select_end).map(|(from_start, _)| (select_end, from_start))
    });
    let Some((start, end)) = span else {
        return Err(title_error("no SELECT ... FROM span in query"));
    };
    let projection = query_text[start..end].trim();
    if projection.is_empty() {
        return Err(title_error("empty column list between SELECT and FROM"));
    }
    Ok(projection
        .split(", ")
        .map(|title| title.trim().to_string())
        .collect())
}

fn title_error(message: &str) -> Error {
    Error::new(ErrorKind::TitleParse)
        .with_message(message)
        .with_hint("Use --titles columns to take titles from the result metadata.")
}

/// Byte range of `keyword` in `haystack` at or after `from`, on word boundaries.
fn find_keyword(haystack: &str, keyword: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let mut offset = from;
    while let Some(found) = haystack.get(offset..)?.find(keyword) {
        let start = offset + found;
        let end = start + keyword.len();
        let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return Some((start, end));
        }
        offset = end;
    }
    None
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte >= 0x80
}

/// Legacy contract: titles from the query text, rows as fetched.
pub fn render(query_text: &str, rows: &[Vec<Cell>]) -> Result<RenderedTable, Error> {
    let titles = extract_titles(query_text)?;
    if let Some(row) = rows.iter().find(|row| row.len() != titles.len()) {
        return Err(title_count_error(titles.len(), row.len()));
    }
    Ok(render_with_titles(&titles, rows))
}

pub fn render_result(result: &QueryResult, source: TitleSource) -> Result<RenderedTable, Error> {
    let titles = match source {
        TitleSource::QueryText => {
            let titles = extract_titles(&result.query_text)?;
            if titles.len() != result.column_count() {
                return Err(title_count_error(titles.len(), result.column_count()));
            }
            titles
        }
        TitleSource::ResultColumns => result.columns.clone(),
    };
    Ok(render_with_titles(&titles, &result.rows))
}

fn title_count_error(titles: usize, columns: usize) -> Error {
    title_error(&format!(
        "query text names {titles} columns but the result has {columns}"
    ))
}

fn render_with_titles(titles: &[String], rows: &[Vec<Cell>]) -> RenderedTable {
    let titles = titles
        .iter()
        .map(|title| escape_line_breaks(title))
        .collect::<Vec<_>>();
    let normalized = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| escape_line_breaks(&cell.to_string()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut widths = titles
        .iter()
        .map(|title| title.chars().count())
        .collect::<Vec<_>>();
    for row in &normalized {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    debug!(?widths, rows = normalized.len(), "computed column widths");

    let separator_len = widths.iter().sum::<usize>() + COLUMN_PADDING * widths.len();
    RenderedTable {
        title_line: format_line(&titles, &widths),
        separator_line: "-".repeat(separator_len),
        row_lines: normalized
            .iter()
            .map(|row| format_line(row, &widths))
            .collect(),
    }
}

fn escape_line_breaks(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    text.replace('\r', "\\r").replace('\n', "\\n")
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(&format!("{cell:>pad$}", pad = width + COLUMN_PADDING));
    }
    line
}

/// A results file read back into titles and text cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTable {
    pub titles: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub fn column_count(&self) -> usize {
        self.titles.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Parse rendered text.
    ///
    /// A column edge is a position that ends a token on some line and is
    /// followed by at least three spaces on every line. Text with three inner
    /// spaces in the same position on every line (a title like `'a   b'`
    /// over no rows) reads as two columns.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut lines = text.lines();
        let title_line = lines
            .next()
            .ok_or_else(|| parse_error("missing title line"))?;
        let separator = lines
            .next()
            .ok_or_else(|| parse_error("missing separator line"))?;
        if separator.is_empty() || !separator.chars().all(|ch| ch == '-') {
            return Err(parse_error("second line is not a dash separator"));
        }

        let mut grid = vec![title_line.chars().collect::<Vec<_>>()];
        for line in lines {
            let chars = line.chars().collect::<Vec<_>>();
            if chars.len() != grid[0].len() {
                return Err(parse_error("row width differs from the title line"));
            }
            grid.push(chars);
        }

        let edges = column_edges(&grid);
        let mut cells = grid.iter().map(|line| slice_cells(line, &edges));
        let titles = cells.next().unwrap_or_default();
        Ok(Self {
            titles,
            rows: cells.collect(),
        })
    }
}

fn parse_error(message: &str) -> Error {
    Error::new(ErrorKind::Decode).with_message(format!("malformed results file: {message}"))
}

fn column_edges(grid: &[Vec<char>]) -> Vec<usize> {
    let width = grid.first().map_or(0, Vec::len);
    (1..=width)
        .filter(|&edge| {
            grid.iter().any(|line| line[edge - 1] != ' ')
                && grid.iter().all(|line| {
                    line[edge..(edge + COLUMN_PADDING).min(width)]
                        .iter()
                        .all(|ch| *ch == ' ')
                })
        })
        .collect()
}

fn slice_cells(chars: &[char], edges: &[usize]) -> Vec<String> {
    let mut start = 0usize;
    edges
        .iter()
        .map(|edge| {
            let end = (*edge).min(chars.len());
            let cell = chars[start.min(end)..end].iter().collect::<String>();
            start = end;
            cell.trim().to_string()
        })
        .collect()
}
