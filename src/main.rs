//! Purpose: `sqlitetools` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits receipts on stdout.
//! Invariants: Rendered tables and receipts go to stdout; logs and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod db_paths;
mod receipt_json;

use sqlitetools::api::{Error, ErrorKind, TitleSource, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing(cli.quiet);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, color_mode)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "sqlitetools",
    version,
    about = "Load CSV files into SQLite and render query results as text",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Mental model:
  - `load` turns a CSV file into rows of a table (optionally creating it)
  - `query` runs a SELECT and writes an aligned text table
"#,
    after_help = r#"EXAMPLES
  $ sqlitetools load -t people -f people.csv --new
  $ sqlitetools load -d shop.sq3 -t orders -f orders.csv
  $ sqlitetools query -d shop.sq3 -q monthly.sql          # writes results_monthly.sql
  $ sqlitetools query -d shop.sq3 --sql "SELECT name, total FROM orders" --stdout

LEARN MORE
  $ sqlitetools <command> --help
  Set RUST_LOG=debug to see every executed statement."#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(long, global = true, help = "Only log warnings and errors")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TitlesMode {
    /// Text between SELECT and FROM (bit-exact with older result files)
    Legacy,
    /// Column names reported by SQLite
    Columns,
}

impl From<TitlesMode> for TitleSource {
    fn from(value: TitlesMode) -> Self {
        match value {
            TitlesMode::Legacy => TitleSource::QueryText,
            TitlesMode::Columns => TitleSource::ResultColumns,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Insert a CSV file into a database table",
        long_about = r#"Insert a CSV file into a table of an SQLite database.

Column types are inferred from the file: integers become INTEGER, decimals REAL,
True/False INTEGER, everything else TEXT. Missing values are stored as NULL."#,
        after_help = r#"EXAMPLES
  $ sqlitetools load -t people -f people.csv --new
  $ sqlitetools load -d shop.sq3 -t orders -f orders.csv -e latin-1

NOTES
  - Without --database, the database is `new_database.sq3` next to the CSV file
  - Without --encoding, utf-8, latin-1 and utf-16 are tried in turn
  - Column names have `:`, `.`, spaces and `-` replaced with `_`
  - Table names only have spaces replaced with `_`
  - All rows are committed together; a failing row leaves the table unchanged"#
    )]
    Load(LoadArgs),
    #[command(
        arg_required_else_help = true,
        about = "Run a query and render the results as a text table",
        long_about = r#"Run a query against an SQLite database and render the result set
as right-aligned text columns (title line, dash separator, one line per row)."#,
        after_help = r#"EXAMPLES
  $ sqlitetools query -d shop.sq3 -q monthly.sql
  $ sqlitetools query -d shop.sq3 --sql "SELECT * FROM orders" --titles columns --stdout

NOTES
  - Semicolons are removed from the query; lines are joined with spaces
  - `--titles legacy` reads titles from the text between SELECT and FROM
  - Results go to results_<query file name> next to the query file"#
    )]
    Query(QueryArgs),
    #[command(
        about = "Print version info",
        after_help = r#"EXAMPLES
  $ sqlitetools version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ sqlitetools completion bash > ~/.local/share/bash-completion/completions/sqlitetools
  $ sqlitetools completion zsh > ~/.zfunc/_sqlitetools"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct LoadArgs {
    #[arg(
        short = 'd',
        long,
        help = "Database file (default: new_database.sq3 next to the CSV file)",
        value_hint = ValueHint::FilePath
    )]
    database: Option<PathBuf>,
    #[arg(short = 't', long, help = "Table to insert the rows into")]
    table: String,
    #[arg(short = 'n', long = "new", help = "Create the table before inserting")]
    create_new: bool,
    #[arg(
        short = 'f',
        long,
        help = "CSV file to insert",
        value_hint = ValueHint::FilePath
    )]
    file: PathBuf,
    #[arg(short = 'e', long, help = "Encoding of the CSV file (e.g. utf-8, latin-1)")]
    encoding: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(
        short = 'd',
        long,
        help = "Database file (must exist)",
        value_hint = ValueHint::FilePath
    )]
    database: PathBuf,
    #[command(flatten)]
    source: QuerySource,
    #[arg(
        long,
        default_value = "legacy",
        value_enum,
        help = "Where column titles come from: legacy|columns"
    )]
    titles: TitlesMode,
    #[arg(long, help = "Print the table instead of writing a results file")]
    stdout: bool,
    #[arg(
        short = 'o',
        long,
        help = "Results file path (default: results_<query file name>)",
        conflicts_with = "stdout",
        value_hint = ValueHint::FilePath
    )]
    output: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct QuerySource {
    #[arg(
        short = 'q',
        long = "query",
        help = "Text file holding the query",
        value_hint = ValueHint::FilePath
    )]
    query_file: Option<PathBuf>,
    #[arg(long, help = "Inline query text")]
    sql: Option<String>,
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Io => err.with_hint("I/O error. Check the path, permissions, and disk space."),
        ErrorKind::NotFound => err.with_hint("Check that the path exists."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let pretty = is_tty || color_mode.use_color(is_tty);
    let json = if pretty {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::UnsupportedType => "unsupported column type".to_string(),
        ErrorKind::TableAlreadyExists => "table already exists".to_string(),
        ErrorKind::Statement => "statement failed".to_string(),
        ErrorKind::Query => "query failed".to_string(),
        ErrorKind::TitleParse => "could not read column titles from query".to_string(),
        ErrorKind::Decode => "could not decode input".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    if let Some(statement) = err.statement() {
        inner.insert("statement".to_string(), json!(statement));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(row) = err.row() {
        lines.push(format!(
            "{} {row}",
            colorize_label("row:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(statement) = err.statement() {
        lines.push(format!(
            "{} {statement}",
            colorize_label("statement:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `sqlitetools --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "sqlitetools") else {
        return "Try `sqlitetools --help`.".to_string();
    };

    let parts = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect::<Vec<_>>();

    if parts.is_empty() {
        return "Try `sqlitetools --help`.".to_string();
    }
    format!("Try `sqlitetools {} --help`.", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn load_flags_parse() {
        let cli = Cli::try_parse_from([
            "sqlitetools", "load", "-t", "people", "-f", "people.csv", "-n", "-e", "latin-1",
        ])
        .expect("parse");
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert_eq!(args.table, "people");
        assert!(args.create_new);
        assert_eq!(args.encoding.as_deref(), Some("latin-1"));
        assert!(args.database.is_none());
    }

    #[test]
    fn query_requires_exactly_one_source() {
        let missing = Cli::try_parse_from(["sqlitetools", "query", "-d", "db.sq3"]);
        assert!(missing.is_err());
        let both = Cli::try_parse_from([
            "sqlitetools", "query", "-d", "db.sq3", "-q", "q.sql", "--sql", "SELECT a FROM t",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn error_json_carries_row_and_statement() {
        let err = Error::new(ErrorKind::Statement)
            .with_message("statement rejected by database")
            .with_row(3)
            .with_statement("INSERT INTO t (a) VALUES(1)");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Statement");
        assert_eq!(value["error"]["row"], 3);
        assert_eq!(value["error"]["statement"], "INSERT INTO t (a) VALUES(1)");
    }

    #[test]
    fn error_text_without_color_is_plain() {
        let err = Error::new(ErrorKind::TitleParse).with_hint("Use --titles columns.");
        let text = error_text(&err, false);
        assert_eq!(
            text,
            "error: could not read column titles from query\nhint: Use --titles columns."
        );
    }
}
