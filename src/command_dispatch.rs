//! Purpose: Hold top-level CLI command dispatch for `sqlitetools`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command opens at most one database connection and releases it before returning.
//! Invariants: Only `query --stdout` writes the rendered table to stdout.

use std::path::{Path, PathBuf};

use sqlitetools::api::{
    FileIngestOptions, clean_query_text, ingest_file, query_database, read_query_file,
    render_result, results_path_for,
};
use tracing::info;

use super::*;
use crate::db_paths::default_database_path;
use crate::receipt_json::{load_receipt_json, query_receipt_json};

const INLINE_RESULTS_FILE: &str = "results_query.txt";

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "sqlitetools", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            if io::stdout().is_terminal() {
                println!("sqlitetools {}", env!("CARGO_PKG_VERSION"));
            } else {
                emit_json(
                    json!({
                        "name": "sqlitetools",
                        "version": env!("CARGO_PKG_VERSION"),
                    }),
                    color_mode,
                );
            }
            Ok(RunOutcome::ok())
        }
        Command::Load(args) => run_load(args, color_mode),
        Command::Query(args) => run_query(args, color_mode),
    }
}

fn run_load(args: LoadArgs, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    if args.table.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("table name is empty")
            .with_hint("Provide a table name with -t/--table."));
    }
    let database = args
        .database
        .clone()
        .unwrap_or_else(|| default_database_path(&args.file));
    let options = FileIngestOptions {
        create_new: args.create_new,
        encoding: args.encoding.clone(),
    };
    let report = ingest_file(&database, &args.file, &args.table, &options)?;

    if io::stdout().is_terminal() {
        println!(
            "File '{}' inserted in the table '{}' in the database '{}' ({} rows).",
            display_name(&report.file),
            report.summary.table,
            display_name(&report.database),
            report.summary.rows_inserted
        );
    } else {
        emit_json(load_receipt_json(&report), color_mode);
    }
    Ok(RunOutcome::ok())
}

fn run_query(args: QueryArgs, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    let query_text = match (&args.source.query_file, &args.source.sql) {
        (Some(path), _) => read_query_file(path)?,
        (None, Some(sql)) => clean_query_text(sql),
        (None, None) => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("missing query")
                .with_hint("Provide -q/--query <file> or --sql <text>."));
        }
    };
    if query_text.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("query is empty")
            .with_hint("The query file holds no statement after removing semicolons."));
    }

    let result = query_database(&args.database, &query_text)?;
    let table = render_result(&result, args.titles.into())?;

    if args.stdout {
        print!("{}", table.to_text());
        return Ok(RunOutcome::ok());
    }

    let output = output_path(&args);
    table.write_to(&output)?;
    info!(output = %output.display(), rows = result.row_count(), "wrote results");

    if io::stdout().is_terminal() {
        println!(
            "Wrote {} rows x {} columns to {}.",
            result.row_count(),
            result.column_count(),
            output.display()
        );
    } else {
        emit_json(query_receipt_json(&output, &result), color_mode);
    }
    Ok(RunOutcome::ok())
}

fn output_path(args: &QueryArgs) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }
    match &args.source.query_file {
        Some(path) => results_path_for(path),
        None => PathBuf::from(INLINE_RESULTS_FILE),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
