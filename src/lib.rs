//! Purpose: Library crate behind the `sqlitetools` CLI and its tests.
//! Exports: `api` (ingestion pipeline, query execution, result rendering, errors).
//! Role: Keeps the engine testable without the binary; `core` stays private.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: Every operation scopes its storage connection to one call.
pub mod api;
mod core;
