// Core modules implementing ingestion, storage, querying and rendering.
pub mod dataset;
pub mod encode;
pub mod error;
pub mod ident;
pub mod ingest;
pub mod insert;
pub mod query;
pub mod render;
pub mod schema;
pub mod storage;
pub mod types;
