//! Purpose: Library crate behind the `csvtojl` CLI and its tests.
//! Exports: `api` (conversion entry points, table model, errors) and `core`.
//! Role: Holds the CSV reader, ordered JSONL writer, and file orchestration.
//! Invariants: Output keys follow header order; records are never built as maps.
//! Invariants: Conversion is single-threaded and fully materializes the input.
pub mod api;
pub mod core;
