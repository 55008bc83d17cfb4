//! Purpose: Define the public Rust API boundary for csvtojl.
//! Exports: Conversion entry points, table model, writer options, and errors.
//! Role: Stable surface used by the CLI and integration tests.
//! Invariants: This module is the only public path the binary uses into `core`.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::convert::{ConvertOptions, ConvertOutcome, convert, convert_file};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::profile::{ProfileReport, ProfileStatus, Profiler};
pub use crate::core::reader::read_table;
pub use crate::core::table::{Header, Row, Table};
pub use crate::core::writer::{Escaping, WriteOptions, WriteOutcome, encode_record, pairs, write_jsonl};
