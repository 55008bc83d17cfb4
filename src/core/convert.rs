// File-level conversion: open input, create output, read table, write lines.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::reader::read_table;
use crate::core::table::Table;
use crate::core::writer::{WriteOptions, WriteOutcome, write_jsonl};

#[derive(Copy, Clone, Debug, Default)]
pub struct ConvertOptions {
    pub write: WriteOptions,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ConvertOutcome {
    pub columns: usize,
    pub records: u64,
    pub bytes_written: u64,
}

impl ConvertOutcome {
    fn new(table: &Table, written: WriteOutcome) -> Self {
        Self {
            columns: table.header.len(),
            records: written.records,
            bytes_written: written.bytes,
        }
    }
}

/// Converts CSV read from `input` into JSON Lines written to `output`.
pub fn convert<R: Read, W: Write>(
    input: R,
    output: W,
    options: ConvertOptions,
) -> Result<ConvertOutcome, Error> {
    let table = read_table(input)?;
    let written = write_jsonl(output, &table.header, &table.rows, options.write)?;
    Ok(ConvertOutcome::new(&table, written))
}

/// Converts the CSV file at `input` into a JSON Lines file at `output`.
///
/// The input is opened before the output is created, so a missing input
/// leaves no output file behind. The output is truncated if it exists. Both
/// handles are closed on every return path.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: ConvertOptions,
) -> Result<ConvertOutcome, Error> {
    let csv_file = File::open(input)
        .map_err(|err| Error::from_io(err, "failed to open input file").with_path(input))?;
    let jsonl_file = File::create(output)
        .map_err(|err| Error::from_io(err, "failed to create output file").with_path(output))?;
    debug!(input = %input.display(), output = %output.display(), "converting");

    let table = read_table(csv_file).map_err(|err| err.with_path(input))?;
    let written = write_jsonl(jsonl_file, &table.header, &table.rows, options.write)
        .map_err(|err| match err.kind() {
            ErrorKind::Shape => err.with_path(input),
            _ => err.with_path(output),
        })?;
    Ok(ConvertOutcome::new(&table, written))
}
