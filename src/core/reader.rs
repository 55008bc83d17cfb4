// CSV decoding into a fully materialized `Table`.
use std::io::Read;

use tracing::debug;

use crate::core::error::{Error, ErrorKind, io_error_kind};
use crate::core::table::{Header, Row, Table};

/// Reads every record of `reader`; the first record becomes the header.
///
/// Quoting is checked strictly before decoding. Rows are not checked against
/// the header length here.
pub fn read_table<R: Read>(mut reader: R) -> Result<Table, Error> {
    let mut input = Vec::new();
    reader
        .read_to_end(&mut input)
        .map_err(|err| Error::from_io(err, "failed to read csv input"))?;
    check_quoting(&input)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_slice());

    let header: Header = csv_reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .collect();
    if header.is_empty() {
        return Err(Error::new(ErrorKind::Empty)
            .with_message("input has no header row")
            .with_hint("The first CSV line must name the columns."));
    }

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        let mut row: Row = record.iter().collect();
        if let Some(position) = record.position() {
            row = row.with_line(position.line());
        }
        rows.push(row);
    }

    debug!(columns = header.len(), rows = rows.len(), "read csv table");
    Ok(Table { header, rows })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Rejects quoting the lenient decoder would otherwise accept: a quote inside
/// an unquoted field, text after a closing quote, and EOF inside quotes.
fn check_quoting(input: &[u8]) -> Result<(), Error> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1u64;
    let mut quote_line = 1u64;

    for &byte in input {
        state = match (state, byte) {
            (QuoteState::FieldStart, b'"') => {
                quote_line = line;
                QuoteState::Quoted
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, b',' | b'\n' | b'\r') => {
                QuoteState::FieldStart
            }
            (QuoteState::Unquoted, b'"') => {
                return Err(quote_error("bare quote in unquoted field", line));
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, b',' | b'\n' | b'\r') => QuoteState::FieldStart,
            (QuoteState::QuoteInQuoted, _) => {
                return Err(quote_error("unexpected text after closing quote", line));
            }
        };
        if byte == b'\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(quote_error("unterminated quoted field", quote_line));
    }
    Ok(())
}

fn quote_error(message: &str, line: u64) -> Error {
    Error::new(ErrorKind::Parse)
        .with_message(message)
        .with_line(line)
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map(|position| position.line());
    let mut mapped = match err.kind() {
        csv::ErrorKind::Io(io_err) => {
            Error::new(io_error_kind(io_err)).with_message("failed to read csv input")
        }
        csv::ErrorKind::Utf8 { .. } => Error::new(ErrorKind::Parse)
            .with_message("csv input is not valid UTF-8"),
        _ => Error::new(ErrorKind::Parse).with_message("failed to parse csv input"),
    };
    if let Some(line) = line {
        mapped = mapped.with_line(line);
    }
    mapped.with_source(err)
}
