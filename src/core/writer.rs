// JSON Lines encoding that keeps the header's column order.
use std::io::Write;

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::table::{Header, Row};

/// How keys and values are placed between the surrounding quotes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Escaping {
    /// Escape per JSON string rules; every line is valid JSON.
    #[default]
    Json,
    /// Copy text verbatim. Values containing `"` or `\` produce invalid JSON.
    Raw,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct WriteOptions {
    pub escaping: Escaping,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WriteOutcome {
    pub records: u64,
    pub bytes: u64,
}

/// Writes one JSON object per row, keys in header order, one `write_all` per row.
///
/// A row shorter than the header stops the run with `ErrorKind::Shape`; rows
/// already written stay in `out`. Extra trailing values are dropped.
pub fn write_jsonl<W: Write>(
    mut out: W,
    header: &Header,
    rows: &[Row],
    options: WriteOptions,
) -> Result<WriteOutcome, Error> {
    let mut outcome = WriteOutcome::default();
    let mut buf = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let record = index as u64 + 1;
        if row.len() < header.len() {
            let mut err = Error::new(ErrorKind::Shape)
                .with_message(format!(
                    "record has {} fields, header has {}",
                    row.len(),
                    header.len()
                ))
                .with_record(record);
            if let Some(line) = row.line() {
                err = err.with_line(line);
            }
            return Err(err);
        }

        buf.clear();
        encode_record(&mut buf, pairs(header, row), options.escaping)?;
        out.write_all(&buf).map_err(|err| {
            Error::from_io(err, "failed to write JSON line").with_record(record)
        })?;
        outcome.records += 1;
        outcome.bytes += buf.len() as u64;
    }

    out.flush()
        .map_err(|err| Error::from_io(err, "failed to flush output"))?;
    debug!(records = outcome.records, bytes = outcome.bytes, "wrote jsonl");
    Ok(outcome)
}

/// Header names zipped with row values, in header order.
pub fn pairs<'a>(header: &'a Header, row: &'a Row) -> impl Iterator<Item = (&'a str, &'a str)> {
    header
        .names()
        .iter()
        .zip(row.values())
        .map(|(key, value)| (key.as_str(), value.as_str()))
}

/// Appends `{"k":"v",...}\n` for the given ordered pairs.
pub fn encode_record<'a, I>(buf: &mut Vec<u8>, pairs: I, escaping: Escaping) -> Result<(), Error>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    buf.push(b'{');
    for (i, (key, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_str(buf, key, escaping)?;
        buf.push(b':');
        encode_str(buf, value, escaping)?;
    }
    buf.extend_from_slice(b"}\n");
    Ok(())
}

fn encode_str(buf: &mut Vec<u8>, text: &str, escaping: Escaping) -> Result<(), Error> {
    match escaping {
        Escaping::Json => serde_json::to_writer(&mut *buf, text).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("json string encode failed")
                .with_source(err)
        }),
        Escaping::Raw => {
            buf.push(b'"');
            buf.extend_from_slice(text.as_bytes());
            buf.push(b'"');
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Escaping, WriteOptions, encode_record, write_jsonl};
    use crate::core::error::ErrorKind;
    use crate::core::table::{Header, Row};
    use serde_json::Value;
    use std::io::{self, Write};

    fn header(names: &[&str]) -> Header {
        names.iter().copied().collect()
    }

    fn row(values: &[&str]) -> Row {
        values.iter().copied().collect()
    }

    fn render(header: &Header, rows: &[Row], escaping: Escaping) -> String {
        let mut out = Vec::new();
        write_jsonl(&mut out, header, rows, WriteOptions { escaping }).expect("write");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn keys_follow_header_order() {
        let header = header(&["name", "age", "city"]);
        let rows = [
            row(&["Bilguun B", "36", "Chicago"]),
            row(&["Kevin B", "5", "Chicago"]),
        ];
        let text = render(&header, &rows, Escaping::Json);
        assert_eq!(
            text,
            "{\"name\":\"Bilguun B\",\"age\":\"36\",\"city\":\"Chicago\"}\n\
             {\"name\":\"Kevin B\",\"age\":\"5\",\"city\":\"Chicago\"}\n"
        );
    }

    #[test]
    fn non_alphabetical_header_is_preserved() {
        let header = header(&["zeta", "alpha", "mid"]);
        let text = render(&header, &[row(&["1", "2", "3"])], Escaping::Json);
        assert_eq!(text, "{\"zeta\":\"1\",\"alpha\":\"2\",\"mid\":\"3\"}\n");
    }

    #[test]
    fn escaped_values_round_trip() {
        let header = header(&["quote", "path", "note"]);
        let rows = [row(&["say \"hi\"", "C:\\tmp", "two\nlines\t!"])];
        let text = render(&header, &rows, Escaping::Json);
        let value: Value = serde_json::from_str(text.trim_end()).expect("valid json");
        assert_eq!(value["quote"], "say \"hi\"");
        assert_eq!(value["path"], "C:\\tmp");
        assert_eq!(value["note"], "two\nlines\t!");
    }

    #[test]
    fn raw_values_are_copied_verbatim() {
        let header = header(&["quote"]);
        let text = render(&header, &[row(&["say \"hi\""])], Escaping::Raw);
        assert_eq!(text, "{\"quote\":\"say \"hi\"\"}\n");
    }

    #[test]
    fn no_rows_writes_nothing() {
        let text = render(&header(&["a", "b"]), &[], Escaping::Json);
        assert!(text.is_empty());
    }

    #[test]
    fn long_rows_drop_extra_values() {
        let text = render(&header(&["a", "b"]), &[row(&["1", "2", "3"])], Escaping::Json);
        assert_eq!(text, "{\"a\":\"1\",\"b\":\"2\"}\n");
    }

    #[test]
    fn short_row_fails_after_earlier_rows() {
        let header = header(&["a", "b", "c"]);
        let rows = [row(&["1", "2", "3"]), row(&["4", "5"]).with_line(3)];
        let mut out = Vec::new();
        let err = write_jsonl(&mut out, &header, &rows, WriteOptions::default())
            .expect_err("short row");
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(err.record(), Some(2));
        assert_eq!(err.line(), Some(3));
        assert_eq!(out, b"{\"a\":\"1\",\"b\":\"2\",\"c\":\"3\"}\n");
    }

    #[test]
    fn outcome_counts_records_and_bytes() {
        let header = header(&["a"]);
        let mut out = Vec::new();
        let outcome = write_jsonl(
            &mut out,
            &header,
            &[row(&["1"]), row(&["22"])],
            WriteOptions::default(),
        )
        .expect("write");
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.bytes, out.len() as u64);
    }

    #[test]
    fn encode_record_with_no_pairs_is_empty_object() {
        let mut buf = Vec::new();
        encode_record(&mut buf, [], Escaping::Json).expect("encode");
        assert_eq!(buf, b"{}\n");
    }

    struct FullDisk {
        writes: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes == 1 {
                return Err(io::Error::other("no space left on device"));
            }
            self.writes += 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_aborts_remaining_rows() {
        let header = header(&["a"]);
        let rows = [row(&["1"]), row(&["2"]), row(&["3"])];
        let mut sink = FullDisk { writes: 0 };
        let err = write_jsonl(&mut sink, &header, &rows, WriteOptions::default())
            .expect_err("full disk");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.record(), Some(2));
        assert_eq!(sink.writes, 1);
    }
}
