//! Streaming reader that turns a delimited file into typed [`Record`]s.

use std::{io::Read, path::Path};

use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

use crate::{
    codec::RecordCodec,
    error::{Error, Result},
    io_utils,
    record::{RawRow, Record},
    schema::Schema,
};

/// Tokenizer and text decoding settings for [`MetricReader`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Field delimiter; resolved from the file extension when unset.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

impl ReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Yields one `Result<Record, Error>` per data row. A row that fails validation surfaces as
/// [`Error::Row`] carrying its line number; iteration continues with the next row.
pub struct MetricReader<R: Read = Box<dyn Read>> {
    reader: csv::Reader<R>,
    codec: RecordCodec,
    headers: Vec<String>,
    encoding: &'static Encoding,
    record: csv::ByteRecord,
    rows_read: u64,
    done: bool,
}

impl MetricReader<Box<dyn Read>> {
    /// Opens `path` (or stdin for `-`).
    pub fn open(schema: &Schema, path: &Path, options: ReadOptions) -> anyhow::Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let input = io_utils::open_input(path)?;
        let reader = MetricReader::from_reader(schema, input, options.with_delimiter(delimiter))
            .with_context(|| format!("Reading header of {path:?}"))?;
        debug!(
            "Opened {:?} with delimiter '{}' and {} column(s)",
            path,
            crate::printable_delimiter(delimiter),
            reader.headers().len()
        );
        Ok(reader)
    }
}

impl<R: Read> MetricReader<R> {
    /// Wraps any byte source. Without an explicit delimiter the file is read as tab-separated.
    pub fn from_reader(schema: &Schema, input: R, options: ReadOptions) -> Result<Self> {
        let codec = RecordCodec::new(schema)?;
        let delimiter = options
            .delimiter
            .unwrap_or(io_utils::DEFAULT_TSV_DELIMITER);
        let mut reader = io_utils::open_csv_reader(input, delimiter);
        let headers = io_utils::reader_headers(&mut reader, options.encoding)?;

        let report = codec.classification().diagnose_header(&headers);
        if !report.unexpected.is_empty() {
            warn!(
                "Ignoring column(s) the schema does not read: {}",
                report.unexpected.join(", ")
            );
        }
        if !report.missing.is_empty() {
            warn!(
                "Header lacks required column(s): {}; every row will fail validation",
                report.missing.join(", ")
            );
        }

        Ok(Self {
            reader,
            codec,
            headers,
            encoding: options.encoding,
            record: csv::ByteRecord::new(),
            rows_read: 0,
            done: false,
        })
    }

    /// The file header as read, without a leading byte-order mark.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Data rows consumed so far, including rows that failed.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn decode_current(&self) -> Result<Record> {
        let line = self
            .record
            .position()
            .map(|position| position.line())
            .unwrap_or(self.rows_read + 1);
        let cells = io_utils::decode_record(&self.record, self.encoding)?;
        let row = RawRow::from_columns(&self.headers, &cells);
        self.codec
            .decode(&row)
            .map_err(|source| Error::Row { line, source })
    }
}

impl<R: Read> Iterator for MetricReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                self.rows_read += 1;
                Some(self.decode_current())
            }
            Err(err) => {
                if err.is_io_error() {
                    self.done = true;
                } else {
                    self.rows_read += 1;
                }
                Some(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        schema::{EnumDef, FieldSpec, ScalarType},
    };

    fn metric_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::scalar("name", ScalarType::String),
            FieldSpec::scalar("count", ScalarType::Integer),
        ])
    }

    #[test]
    fn reads_tab_separated_rows_lazily() {
        let data = "name\tcount\nfoo\t1\nbar\t2\n";
        let schema = metric_schema();
        let mut reader =
            MetricReader::from_reader(&schema, data.as_bytes(), ReadOptions::default()).unwrap();
        assert_eq!(reader.headers(), ["name", "count"]);

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.scalar("name"), Some(&Value::from("foo")));
        assert_eq!(reader.rows_read(), 1);
        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.scalar("count"), Some(&Value::Integer(2)));
        assert!(reader.next().is_none());
    }

    #[test]
    fn bom_and_extra_columns_are_tolerated() {
        let data = "\u{feff}name\tcount\tcomment\nfoo\t3\tignored\n";
        let schema = metric_schema();
        let records = MetricReader::from_reader(&schema, data.as_bytes(), ReadOptions::default())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 2);
        assert_eq!(records[0].scalar("count"), Some(&Value::Integer(3)));
    }

    #[test]
    fn row_failures_carry_line_numbers_and_iteration_continues() {
        let data = "name\tcount\nfoo\t1\nbar\tmany\nbaz\t3\n";
        let schema = metric_schema();
        let results = MetricReader::from_reader(&schema, data.as_bytes(), ReadOptions::default())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 3);
        match &results[1] {
            Err(Error::Row { line, source }) => {
                assert_eq!(*line, 3);
                assert_eq!(source.fields().collect::<Vec<_>>(), vec!["count"]);
            }
            other => panic!("expected row error, got {other:?}"),
        }
        assert!(results[2].is_ok());
    }

    #[test]
    fn pivot_columns_read_from_comma_separated_input() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("pos", ScalarType::Integer),
            FieldSpec::counter(
                "counts",
                ScalarType::Enum(EnumDef::new("Base", ["A", "C", "G", "T"])),
            ),
        ]);
        let data = "pos,A,T\n12,4,1\n";
        let options = ReadOptions::default().with_delimiter(b',');
        let record = MetricReader::from_reader(&schema, data.as_bytes(), options)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let counts = record.counts("counts").unwrap();
        assert_eq!(counts.get("A"), 4);
        assert_eq!(counts.get("C"), 0);
        assert_eq!(counts.get("T"), 1);
    }

    #[test]
    fn ragged_rows_are_reported() {
        let data = "name\tcount\nfoo\n";
        let schema = metric_schema();
        let mut reader =
            MetricReader::from_reader(&schema, data.as_bytes(), ReadOptions::default()).unwrap();
        assert!(matches!(reader.next(), Some(Err(Error::Csv(_)))));
    }

    #[test]
    fn invalid_schema_fails_before_reading() {
        let schema = Schema::new(Vec::new());
        let result = MetricReader::from_reader(&schema, "a\n".as_bytes(), ReadOptions::default());
        assert!(matches!(result, Err(Error::Schema(_))));
    }
}
