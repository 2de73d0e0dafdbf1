//! Writer that emits typed [`Record`]s in the planned header order.

use std::{io::Write, path::Path};

use anyhow::Context;
use log::debug;

use crate::{
    codec::RecordCodec,
    error::{Error, Result},
    io_utils,
    record::Record,
    schema::Schema,
};

/// Writes the header once, on construction, then one row per record.
pub struct MetricWriter<W: Write = Box<dyn Write>> {
    writer: csv::Writer<W>,
    codec: RecordCodec,
    rows_written: u64,
}

impl MetricWriter<Box<dyn Write>> {
    /// Creates `path` (stdout when absent or `-`). The delimiter follows the extension, falling
    /// back to tab.
    pub fn create(
        schema: &Schema,
        path: Option<&Path>,
        delimiter: Option<u8>,
    ) -> anyhow::Result<Self> {
        let delimiter =
            io_utils::resolve_output_delimiter(path, delimiter, io_utils::DEFAULT_TSV_DELIMITER);
        let output = io_utils::open_output(path)?;
        let writer = MetricWriter::from_writer(schema, output, delimiter)
            .with_context(|| format!("Writing header to {path:?}"))?;
        debug!(
            "Writing {} column(s) with delimiter '{}'",
            writer.header().len(),
            crate::printable_delimiter(delimiter)
        );
        Ok(writer)
    }
}

impl<W: Write> MetricWriter<W> {
    pub fn from_writer(schema: &Schema, output: W, delimiter: u8) -> Result<Self> {
        let codec = RecordCodec::new(schema)?;
        let mut writer = io_utils::open_csv_writer(output, delimiter);
        writer.write_record(codec.header())?;
        Ok(Self {
            writer,
            codec,
            rows_written: 0,
        })
    }

    pub fn header(&self) -> &[String] {
        self.codec.header()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Encodes and writes one record. Nothing is written when the record fails validation.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        let row = self.codec.encode(record)?;
        self.writer.write_record(row.values())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Writes records in order, stopping at the first failure. Returns the number written.
    pub fn write_all<'a, I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut count = 0;
        for record in records {
            self.write(record)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}
