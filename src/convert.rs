use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::ConvertArgs,
    error::Error,
    inspect::load_schema,
    io_utils,
    reader::{MetricReader, ReadOptions},
    writer::MetricWriter,
};

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let input_delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        input_delimiter,
    );
    let options = ReadOptions {
        delimiter: Some(input_delimiter),
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };

    let reader = MetricReader::open(&schema, &args.input, options)?;
    let mut writer =
        MetricWriter::create(&schema, args.output.as_deref(), Some(output_delimiter))?;
    let mut skipped = 0u64;
    for result in reader {
        let record = match result {
            Ok(record) => record,
            Err(err @ Error::Row { .. }) if args.skip_invalid => {
                warn!("Skipping {err}");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("Reading {:?}", args.input)),
        };
        writer.write(&record).context("Writing converted record")?;
    }
    let written = writer.rows_written();
    writer.finish().context("Flushing converted output")?;

    info!(
        "Converted {} row(s) from {:?} with delimiter '{}' to '{}'",
        written,
        args.input,
        crate::printable_delimiter(input_delimiter),
        crate::printable_delimiter(output_delimiter)
    );
    if skipped > 0 {
        warn!("Skipped {skipped} invalid row(s)");
    }
    Ok(())
}
