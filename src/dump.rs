use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::DumpArgs,
    inspect::load_schema,
    io_utils,
    reader::{MetricReader, ReadOptions},
};

pub fn execute(args: &DumpArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let options = ReadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let reader = MetricReader::open(&schema, &args.input, options)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut emitted = 0usize;
    for result in reader.take(limit) {
        let record = result.with_context(|| format!("Reading {:?}", args.input))?;
        serde_json::to_writer(&mut out, &record).context("Serializing record to JSON")?;
        writeln!(out)?;
        emitted += 1;
    }
    out.flush()?;
    info!("Dumped {emitted} record(s) from {:?}", args.input);
    Ok(())
}
