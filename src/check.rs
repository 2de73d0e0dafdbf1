use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::info;

use crate::{
    cli::CheckArgs,
    error::Error,
    inspect::load_schema,
    io_utils,
    reader::{MetricReader, ReadOptions},
    schema::Schema,
};

/// Outcome of checking one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub rows: u64,
    pub failed: u64,
}

pub fn execute(args: &CheckArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let schema = load_schema(&args.schema)?;
    let mut failed_files = 0usize;
    for input in &args.inputs {
        let summary = check_file(&schema, input, args.delimiter, encoding, args.max_errors)?;
        if summary.failed == 0 {
            info!("✓ {:?}: {} row(s) valid", input, summary.rows);
        } else {
            info!(
                "✗ {:?}: {} of {} row(s) failed",
                input, summary.failed, summary.rows
            );
            failed_files += 1;
        }
    }
    if failed_files > 0 {
        return Err(anyhow!(
            "{failed_files} of {} file(s) failed validation",
            args.inputs.len()
        ));
    }
    Ok(())
}

/// Reads every row of `path`, printing up to `max_errors` failures (0 prints all).
pub fn check_file(
    schema: &Schema,
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    max_errors: usize,
) -> Result<CheckSummary> {
    let options = ReadOptions {
        delimiter,
        encoding,
    };
    let reader = MetricReader::open(schema, path, options)?;
    let mut summary = CheckSummary::default();
    for result in reader {
        summary.rows += 1;
        let err = match result {
            Ok(_) => continue,
            Err(Error::Csv(err)) if err.is_io_error() => {
                return Err(err).with_context(|| format!("Reading {path:?}"));
            }
            Err(err) => err,
        };
        summary.failed += 1;
        if max_errors == 0 || summary.failed <= max_errors as u64 {
            println!("{}: {err}", path.display());
        }
    }
    if max_errors > 0 && summary.failed > max_errors as u64 {
        println!(
            "{}: {} more failing row(s) not shown",
            path.display(),
            summary.failed - max_errors as u64
        );
    }
    Ok(summary)
}
