//! Typed records over delimited text.
//!
//! A [`Schema`] declares the fields of a metric record. Each field is a scalar, a delimited list
//! packed into one cell, or a single counter over an enum that is pivoted across one column per
//! enum member. [`MetricReader`] turns a file into [`Record`]s row by row and [`MetricWriter`]
//! writes them back in a deterministic column order.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use metric_rows::{MetricReader, ReadOptions, Schema};
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = Schema::load(Path::new("pileup.schema.yml"))?;
//! for record in MetricReader::open(&schema, Path::new("pileup.txt"), ReadOptions::default())? {
//!     let record = record?;
//!     println!("{:?}", record.counts("counts"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod classify;
pub mod cli;
pub mod codec;
pub mod convert;
pub mod data;
pub mod dump;
pub mod error;
pub mod header;
pub mod inspect;
pub mod io_utils;
pub mod list;
pub mod pivot;
pub mod reader;
pub mod record;
pub mod schema;
pub mod table;
mod validate;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

pub use crate::{
    classify::{Classification, ClassifiedField, FieldKind},
    codec::RecordCodec,
    data::Value,
    error::{Error, FieldIssue, SchemaError, ValidationError},
    reader::{MetricReader, ReadOptions},
    record::{Counts, FieldValue, RawRow, Record},
    schema::{EnumDef, FieldSpec, FieldType, ScalarType, Schema, SchemaBuilder},
    writer::MetricWriter,
};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("metric_rows", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Header(args) => inspect::execute_header(&args),
        Commands::Fields(args) => inspect::execute_fields(&args),
        Commands::Check(args) => check::execute(&args),
        Commands::Convert(args) => convert::execute(&args),
        Commands::Dump(args) => dump::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
