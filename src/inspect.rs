use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::{
    classify::{Classification, FieldKind},
    cli::{FieldsArgs, HeaderArgs},
    io_utils,
    schema::Schema,
    table,
    writer::MetricWriter,
};

pub fn load_schema(path: &Path) -> Result<Schema> {
    Schema::load(path).with_context(|| format!("Loading schema from {path:?}"))
}

pub fn execute_header(args: &HeaderArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_TSV_DELIMITER);
    let writer = MetricWriter::create(&schema, None, Some(delimiter))?;
    writer.finish().context("Writing header to stdout")?;
    Ok(())
}

pub fn execute_fields(args: &FieldsArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let classification = schema
        .classification()
        .with_context(|| format!("Classifying fields of {:?}", args.schema))?;
    let rows = field_rows(&classification);
    table::print_table(&["field", "columns", "kind", "type", "default"], &rows);
    info!(
        "{} field(s) across {} column(s)",
        classification.fields().len(),
        classification.header().len()
    );
    Ok(())
}

fn field_rows(classification: &Classification) -> Vec<Vec<String>> {
    classification
        .fields()
        .iter()
        .map(|field| {
            let ty = match &field.kind {
                FieldKind::Scalar { ty, .. } => ty.token(),
                FieldKind::List {
                    element,
                    optional_elements,
                    delimiter,
                    ..
                } => {
                    let element = if *optional_elements {
                        format!("{element}?")
                    } else {
                        element.to_string()
                    };
                    format!("{element} split on '{delimiter}'")
                }
                FieldKind::Pivot { members } => members.name().to_string(),
            };
            vec![
                field.name.clone(),
                field.columns().join(","),
                field.kind.label().to_string(),
                ty,
                field.default.clone().unwrap_or_default(),
            ]
        })
        .collect()
}
