//! Header planning and header diagnosis.

use std::collections::HashMap;

use crate::{
    classify::{Classification, ClassifiedField, FieldKind},
    error::SchemaError,
};

/// Plans the output header: one column per scalar or list field (its alias, or its name), and
/// one column per member for the pivot field, in declaration order. Fails when two fields would
/// claim the same column, including an aliased field whose name is another field's column,
/// since the name is also read as a fallback.
pub fn plan(fields: &[ClassifiedField]) -> Result<Vec<String>, SchemaError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut header = Vec::with_capacity(fields.len());
    for field in fields {
        for column in field.columns() {
            if let Some(first) = owners.insert(column, field.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.to_string(),
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
            header.push(column.to_string());
        }
    }
    for field in fields {
        if matches!(field.kind, FieldKind::Pivot { .. }) || field.name == field.column {
            continue;
        }
        if let Some(owner) = owners.get(field.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                column: field.name.clone(),
                first: owner.to_string(),
                second: field.name.clone(),
            });
        }
    }
    Ok(header)
}

/// How a file header differs from what a schema reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderReport {
    /// Columns no field reads.
    pub unexpected: Vec<String>,
    /// Columns of required fields (no default) that the file lacks.
    pub missing: Vec<String>,
}

impl HeaderReport {
    pub fn is_clean(&self) -> bool {
        self.unexpected.is_empty() && self.missing.is_empty()
    }
}

pub fn diagnose(classification: &Classification, headers: &[String]) -> HeaderReport {
    let fields = classification.fields();
    let unexpected = headers
        .iter()
        .filter(|header| {
            !fields.iter().any(|field| {
                field.name == **header || field.columns().contains(&header.as_str())
            })
        })
        .cloned()
        .collect();
    let missing = fields
        .iter()
        .filter(|field| field.is_required() && !matches!(field.kind, FieldKind::Pivot { .. }))
        .filter(|field| {
            !headers
                .iter()
                .any(|header| *header == field.column || *header == field.name)
        })
        .map(|field| field.column.clone())
        .collect();
    HeaderReport {
        unexpected,
        missing,
    }
}
