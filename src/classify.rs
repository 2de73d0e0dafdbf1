//! Schema classification: the one-time "compile" step that turns declared field types into the
//! closed set of [`FieldKind`]s the row codecs dispatch on.
//!
//! Classification is cached process-wide by [`SchemaId`]. Lookups take a read lock; a miss is
//! computed outside any lock and published with a write-locked `entry().or_insert`, so the first
//! writer wins and a racing duplicate is discarded. Failed classifications are not cached.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use log::debug;

use crate::{
    error::SchemaError,
    header,
    schema::{EnumDef, FieldType, Schema, ScalarType, SchemaId},
};

type ClassificationCache = RwLock<HashMap<SchemaId, Arc<Classification>>>;

static CLASSIFICATIONS: OnceLock<ClassificationCache> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar {
        ty: ScalarType,
        optional: bool,
    },
    List {
        element: ScalarType,
        optional: bool,
        optional_elements: bool,
        delimiter: String,
    },
    Pivot {
        members: EnumDef,
    },
}

impl FieldKind {
    pub fn is_optional(&self) -> bool {
        match self {
            FieldKind::Scalar { optional, .. } | FieldKind::List { optional, .. } => *optional,
            FieldKind::Pivot { .. } => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Scalar {
                optional: false, ..
            } => "scalar",
            FieldKind::Scalar { optional: true, .. } => "optional scalar",
            FieldKind::List {
                optional: false, ..
            } => "list",
            FieldKind::List { optional: true, .. } => "optional list",
            FieldKind::Pivot { .. } => "pivot",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedField {
    pub name: String,
    /// Column used in files (alias or name). Pivot fields own their member columns instead.
    pub column: String,
    pub kind: FieldKind,
    pub default: Option<String>,
}

impl ClassifiedField {
    /// Columns this field occupies in a file header, in order.
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            FieldKind::Pivot { members } => members.members().iter().map(String::as_str).collect(),
            _ => vec![self.column.as_str()],
        }
    }

    pub fn is_required(&self) -> bool {
        !self.kind.is_optional() && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    schema_id: SchemaId,
    fields: Vec<ClassifiedField>,
    pivot: Option<usize>,
    header: Vec<String>,
}

impl Classification {
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn fields(&self) -> &[ClassifiedField] {
        &self.fields
    }

    pub fn pivot(&self) -> Option<&ClassifiedField> {
        self.pivot.map(|idx| &self.fields[idx])
    }

    /// Output columns in order; see [`header::plan`].
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn diagnose_header(&self, headers: &[String]) -> header::HeaderReport {
        header::diagnose(self, headers)
    }
}

/// Classifies every field of `schema` without consulting the cache.
pub fn classify(schema: &Schema) -> Result<Classification, SchemaError> {
    if schema.fields().is_empty() {
        return Err(SchemaError::Empty);
    }

    let mut seen = HashSet::new();
    if let Some(dup) = schema.fields().iter().find(|field| !seen.insert(field.name())) {
        return Err(SchemaError::DuplicateField(dup.name().to_string()));
    }

    let counters = schema
        .fields()
        .iter()
        .filter(|field| matches!(field.field_type(), FieldType::Counter { .. }))
        .map(|field| field.name().to_string())
        .collect::<Vec<_>>();
    if counters.len() > 1 {
        return Err(SchemaError::MultipleCounters(counters));
    }

    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut pivot = None;
    for (idx, field) in schema.fields().iter().enumerate() {
        let kind = match field.field_type() {
            FieldType::Scalar { ty, optional } => {
                ensure_enum_valid(ty)?;
                FieldKind::Scalar {
                    ty: ty.clone(),
                    optional: *optional,
                }
            }
            FieldType::List {
                element,
                optional,
                optional_elements,
            } => {
                ensure_enum_valid(element)?;
                let delimiter = field.delimiter().unwrap_or(schema.list_delimiter());
                if delimiter.is_empty() {
                    return Err(SchemaError::EmptyListDelimiter(field.name().to_string()));
                }
                FieldKind::List {
                    element: element.clone(),
                    optional: *optional,
                    optional_elements: *optional_elements,
                    delimiter: delimiter.to_string(),
                }
            }
            FieldType::Counter { key, optional } => {
                if *optional {
                    return Err(SchemaError::OptionalCounter(field.name().to_string()));
                }
                let members = key
                    .as_enum()
                    .ok_or_else(|| SchemaError::CounterKeyNotEnum {
                        field: field.name().to_string(),
                        key: key.token(),
                    })?;
                members.ensure_valid()?;
                pivot = Some(idx);
                FieldKind::Pivot {
                    members: members.clone(),
                }
            }
        };
        fields.push(ClassifiedField {
            name: field.name().to_string(),
            column: field.column_name().to_string(),
            kind,
            default: field.default_value().map(str::to_string),
        });
    }

    let header = header::plan(&fields)?;
    Ok(Classification {
        schema_id: schema.id(),
        fields,
        pivot,
        header,
    })
}

/// Returns the cached classification for `schema`, classifying it on first use.
pub fn classification_for(schema: &Schema) -> Result<Arc<Classification>, SchemaError> {
    let cache = CLASSIFICATIONS.get_or_init(Default::default);
    let cached = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&schema.id())
        .cloned();
    if let Some(found) = cached {
        return Ok(found);
    }

    let computed = Arc::new(classify(schema)?);
    debug!(
        "Classified schema {:?}: {} field(s), {} column(s)",
        schema.id(),
        computed.fields().len(),
        computed.header().len()
    );
    let mut map = cache.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(map.entry(schema.id()).or_insert(computed)))
}

fn ensure_enum_valid(ty: &ScalarType) -> Result<(), SchemaError> {
    match ty.as_enum() {
        Some(def) => def.ensure_valid(),
        None => Ok(()),
    }
}
