//! Record schema declarations and YAML persistence.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s plus the schema-wide list delimiter. It is
//! immutable once built, either through [`SchemaBuilder`] or by loading a YAML schema file:
//!
//! ```yaml
//! list_delimiter: ","
//! enums:
//!   Base: [A, C, G, T]
//! fields:
//!   - { name: pos, type: integer }
//!   - { name: tags, type: list<string>, optional: true, delimiter: ";" }
//!   - { name: counts, type: counter<Base> }
//! ```
//!
//! Every schema carries a process-unique [`SchemaId`] that keys the classification cache in
//! [`crate::classify`].

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classify::{self, Classification},
    error::SchemaError,
};

pub const DEFAULT_LIST_DELIMITER: &str = ",";

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A closed set of member strings, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    members: Arc<[String]>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, value: &str) -> bool {
        self.members.iter().any(|member| member == value)
    }

    pub(crate) fn ensure_valid(&self) -> Result<(), SchemaError> {
        if self.members.is_empty() {
            return Err(SchemaError::EmptyEnum(self.name.clone()));
        }
        for (idx, member) in self.members.iter().enumerate() {
            if self.members[..idx].contains(member) {
                return Err(SchemaError::DuplicateMember {
                    name: self.name.clone(),
                    member: member.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Guid,
    Enum(EnumDef),
}

impl ScalarType {
    pub fn token(&self) -> String {
        match self {
            ScalarType::String => "string".to_string(),
            ScalarType::Integer => "integer".to_string(),
            ScalarType::Float => "float".to_string(),
            ScalarType::Boolean => "boolean".to_string(),
            ScalarType::Date => "date".to_string(),
            ScalarType::DateTime => "datetime".to_string(),
            ScalarType::Guid => "guid".to_string(),
            ScalarType::Enum(def) => def.name().to_string(),
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match self {
            ScalarType::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// Resolves a scalar token, falling back to the declared enums by name.
    fn parse(
        field: &str,
        token: &str,
        enums: &BTreeMap<String, EnumDef>,
    ) -> Result<Self, SchemaError> {
        let normalized = token.trim().to_ascii_lowercase();
        let parsed = match normalized.as_str() {
            "string" | "str" => ScalarType::String,
            "integer" | "int" => ScalarType::Integer,
            "float" | "double" => ScalarType::Float,
            "boolean" | "bool" => ScalarType::Boolean,
            "date" => ScalarType::Date,
            "datetime" | "timestamp" => ScalarType::DateTime,
            "guid" | "uuid" => ScalarType::Guid,
            _ => match enums.get(token.trim()) {
                Some(def) => ScalarType::Enum(def.clone()),
                None => {
                    return Err(SchemaError::UnknownEnum {
                        field: field.to_string(),
                        name: token.trim().to_string(),
                    });
                }
            },
        };
        Ok(parsed)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar {
        ty: ScalarType,
        optional: bool,
    },
    List {
        element: ScalarType,
        optional: bool,
        optional_elements: bool,
    },
    /// A counting map. Only enum keys are accepted when the schema is classified.
    Counter {
        key: ScalarType,
        optional: bool,
    },
}

impl FieldType {
    pub fn token(&self) -> String {
        match self {
            FieldType::Scalar { ty, .. } => ty.token(),
            FieldType::List { element, .. } => format!("list<{}>", element.token()),
            FieldType::Counter { key, .. } => format!("counter<{}>", key.token()),
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            FieldType::Scalar { optional, .. }
            | FieldType::List { optional, .. }
            | FieldType::Counter { optional, .. } => *optional,
        }
    }

    fn set_optional(&mut self, value: bool) {
        match self {
            FieldType::Scalar { optional, .. }
            | FieldType::List { optional, .. }
            | FieldType::Counter { optional, .. } => *optional = value,
        }
    }

    fn parse(
        field: &str,
        token: &str,
        enums: &BTreeMap<String, EnumDef>,
    ) -> Result<Self, SchemaError> {
        let trimmed = token.trim();
        let invalid = |reason: &str| SchemaError::InvalidType {
            field: field.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        };
        if let Some((outer, rest)) = trimmed.split_once('<') {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| invalid("generic type must close with '>'"))?;
            if inner.contains(['<', '>']) {
                return Err(invalid("nested collections are not supported"));
            }
            let inner = ScalarType::parse(field, inner, enums)?;
            return match outer.trim().to_ascii_lowercase().as_str() {
                "list" => Ok(FieldType::List {
                    element: inner,
                    optional: false,
                    optional_elements: false,
                }),
                "counter" => Ok(FieldType::Counter {
                    key: inner,
                    optional: false,
                }),
                _ => Err(invalid("expected list<T> or counter<Enum>")),
            };
        }
        Ok(FieldType::Scalar {
            ty: ScalarType::parse(field, trimmed, enums)?,
            optional: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    alias: Option<String>,
    ty: FieldType,
    delimiter: Option<String>,
    default: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            ty,
            delimiter: None,
            default: None,
        }
    }

    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::new(
            name,
            FieldType::Scalar {
                ty,
                optional: false,
            },
        )
    }

    pub fn list(name: impl Into<String>, element: ScalarType) -> Self {
        Self::new(
            name,
            FieldType::List {
                element,
                optional: false,
                optional_elements: false,
            },
        )
    }

    pub fn counter(name: impl Into<String>, key: ScalarType) -> Self {
        Self::new(
            name,
            FieldType::Counter {
                key,
                optional: false,
            },
        )
    }

    pub fn optional(mut self) -> Self {
        self.ty.set_optional(true);
        self
    }

    /// List elements may be null; an empty segment decodes to a null element.
    pub fn optional_elements(mut self) -> Self {
        if let FieldType::List {
            optional_elements, ..
        } = &mut self.ty
        {
            *optional_elements = true;
        }
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Raw cell text used when the field's column is missing from a row.
    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|alias| !alias.is_empty())
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Column name used in files: the alias when one is set.
    pub fn column_name(&self) -> &str {
        self.alias().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    id: SchemaId,
    fields: Vec<FieldSpec>,
    list_delimiter: String,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.list_delimiter == other.list_delimiter
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self::builder().fields(fields).build()
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn list_delimiter(&self) -> &str {
        &self.list_delimiter
    }

    /// The cached classification for this schema, computing it on first use.
    pub fn classification(&self) -> Result<Arc<Classification>, SchemaError> {
        classify::classification_for(self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let document: SchemaDocument =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        let schema = Schema::try_from(document)
            .with_context(|| format!("Resolving field types in {path:?}"))?;
        Ok(schema)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let document: SchemaDocument =
            serde_yaml::from_str(input).context("Parsing schema YAML")?;
        Ok(Schema::try_from(document)?)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&SchemaDocument::from(self)).context("Serializing schema to YAML")
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
    list_delimiter: Option<String>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn list_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.list_delimiter = Some(delimiter.into());
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            id: SchemaId::next(),
            fields: self.fields,
            list_delimiter: self
                .list_delimiter
                .unwrap_or_else(|| DEFAULT_LIST_DELIMITER.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(default = "default_list_delimiter")]
    list_delimiter: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    enums: BTreeMap<String, Vec<String>>,
    fields: Vec<FieldEntry>,
}

fn default_list_delimiter() -> String {
    DEFAULT_LIST_DELIMITER.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    optional_elements: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = SchemaError;

    fn try_from(document: SchemaDocument) -> Result<Self, Self::Error> {
        let enums = document
            .enums
            .into_iter()
            .map(|(name, members)| {
                let def = EnumDef::new(name.clone(), members);
                (name, def)
            })
            .collect::<BTreeMap<_, _>>();

        let mut builder = Schema::builder().list_delimiter(document.list_delimiter);
        for entry in document.fields {
            let ty = FieldType::parse(&entry.name, &entry.datatype, &enums)?;
            let mut field = FieldSpec::new(entry.name, ty);
            if entry.optional {
                field = field.optional();
            }
            if entry.optional_elements {
                field = field.optional_elements();
            }
            field.alias = entry.alias;
            field.delimiter = entry.delimiter;
            field.default = entry.default;
            builder = builder.field(field);
        }
        Ok(builder.build())
    }
}

impl From<&Schema> for SchemaDocument {
    fn from(schema: &Schema) -> Self {
        let mut enums = BTreeMap::new();
        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let (scalar, optional_elements) = match &field.ty {
                FieldType::Scalar { ty, .. } => (ty, false),
                FieldType::List {
                    element,
                    optional_elements,
                    ..
                } => (element, *optional_elements),
                FieldType::Counter { key, .. } => (key, false),
            };
            if let ScalarType::Enum(def) = scalar {
                enums.insert(def.name().to_string(), def.members().to_vec());
            }
            fields.push(FieldEntry {
                name: field.name.clone(),
                datatype: field.ty.token(),
                alias: field.alias.clone(),
                optional: field.ty.is_optional(),
                optional_elements,
                delimiter: field.delimiter.clone(),
                default: field.default.clone(),
            });
        }
        SchemaDocument {
            list_delimiter: schema.list_delimiter.clone(),
            enums,
            fields,
        }
    }
}
