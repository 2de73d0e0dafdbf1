//! In-memory shapes on either side of the codec: [`RawRow`] (one line of a file, column name to
//! text) and [`Record`] (field name to typed [`FieldValue`]).

use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::data::Value;

/// One data line of a delimited file, as ordered `(column, text)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Pairs `headers` with `values` positionally; surplus entries on either side are dropped.
    pub fn from_columns<H, V>(headers: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .iter()
            .zip(values)
            .map(|(header, value)| (header.as_ref(), value.as_ref()))
            .collect()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    /// Sets `column`, replacing an existing cell in place or appending a new one.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Occurrence counts keyed by enum member. Members without an entry count as zero, and two
/// `Counts` compare equal when every member has the same count.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<String, u64>);

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, member: &str) -> u64 {
        self.0.get(member).copied().unwrap_or(0)
    }

    pub fn set(&mut self, member: impl Into<String>, count: u64) {
        self.0.insert(member.into(), count);
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(member, count)| (member.as_str(), *count))
    }
}

impl PartialEq for Counts {
    fn eq(&self, other: &Self) -> bool {
        fn nonzero(counts: &Counts) -> impl Iterator<Item = (&str, u64)> {
            counts.iter().filter(|(_, count)| *count > 0)
        }
        nonzero(self).eq(nonzero(other))
    }
}

impl Eq for Counts {}

impl<K: Into<String>> FromIterator<(K, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Counts(
            iter.into_iter()
                .map(|(member, count)| (member.into(), count))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// An optional field with no value.
    Absent,
    Scalar(Value),
    List(Vec<Option<Value>>),
    Counts(Counts),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<Value>]> {
        match self {
            FieldValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_counts(&self) -> Option<&Counts> {
        match self {
            FieldValue::Counts(counts) => Some(counts),
            _ => None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Absent => "absent",
            FieldValue::Scalar(_) => "scalar",
            FieldValue::List(_) => "list",
            FieldValue::Counts(_) => "counts",
        }
    }
}

macro_rules! scalar_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_field_value!(
    Value,
    &str,
    String,
    i64,
    f64,
    bool,
    chrono::NaiveDate,
    uuid::Uuid,
);

impl<T: Into<Value>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldValue::Scalar(value.into()),
            None => FieldValue::Absent,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(|v| Some(v.into())).collect())
    }
}

impl From<Counts> for FieldValue {
    fn from(counts: Counts) -> Self {
        FieldValue::Counts(counts)
    }
}

/// A typed row: field name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn scalar(&self, field: &str) -> Option<&Value> {
        self.get(field).and_then(FieldValue::as_scalar)
    }

    pub fn list(&self, field: &str) -> Option<&[Option<Value>]> {
        self.get(field).and_then(FieldValue::as_list)
    }

    pub fn counts(&self, field: &str) -> Option<&Counts> {
        self.get(field).and_then(FieldValue::as_counts)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
