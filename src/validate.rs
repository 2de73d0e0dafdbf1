//! Scalar validation and serialization: the last stage of decode and the first stage of encode.
//!
//! On decode this receives each field already staged by the codec (absent, raw text, list
//! segments, or collected counts) and coerces it to the declared type, collecting every failure
//! of the row. On encode it checks a caller-built [`Record`] against the classification and
//! renders each field to text.

use crate::{
    classify::{ClassifiedField, FieldKind},
    data::{Value, check_scalar, parse_scalar},
    error::{IssueCollector, ValidationError},
    record::{Counts, FieldValue, Record},
    schema::{EnumDef, ScalarType},
};

/// A field's raw material between the codec stages and coercion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Staged<'a> {
    /// The row has no column for the field and the field has no default.
    Missing,
    /// An optional field whose cell was empty.
    Absent,
    Text(&'a str),
    Segments(Vec<&'a str>),
    Counts(Counts),
    /// An earlier stage already recorded issues for this field.
    Failed,
}

pub(crate) fn coerce(
    fields: &[ClassifiedField],
    staged: Vec<Staged<'_>>,
    mut issues: IssueCollector,
) -> Result<Record, ValidationError> {
    let mut record = Record::with_capacity(fields.len());
    for (field, staged) in fields.iter().zip(staged) {
        let value = match (&field.kind, staged) {
            (_, Staged::Failed) => continue,
            (kind, Staged::Missing) => {
                if kind.is_optional() {
                    FieldValue::Absent
                } else {
                    issues.push(&field.name, format!("missing column '{}'", field.column));
                    continue;
                }
            }
            (_, Staged::Absent) => FieldValue::Absent,
            (FieldKind::Scalar { ty, .. }, Staged::Text(text)) => match parse_scalar(text, ty) {
                Ok(value) => FieldValue::Scalar(value),
                Err(err) => {
                    issues.push(&field.name, err.to_string());
                    continue;
                }
            },
            (
                FieldKind::List {
                    element,
                    optional_elements,
                    ..
                },
                Staged::Segments(segments),
            ) => match coerce_elements(&segments, element, *optional_elements) {
                Ok(values) => FieldValue::List(values),
                Err(reason) => {
                    issues.push(&field.name, reason);
                    continue;
                }
            },
            (FieldKind::Pivot { .. }, Staged::Counts(counts)) => FieldValue::Counts(counts),
            (kind, other) => {
                issues.push(
                    &field.name,
                    format!("cannot build a {kind} field from {other:?}"),
                );
                continue;
            }
        };
        record.set(field.name.as_str(), value);
    }
    issues.finish(record)
}

fn coerce_elements(
    segments: &[&str],
    element: &ScalarType,
    optional_elements: bool,
) -> Result<Vec<Option<Value>>, String> {
    let mut failures = Vec::new();
    let mut values = Vec::with_capacity(segments.len());
    for (idx, segment) in segments.iter().enumerate() {
        if optional_elements && segment.is_empty() {
            values.push(None);
            continue;
        }
        match parse_scalar(segment, element) {
            Ok(value) => values.push(Some(value)),
            Err(err) => failures.push(format!("element {idx}: {err}")),
        }
    }
    if failures.is_empty() {
        Ok(values)
    } else {
        Err(failures.join(", "))
    }
}

static ABSENT: FieldValue = FieldValue::Absent;

/// A field's value rendered for the encode stages.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Extracted<'a> {
    Text(String),
    Elements {
        elements: Vec<Option<String>>,
        delimiter: &'a str,
    },
    Counts {
        counts: &'a Counts,
        members: &'a EnumDef,
    },
}

pub(crate) fn extract<'a>(
    fields: &'a [ClassifiedField],
    record: &'a Record,
) -> Result<Vec<Extracted<'a>>, ValidationError> {
    let mut issues = IssueCollector::default();
    let mut extracted = Vec::with_capacity(fields.len());
    for field in fields {
        let value = record.get(&field.name).unwrap_or(&ABSENT);
        match extract_field(field, value) {
            Ok(value) => extracted.push(value),
            Err(reason) => issues.push(&field.name, reason),
        }
    }
    issues.finish(extracted)
}

fn extract_field<'a>(
    field: &'a ClassifiedField,
    value: &'a FieldValue,
) -> Result<Extracted<'a>, String> {
    match (&field.kind, value) {
        (kind, FieldValue::Absent) if kind.is_optional() => Ok(Extracted::Text(String::new())),
        (_, FieldValue::Absent) => Err("required field has no value".to_string()),
        (FieldKind::Scalar { ty, .. }, FieldValue::Scalar(value)) => {
            check_scalar(value, ty).map_err(|err| err.to_string())?;
            Ok(Extracted::Text(value.render()))
        }
        (
            FieldKind::List {
                element,
                optional_elements,
                delimiter,
                ..
            },
            FieldValue::List(values),
        ) => {
            let mut elements = Vec::with_capacity(values.len());
            for (idx, value) in values.iter().enumerate() {
                match value {
                    None if *optional_elements => elements.push(None),
                    None => return Err(format!("element {idx} is null")),
                    Some(value) => {
                        check_scalar(value, element)
                            .map_err(|err| format!("element {idx}: {err}"))?;
                        elements.push(Some(value.render()));
                    }
                }
            }
            Ok(Extracted::Elements {
                elements,
                delimiter,
            })
        }
        (FieldKind::Pivot { members }, FieldValue::Counts(counts)) => {
            let unknown = crate::pivot::unknown_keys(counts, members);
            if !unknown.is_empty() {
                return Err(format!(
                    "counts keys {} are not members of enum {}",
                    unknown.join(", "),
                    members.name()
                ));
            }
            Ok(Extracted::Counts { counts, members })
        }
        (kind, value) => Err(format!("expected a {kind} value, got {}", value.shape())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, Schema};

    fn fields(schema: &Schema) -> Vec<ClassifiedField> {
        schema.classification().unwrap().fields().to_vec()
    }

    #[test]
    fn coerce_aggregates_every_failing_field() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("name", ScalarType::String),
            FieldSpec::scalar("count", ScalarType::Integer),
            FieldSpec::scalar("score", ScalarType::Float),
        ]);
        let staged = vec![
            Staged::Missing,
            Staged::Text("many"),
            Staged::Text("1.5"),
        ];
        let err = coerce(&fields(&schema), staged, IssueCollector::default()).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["name", "count"]);
    }

    #[test]
    fn optional_elements_turn_empty_segments_into_nulls() {
        let schema = Schema::new(vec![
            FieldSpec::list("values", ScalarType::Integer).optional_elements(),
        ]);
        let record = coerce(
            &fields(&schema),
            vec![Staged::Segments(vec!["1", "", "3"])],
            IssueCollector::default(),
        )
        .unwrap();
        assert_eq!(
            record.list("values").unwrap(),
            [Some(Value::Integer(1)), None, Some(Value::Integer(3))]
        );
    }

    #[test]
    fn element_failures_name_their_index() {
        let schema = Schema::new(vec![FieldSpec::list("values", ScalarType::Integer)]);
        let err = coerce(
            &fields(&schema),
            vec![Staged::Segments(vec!["1", "", "x"])],
            IssueCollector::default(),
        )
        .unwrap_err();
        let reason = &err.issues()[0].reason;
        assert!(reason.contains("element 1"));
        assert!(reason.contains("element 2"));
    }

    #[test]
    fn extract_rejects_wrong_shapes_and_missing_required() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("name", ScalarType::String),
            FieldSpec::list("tags", ScalarType::String),
            FieldSpec::scalar("note", ScalarType::String).optional(),
        ]);
        let fields = fields(&schema);
        let record = Record::new().with("tags", "a,b");
        let err = extract(&fields, &record).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["name", "tags"]);
        assert!(err.issues()[1].reason.contains("expected a list value"));
    }

    #[test]
    fn extract_rejects_null_elements_without_optional_elements() {
        let schema = Schema::new(vec![FieldSpec::list("values", ScalarType::Integer)]);
        let fields = fields(&schema);
        let record = Record::new().with(
            "values",
            FieldValue::List(vec![Some(Value::Integer(1)), None]),
        );
        let err = extract(&fields, &record).unwrap_err();
        assert_eq!(err.issues()[0].reason, "element 1 is null");
    }
}
