//! Per-row decode and encode.
//!
//! Decode runs a fixed pipeline over one [`RawRow`]:
//!
//! 1. look up each field's cell (alias first, then name, then the field default) and turn an
//!    empty cell of an *optional* field into absent; empty cells of required fields pass through
//! 2. collect the pivot field's member columns into [`Counts`](crate::record::Counts)
//! 3. split list cells into segments
//! 4. coerce what remains to the declared types, aggregating every failure of the row
//!
//! Encode extracts and checks each field of a [`Record`], expands the pivot field, joins list
//! fields, and emits cells in exactly the planned header order.

use std::sync::Arc;

use crate::{
    classify::{Classification, ClassifiedField, FieldKind},
    error::{IssueCollector, SchemaError, ValidationError},
    list, pivot,
    record::{RawRow, Record},
    schema::Schema,
    validate::{self, Extracted, Staged},
};

#[derive(Debug, Clone)]
pub struct RecordCodec {
    classification: Arc<Classification>,
}

impl RecordCodec {
    pub fn new(schema: &Schema) -> Result<Self, SchemaError> {
        Ok(Self::from_classification(schema.classification()?))
    }

    pub fn from_classification(classification: Arc<Classification>) -> Self {
        Self { classification }
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn header(&self) -> &[String] {
        self.classification.header()
    }

    pub fn decode(&self, row: &RawRow) -> Result<Record, ValidationError> {
        let fields = self.classification.fields();
        let mut issues = IssueCollector::default();

        let mut staged = fields
            .iter()
            .map(|field| stage_cell(field, row))
            .collect::<Vec<_>>();

        for (field, slot) in fields.iter().zip(staged.iter_mut()) {
            if let FieldKind::Pivot { members } = &field.kind {
                *slot = match pivot::collect(row, members) {
                    Ok(counts) => Staged::Counts(counts),
                    Err(err) => {
                        issues.absorb(err);
                        Staged::Failed
                    }
                };
            }
        }

        for (field, slot) in fields.iter().zip(staged.iter_mut()) {
            let FieldKind::List { delimiter, .. } = &field.kind else {
                continue;
            };
            if let Staged::Text(text) = *slot {
                *slot = Staged::Segments(list::decode(text, delimiter));
            }
        }

        validate::coerce(fields, staged, issues)
    }

    pub fn encode(&self, record: &Record) -> Result<RawRow, ValidationError> {
        let fields = self.classification.fields();
        let extracted = validate::extract(fields, record)?;
        let mut issues = IssueCollector::default();
        let mut row = RawRow::with_capacity(self.header().len());

        for (field, value) in fields.iter().zip(extracted) {
            match value {
                Extracted::Text(text) => row.insert(field.column.as_str(), text),
                Extracted::Elements {
                    elements,
                    delimiter,
                } => {
                    let texts = elements.iter().map(Option::as_deref);
                    if let Some(idx) = list::find_collision(texts.clone(), delimiter) {
                        issues.push(
                            field.name.as_str(),
                            format!(
                                "element {idx} ('{}') contains the list delimiter '{delimiter}'",
                                elements[idx].as_deref().unwrap_or_default()
                            ),
                        );
                        continue;
                    }
                    if list::is_lone_empty(texts.clone()) {
                        issues.push(
                            field.name.as_str(),
                            "a single empty element would be read back as an empty list",
                        );
                        continue;
                    }
                    row.insert(field.column.as_str(), list::encode(texts, delimiter));
                }
                Extracted::Counts { counts, members } => {
                    for (column, count) in pivot::expand(counts, members) {
                        row.insert(column, count.to_string());
                    }
                }
            }
        }
        issues.finish(row)
    }
}

fn stage_cell<'a>(field: &'a ClassifiedField, row: &'a RawRow) -> Staged<'a> {
    if matches!(field.kind, FieldKind::Pivot { .. }) {
        return Staged::Missing;
    }
    let cell = row
        .get(&field.column)
        .or_else(|| row.get(&field.name))
        .or(field.default.as_deref());
    match cell {
        None => Staged::Missing,
        Some("") if field.kind.is_optional() => Staged::Absent,
        Some(text) => Staged::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        record::{Counts, FieldValue},
        schema::{EnumDef, FieldSpec, ScalarType},
    };

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().copied().collect()
    }

    fn bases() -> ScalarType {
        ScalarType::Enum(EnumDef::new("Base", ["A", "C", "G", "T"]))
    }

    #[test]
    fn scalar_row_round_trips() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("name", ScalarType::String),
            FieldSpec::scalar("count", ScalarType::Integer),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = codec.decode(&row(&[("name", "x"), ("count", "5")])).unwrap();
        assert_eq!(record.scalar("name"), Some(&Value::from("x")));
        assert_eq!(record.scalar("count"), Some(&Value::Integer(5)));

        let encoded = codec.encode(&record).unwrap();
        assert_eq!(encoded, row(&[("name", "x"), ("count", "5")]));
    }

    #[test]
    fn empty_optional_becomes_absent_but_required_fails() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("count", ScalarType::Integer),
            FieldSpec::scalar("value", ScalarType::Integer).optional(),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = codec.decode(&row(&[("count", "1"), ("value", "")])).unwrap();
        assert_eq!(record.get("value"), Some(&FieldValue::Absent));

        let err = codec.decode(&row(&[("count", ""), ("value", "")])).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["count"]);
    }

    #[test]
    fn empty_required_string_stays_empty() {
        let schema = Schema::new(vec![FieldSpec::scalar("name", ScalarType::String)]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = codec.decode(&row(&[("name", "")])).unwrap();
        assert_eq!(record.scalar("name"), Some(&Value::from("")));
    }

    #[test]
    fn optional_list_distinguishes_absent_from_values() {
        let schema = Schema::new(vec![FieldSpec::list("tags", ScalarType::String).optional()]);
        let codec = RecordCodec::new(&schema).unwrap();
        let absent = codec.decode(&row(&[("tags", "")])).unwrap();
        assert_eq!(absent.get("tags"), Some(&FieldValue::Absent));

        let tags = codec.decode(&row(&[("tags", "a,b,c")])).unwrap();
        assert_eq!(tags.get("tags"), Some(&FieldValue::from(vec!["a", "b", "c"])));
        assert_eq!(codec.encode(&absent).unwrap(), row(&[("tags", "")]));
    }

    #[test]
    fn required_list_decodes_empty_cell_to_empty_list() {
        let schema = Schema::new(vec![FieldSpec::list("values", ScalarType::Integer)]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = codec.decode(&row(&[("values", "")])).unwrap();
        assert_eq!(record.list("values").unwrap().len(), 0);
    }

    #[test]
    fn pivot_columns_fold_into_counts() {
        let schema = Schema::new(vec![FieldSpec::counter("counts", bases())]);
        let codec = RecordCodec::new(&schema).unwrap();
        let full = codec
            .decode(&row(&[("A", "10"), ("C", "5"), ("G", "3"), ("T", "2")]))
            .unwrap();
        let expected: Counts = [("A", 10), ("C", 5), ("G", 3), ("T", 2)]
            .into_iter()
            .collect();
        assert_eq!(full.counts("counts"), Some(&expected));

        let sparse = codec.decode(&row(&[("A", "10")])).unwrap();
        let counts = sparse.counts("counts").unwrap();
        assert_eq!(
            ["A", "C", "G", "T"].map(|member| counts.get(member)),
            [10, 0, 0, 0]
        );
    }

    #[test]
    fn pivot_and_scalar_failures_are_reported_together() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("pos", ScalarType::Integer),
            FieldSpec::counter("counts", bases()),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let err = codec
            .decode(&row(&[("pos", "x"), ("A", "1"), ("C", "lots")]))
            .unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["C", "pos"]);
    }

    #[test]
    fn encode_follows_header_order() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("pos", ScalarType::Integer),
            FieldSpec::counter("counts", bases()),
            FieldSpec::list("quals", ScalarType::Integer).with_delimiter(";"),
            FieldSpec::scalar("read_count", ScalarType::Integer).with_alias("count"),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let counts: Counts = [("G", 3)].into_iter().collect();
        let record = Record::new()
            .with("read_count", 7i64)
            .with("quals", vec![30i64, 40])
            .with("counts", counts)
            .with("pos", 12i64);
        let encoded = codec.encode(&record).unwrap();
        assert_eq!(encoded.columns().collect::<Vec<_>>(), codec.header());
        assert_eq!(
            encoded.values().collect::<Vec<_>>(),
            vec!["12", "0", "0", "3", "0", "30;40", "7"]
        );
    }

    #[test]
    fn encode_rejects_delimiter_collisions() {
        let schema = Schema::new(vec![FieldSpec::list("tags", ScalarType::String)]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = Record::new().with("tags", vec!["a,b", "c"]);
        let err = codec.encode(&record).unwrap_err();
        assert!(err.issues()[0].reason.contains("contains the list delimiter ','"));
    }

    #[test]
    fn encode_rejects_lone_empty_element() {
        let schema = Schema::new(vec![
            FieldSpec::list("tags", ScalarType::String),
            FieldSpec::list("quals", ScalarType::Integer).optional_elements(),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = Record::new()
            .with("tags", vec![""])
            .with("quals", FieldValue::List(vec![None]));
        let err = codec.encode(&record).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["tags", "quals"]);

        let record = Record::new()
            .with("tags", Vec::<&str>::new())
            .with("quals", FieldValue::List(vec![None, None]));
        let encoded = codec.encode(&record).unwrap();
        assert_eq!(encoded.values().collect::<Vec<_>>(), vec!["", ","]);
    }

    #[test]
    fn alias_and_name_are_both_read() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("read_count", ScalarType::Integer).with_alias("count"),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let by_alias = codec.decode(&row(&[("count", "100")])).unwrap();
        let by_name = codec.decode(&row(&[("read_count", "100")])).unwrap();
        assert_eq!(by_alias, by_name);
        assert_eq!(by_alias.scalar("read_count"), Some(&Value::Integer(100)));
    }

    #[test]
    fn defaults_fill_missing_columns() {
        let schema = Schema::new(vec![
            FieldSpec::scalar("name", ScalarType::String),
            FieldSpec::scalar("count", ScalarType::Integer).with_default("0"),
            FieldSpec::scalar("note", ScalarType::String).optional(),
        ]);
        let codec = RecordCodec::new(&schema).unwrap();
        let record = codec.decode(&row(&[("name", "foo")])).unwrap();
        assert_eq!(record.scalar("count"), Some(&Value::Integer(0)));
        assert_eq!(record.get("note"), Some(&FieldValue::Absent));

        let err = codec.decode(&row(&[("count", "1")])).unwrap_err();
        assert_eq!(err.issues()[0].reason, "missing column 'name'");
    }

    #[test]
    fn decode_does_not_carry_state_between_rows() {
        let schema = Schema::new(vec![FieldSpec::scalar("count", ScalarType::Integer)]);
        let codec = RecordCodec::new(&schema).unwrap();
        assert!(codec.decode(&row(&[("count", "bad")])).is_err());
        let record = codec.decode(&row(&[("count", "2")])).unwrap();
        assert_eq!(record.scalar("count"), Some(&Value::Integer(2)));
    }
}
