//! Error types for schema registration, row validation, and file plumbing.
//!
//! [`SchemaError`] is raised once, when a schema is classified. [`ValidationError`] is raised per
//! row (decode) or per record (encode) and aggregates every offending field of that row rather
//! than stopping at the first. [`Error`] wraps both together with the I/O level failures of the
//! reader and writer.

use std::fmt;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Schema does not declare any fields")]
    Empty,

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error(
        "Only one counter field per schema is supported. Found multiple counter fields: {}",
        .0.join(", ")
    )]
    MultipleCounters(Vec<String>),

    #[error("Counter field '{field}' must be keyed by an enum, got {key}")]
    CounterKeyNotEnum { field: String, key: String },

    #[error("Optional counter fields are not supported: '{0}'")]
    OptionalCounter(String),

    #[error("Enum '{0}' does not declare any members")]
    EmptyEnum(String),

    #[error("Enum '{name}' declares member '{member}' more than once")]
    DuplicateMember { name: String, member: String },

    #[error("Unknown enum '{name}' referenced by field '{field}'")]
    UnknownEnum { field: String, name: String },

    #[error("Column '{column}' is claimed by both '{first}' and '{second}'")]
    DuplicateColumn {
        column: String,
        first: String,
        second: String,
    },

    #[error("List delimiter for field '{0}' must not be empty")]
    EmptyListDelimiter(String),

    #[error("Invalid type '{token}' for field '{field}': {reason}")]
    InvalidType {
        field: String,
        token: String,
        reason: String,
    },
}

/// One failing field (or pivot column) within a row or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.field, self.reason)
    }
}

/// Every field that failed coercion or presence checks for a single row or record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|issue| issue.field.as_str())
    }

    pub fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.issues.len() == 1 { "" } else { "s" };
        write!(f, "{} invalid field{plural}: ", self.issues.len())?;
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Collects issues while a row is walked, then turns into a result.
#[derive(Debug, Default)]
pub(crate) struct IssueCollector {
    issues: Vec<FieldIssue>,
}

impl IssueCollector {
    pub(crate) fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.issues.push(FieldIssue::new(field, reason));
    }

    pub(crate) fn absorb(&mut self, err: ValidationError) {
        self.issues.extend(err.into_issues());
    }

    pub(crate) fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: ValidationError,
    },

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode text with encoding {0}")]
    Decode(&'static str),
}

impl Error {
    /// The validation failure carried by this error, if it is row- or record-level.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(err) | Error::Row { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ValidationError::new(vec![
            FieldIssue::new("count", "failed to parse 'x' as integer"),
            FieldIssue::new("name", "missing column"),
        ]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("2 invalid fields: "));
        assert!(rendered.contains("'count': failed to parse 'x' as integer"));
        assert!(rendered.contains("'name': missing column"));
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["count", "name"]);
    }

    #[test]
    fn collector_succeeds_without_issues() {
        let collector = IssueCollector::default();
        assert_eq!(collector.finish(7).unwrap(), 7);
    }

    #[test]
    fn multiple_counter_message_names_fields() {
        let err = SchemaError::MultipleCounters(vec!["foo_counts".into(), "bar_counts".into()]);
        assert_eq!(
            err.to_string(),
            "Only one counter field per schema is supported. Found multiple counter fields: foo_counts, bar_counts"
        );
    }

    #[test]
    fn row_error_exposes_validation() {
        let err = Error::Row {
            line: 3,
            source: ValidationError::new(vec![FieldIssue::new("count", "empty value")]),
        };
        assert!(err.to_string().starts_with("Line 3: 1 invalid field: "));
        assert!(err.validation().is_some());
    }
}
