use std::fmt;

use anyhow::{Context, Result, anyhow, bail, ensure};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::ScalarType;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Guid(Uuid),
}

impl Value {
    /// Text written to a delimited file for this value.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Guid(g) => g.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Guid(_) => "guid",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Guid(value)
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("failed to parse '{value}' as datetime"))
}

pub fn parse_boolean(value: &str) -> Result<bool> {
    let lowered = value.trim().to_ascii_lowercase();
    let parsed = match lowered.as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => true,
        "false" | "f" | "no" | "n" | "off" | "0" => false,
        _ => bail!("failed to parse '{value}' as boolean"),
    };
    Ok(parsed)
}

/// Coerces one cell to `ty`. Empty text is only valid for `string`; absence is decided by the
/// caller before coercion.
pub fn parse_scalar(value: &str, ty: &ScalarType) -> Result<Value> {
    let parsed = match ty {
        ScalarType::String => Value::String(value.to_string()),
        ScalarType::Integer => {
            ensure!(!value.is_empty(), "empty value is not a valid integer");
            let parsed: i64 = value
                .trim()
                .parse()
                .with_context(|| format!("failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ScalarType::Float => {
            ensure!(!value.is_empty(), "empty value is not a valid float");
            let parsed: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ScalarType::Boolean => Value::Boolean(parse_boolean(value)?),
        ScalarType::Date => Value::Date(parse_naive_date(value.trim())?),
        ScalarType::DateTime => Value::DateTime(parse_naive_datetime(value.trim())?),
        ScalarType::Guid => {
            let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
            let parsed = Uuid::parse_str(trimmed)
                .with_context(|| format!("failed to parse '{value}' as GUID"))?;
            Value::Guid(parsed)
        }
        ScalarType::Enum(def) => {
            ensure!(
                def.contains(value),
                "'{value}' is not a member of enum {} (expected one of: {})",
                def.name(),
                def.members().join(", ")
            );
            Value::String(value.to_string())
        }
    };
    Ok(parsed)
}

/// Checks that an in-memory value may be written as `ty`.
pub fn check_scalar(value: &Value, ty: &ScalarType) -> Result<()> {
    let matches = match (ty, value) {
        (ScalarType::String, Value::String(_))
        | (ScalarType::Integer, Value::Integer(_))
        | (ScalarType::Float, Value::Float(_))
        | (ScalarType::Boolean, Value::Boolean(_))
        | (ScalarType::Date, Value::Date(_))
        | (ScalarType::DateTime, Value::DateTime(_))
        | (ScalarType::Guid, Value::Guid(_)) => true,
        (ScalarType::Enum(def), Value::String(member)) => {
            ensure!(
                def.contains(member),
                "'{member}' is not a member of enum {}",
                def.name()
            );
            true
        }
        _ => false,
    };
    ensure!(
        matches,
        "expected {} but the record holds {} '{}'",
        ty.token(),
        value.kind(),
        value.render()
    );
    Ok(())
}
