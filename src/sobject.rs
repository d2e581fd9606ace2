//! Field values and the traits every stored object implements

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::Row;
use serde::Serialize;

use crate::id::RecordId;

/// A single field value as it travels to and from storage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            FieldValue::Integer(n) => ToSqlOutput::Owned(Value::Integer(*n)),
            FieldValue::Double(d) => ToSqlOutput::Owned(Value::Real(*d)),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
            FieldValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%F").to_string())),
        })
    }
}

impl From<ValueRef<'_>> for FieldValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(n) => FieldValue::Integer(n),
            ValueRef::Real(d) => FieldValue::Double(d),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

impl From<&RecordId> for FieldValue {
    fn from(value: &RecordId) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// An untyped result row keyed by selected field path
pub type Record = BTreeMap<String, FieldValue>;

/// A storable object type
pub trait SObject: Sized {
    /// API name, matching the schema (e.g. "Account")
    const API_NAME: &'static str;

    fn id(&self) -> Option<&RecordId>;

    fn set_id(&mut self, id: RecordId);

    /// Populated fields other than Id, by API name. `None` fields are left out,
    /// so an update only touches what the caller set.
    fn field_values(&self) -> Vec<(&'static str, FieldValue)>;

    /// Build from a query row; columns that were not selected come back as `None`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Objects matched by a natural-key name field
pub trait NameKeyed: SObject {
    const NAME_FIELD: &'static str = "Name";

    fn natural_key(&self) -> Option<&str>;
}

/// Objects that link to a parent through a lookup field
pub trait ParentLinked: SObject {
    const PARENT_FIELD: &'static str;

    fn set_parent(&mut self, parent: RecordId);

    fn parent(&self) -> Option<&RecordId>;
}

/// Read a column by name, treating an unselected column as `None`
pub fn column<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<T>>(name) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Push `(name, value)` when the value is set
pub(crate) fn push_field<T: Clone + Into<FieldValue>>(
    fields: &mut Vec<(&'static str, FieldValue)>,
    name: &'static str,
    value: &Option<T>,
) {
    if let Some(value) = value {
        fields.push((name, value.clone().into()));
    }
}
