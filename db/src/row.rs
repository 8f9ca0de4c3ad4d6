//! Result rows decoded into driver-independent values
//!
//! Every row is an ordered mapping from column name to [`SqlValue`], in the
//! statement's projection order. Callers pick the representation at the
//! call site: keyed access through [`Row::get`] or positional extraction
//! through [`Row::get_index`] / [`Row::into_values`].

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo};
use uuid::Uuid;

use crate::error::DbError;

/// A decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Whether this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// The value as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(v) => Some(*v),
            SqlValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The value as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The value as raw bytes, if it is a bytea.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<SqlValue> for serde_json::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(v) => serde_json::Value::Bool(v),
            SqlValue::Int(v) => serde_json::Value::from(v),
            SqlValue::Float(v) => serde_json::Value::from(v),
            SqlValue::Text(v) => serde_json::Value::String(v),
            SqlValue::Bytes(v) => {
                serde_json::Value::Array(v.into_iter().map(serde_json::Value::from).collect())
            }
            SqlValue::Uuid(v) => serde_json::Value::String(v.to_string()),
            SqlValue::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            SqlValue::Date(v) => serde_json::Value::String(v.to_string()),
            SqlValue::Json(v) => v,
        }
    }
}

/// One result row: an ordered column-name → value mapping.
///
/// The key set is the statement's projected column list and is identical
/// for every row of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Build a row from `(column, value)` pairs, preserving order.
    pub fn from_pairs(pairs: Vec<(String, SqlValue)>) -> Self {
        let (columns, values) = pairs.into_iter().unzip();
        Self { columns, values }
    }

    /// Decode a driver row into column-name keyed values.
    pub(crate) fn from_pg(row: &PgRow) -> Result<Self, DbError> {
        let mut columns = Vec::with_capacity(row.columns().len());
        let mut values = Vec::with_capacity(row.columns().len());
        for (idx, column) in row.columns().iter().enumerate() {
            columns.push(column.name().to_string());
            values.push(decode_value(row, idx, column.type_info().name())?);
        }
        Ok(Self { columns, values })
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Look up a value by position.
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Column names, in projection order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values, in projection order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Discard the column names and keep the positional values.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, value)` pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Convert the row into a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(c, v)| (c.to_string(), serde_json::Value::from(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Decode one column by its PostgreSQL type name. NULL always decodes to
/// [`SqlValue::Null`]; types outside the mapped set fall back to a text
/// fetch.
fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> Result<SqlValue, DbError> {
    let value = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)?
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| SqlValue::Int(v as i64))
            .unwrap_or(SqlValue::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| SqlValue::Int(v as i64))
            .unwrap_or(SqlValue::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)?
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| SqlValue::Float(v as f64))
            .unwrap_or(SqlValue::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)?
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(idx)?
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(SqlValue::Timestamp)
            .unwrap_or(SqlValue::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|v| SqlValue::Timestamp(DateTime::from_naive_utc_and_offset(v, Utc)))
            .unwrap_or(SqlValue::Null),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)?
            .map(SqlValue::Json)
            .unwrap_or(SqlValue::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)?
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::from_pairs(vec![
            ("id".to_string(), SqlValue::Int(1)),
            ("name".to_string(), SqlValue::Text("Ann".to_string())),
            ("active".to_string(), SqlValue::Bool(true)),
            ("score".to_string(), SqlValue::Null),
        ])
    }

    #[test]
    fn test_named_access() {
        let row = sample_row();
        assert_eq!(row.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(row.get("name").and_then(SqlValue::as_str), Some("Ann"));
        assert!(row.get("score").unwrap().is_null());
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_positional_access() {
        let row = sample_row();
        assert_eq!(row.get_index(0), Some(&SqlValue::Int(1)));
        assert_eq!(row.get_index(4), None);
        assert_eq!(row.columns(), &["id", "name", "active", "score"]);

        let values = row.into_values();
        assert_eq!(values.len(), 4);
        assert_eq!(values[2], SqlValue::Bool(true));
    }

    #[test]
    fn test_iteration_preserves_order() {
        let row = sample_row();
        let columns: Vec<&str> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["id", "name", "active", "score"]);
    }

    #[test]
    fn test_to_json() {
        let json = sample_row().to_json();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Ann");
        assert_eq!(json["active"], true);
        assert!(json["score"].is_null());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(SqlValue::Int(3).as_float(), Some(3.0));
        assert_eq!(SqlValue::Float(2.5).as_float(), Some(2.5));
        assert_eq!(SqlValue::Text("x".into()).as_int(), None);
        assert_eq!(SqlValue::Bytes(vec![1, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert!(SqlValue::Null.is_null());
    }
}
