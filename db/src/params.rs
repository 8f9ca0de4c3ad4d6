//! Statement parameters and named-placeholder expansion
//!
//! Statements use `:name` placeholders bound against a [`SqlParams`]
//! collection. Before execution the statement is rewritten to the
//! positional `$1..$n` form PostgreSQL expects, and the values are bound
//! through the driver. Values never get interpolated into the SQL text, so
//! a value containing SQL metacharacters stays literal data.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;

/// A single bindable statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<i16> for SqlParam {
    fn from(v: i16) -> Self {
        SqlParam::Int(v as i64)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v as i64)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<f32> for SqlParam {
    fn from(v: f32) -> Self {
        SqlParam::Float(v as f64)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(v: Vec<u8>) -> Self {
        SqlParam::Bytes(v)
    }
}

impl From<&[u8]> for SqlParam {
    fn from(v: &[u8]) -> Self {
        SqlParam::Bytes(v.to_vec())
    }
}

impl From<Uuid> for SqlParam {
    fn from(v: Uuid) -> Self {
        SqlParam::Uuid(v)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(v: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlParam {
    fn from(v: serde_json::Value) -> Self {
        SqlParam::Json(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlParam::Null,
        }
    }
}

/// Named statement parameters, in insertion order.
///
/// Extra entries that a statement never references are tolerated; a
/// placeholder without a matching entry is a [`DbError::Statement`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParams {
    entries: Vec<(String, SqlParam)>,
}

impl SqlParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, chaining style.
    ///
    /// # Example
    /// ```
    /// use dal_db::SqlParams;
    ///
    /// let params = SqlParams::new().with("id", 1).with("name", "Ann");
    /// assert_eq!(params.len(), 2);
    /// ```
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a parameter. A repeated name replaces the earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlParam>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&SqlParam> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlParam)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Rewrite `:name` placeholders into `$1..$n` and collect the bind list.
///
/// The scanner skips string literals, quoted identifiers, dollar-quoted
/// strings, line and block comments, and `::` casts, so placeholder-like
/// text inside those never gets rewritten. A name used more than once maps
/// to the same positional index.
pub fn expand_named(statement: &str, params: &SqlParams) -> Result<(String, Vec<SqlParam>), DbError> {
    let bytes = statement.as_bytes();
    let mut out = String::with_capacity(statement.len());
    let mut seen: Vec<&str> = Vec::new();
    let mut values: Vec<SqlParam> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            // 'string literal', with '' as the escaped quote
            b'\'' => {
                out.push('\'');
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            out.push_str("''");
                            i += 2;
                            continue;
                        }
                        out.push('\'');
                        i += 1;
                        break;
                    }
                    i += push_char(&mut out, statement, i);
                }
            }
            // "quoted identifier"
            b'"' => {
                out.push('"');
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'"' {
                        out.push('"');
                        i += 1;
                        break;
                    }
                    i += push_char(&mut out, statement, i);
                }
            }
            // -- line comment
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += push_char(&mut out, statement, i);
                }
            }
            // /* block comment */, which PostgreSQL allows to nest
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str("/*");
                i += 2;
                let mut depth = 1;
                while i < bytes.len() && depth > 0 {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        out.push_str("*/");
                        i += 2;
                        depth -= 1;
                    } else if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
                        out.push_str("/*");
                        i += 2;
                        depth += 1;
                    } else {
                        i += push_char(&mut out, statement, i);
                    }
                }
            }
            // $tag$ dollar-quoted string $tag$, or a pre-existing $n placeholder
            b'$' => {
                if let Some(span_end) = dollar_quote_span(statement, i) {
                    out.push_str(&statement[i..span_end]);
                    i = span_end;
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            b':' => {
                // :: is a cast, not a placeholder
                if bytes.get(i + 1) == Some(&b':') {
                    out.push_str("::");
                    i += 2;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_byte(bytes[end]) {
                    end += 1;
                }
                // a bare `:` (array slice, odd literal) passes through
                if end == start || bytes[start].is_ascii_digit() {
                    out.push(':');
                    i += 1;
                    continue;
                }
                let name = &statement[start..end];
                let index = match seen.iter().position(|n| *n == name) {
                    Some(pos) => pos + 1,
                    None => {
                        let value = params.get(name).ok_or_else(|| {
                            DbError::Statement(format!(
                                "no parameter named `{}` for placeholder :{}",
                                name, name
                            ))
                        })?;
                        seen.push(name);
                        values.push(value.clone());
                        seen.len()
                    }
                };
                out.push('$');
                out.push_str(&index.to_string());
                i = end;
            }
            _ => {
                i += push_char(&mut out, statement, i);
            }
        }
    }

    Ok((out, values))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Push the (possibly multi-byte) character starting at `i`, returning its
/// encoded length.
fn push_char(out: &mut String, source: &str, i: usize) -> usize {
    let ch = source[i..].chars().next().unwrap_or('\u{fffd}');
    out.push(ch);
    ch.len_utf8()
}

/// If `start` opens a dollar-quoted string, return the end offset of the
/// whole quoted span (or the statement end when unterminated).
fn dollar_quote_span(statement: &str, start: usize) -> Option<usize> {
    let bytes = statement.as_bytes();
    let mut j = start + 1;
    while j < bytes.len() && is_ident_byte(bytes[j]) {
        // tags may not start with a digit
        if j == start + 1 && bytes[j].is_ascii_digit() {
            return None;
        }
        j += 1;
    }
    if j >= bytes.len() || bytes[j] != b'$' {
        return None;
    }
    let delim_end = j + 1;
    let delim = &statement[start..delim_end];
    match statement[delim_end..].find(delim) {
        Some(rel) => Some(delim_end + rel + delim.len()),
        None => Some(statement.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_expansion() {
        let params = SqlParams::new().with("id", 1).with("name", "Ann");
        let (sql, values) =
            expand_named("SELECT * FROM users WHERE id = :id AND name = :name", &params).unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = $1 AND name = $2");
        assert_eq!(values, vec![SqlParam::Int(1), SqlParam::Text("Ann".into())]);
    }

    #[test]
    fn test_repeated_name_reuses_index() {
        let params = SqlParams::new().with("v", 7);
        let (sql, values) = expand_named("SELECT :v + :v", &params).unwrap();
        assert_eq!(sql, "SELECT $1 + $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let err = expand_named("SELECT :absent", &SqlParams::new()).unwrap_err();
        match err {
            DbError::Statement(msg) => assert!(msg.contains("absent")),
            other => panic!("expected Statement error, got {other:?}"),
        }
    }

    #[test]
    fn test_unused_parameters_are_tolerated() {
        let params = SqlParams::new().with("id", 1).with("extra", "unused");
        let (sql, values) = expand_named("SELECT :id", &params).unwrap();
        assert_eq!(sql, "SELECT $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_cast_is_not_a_placeholder() {
        let params = SqlParams::new().with("id", 1);
        let (sql, _) = expand_named("SELECT :id::text", &params).unwrap();
        assert_eq!(sql, "SELECT $1::text");
    }

    #[test]
    fn test_string_literal_is_skipped() {
        let (sql, values) =
            expand_named("SELECT 'it''s :not a placeholder'", &SqlParams::new()).unwrap();
        assert_eq!(sql, "SELECT 'it''s :not a placeholder'");
        assert!(values.is_empty());
    }

    #[test]
    fn test_quoted_identifier_is_skipped() {
        let (sql, _) = expand_named("SELECT \":weird\" FROM t", &SqlParams::new()).unwrap();
        assert_eq!(sql, "SELECT \":weird\" FROM t");
    }

    #[test]
    fn test_comments_are_skipped() {
        let params = SqlParams::new().with("id", 1);
        let (sql, _) = expand_named(
            "SELECT :id -- :ignored\n/* also :ignored /* nested */ */ FROM t",
            &params,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT $1 -- :ignored\n/* also :ignored /* nested */ */ FROM t"
        );
    }

    #[test]
    fn test_dollar_quoted_string_is_skipped() {
        let (sql, _) =
            expand_named("SELECT $tag$ :ignored $tag$ FROM t", &SqlParams::new()).unwrap();
        assert_eq!(sql, "SELECT $tag$ :ignored $tag$ FROM t");
    }

    #[test]
    fn test_existing_positional_placeholder_passes_through() {
        let (sql, _) = expand_named("SELECT $1", &SqlParams::new()).unwrap();
        assert_eq!(sql, "SELECT $1");
    }

    #[test]
    fn test_param_conversions() {
        assert_eq!(SqlParam::from(true), SqlParam::Bool(true));
        assert_eq!(SqlParam::from(5i32), SqlParam::Int(5));
        assert_eq!(SqlParam::from(2.5f64), SqlParam::Float(2.5));
        assert_eq!(SqlParam::from("x"), SqlParam::Text("x".into()));
        assert_eq!(SqlParam::from(Option::<i32>::None), SqlParam::Null);
        assert_eq!(SqlParam::from(Some("y")), SqlParam::Text("y".into()));
    }

    #[test]
    fn test_insert_replaces_existing_name() {
        let mut params = SqlParams::new();
        params.insert("id", 1);
        params.insert("id", 2);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some(&SqlParam::Int(2)));
    }
}
